use std::{collections::HashSet, sync::Arc};

use chess_core::{legal_moves, Color, MoveTables, Position};

use super::*;

const LIMITS: ArenaLimits = ArenaLimits { shallow_depth: 4, capacity: 32 };

fn candidates(pos: &Position, tables: &MoveTables) -> Vec<GameTreeNode<chess_core::Move>> {
    legal_moves(pos, tables).into_iter().map(GameTreeNode::leaf).collect()
}

#[test]
fn test_every_candidate_comes_back_scored() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();

    for threads in 1..=3 {
        let pool: WorkerPool<Position> = WorkerPool::new(threads, Arc::clone(&tables), Color::White, LIMITS).unwrap();
        assert_eq!(pool.len(), threads);

        let nodes = candidates(&pos, &tables);
        let expected: HashSet<_> = nodes.iter().map(|n| n.mv).collect();
        let receivers = pool.dispatch_round_robin(&pos, nodes, 2);
        pool.start_all();

        let results: Vec<_> = receivers.into_iter().map(|rx| rx.recv().unwrap().unwrap()).collect();
        assert_eq!(results.len(), 20, "threads={threads}");
        let seen: HashSet<_> = results.iter().map(|n| n.mv).collect();
        assert_eq!(seen, expected, "threads={threads}");
        assert!(results.iter().all(|n| n.eval.is_some()));
    }
}

#[test]
fn test_thread_count_does_not_change_scores() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();

    let mut runs = Vec::new();
    for threads in [1, 3] {
        let pool: WorkerPool<Position> = WorkerPool::new(threads, Arc::clone(&tables), Color::White, LIMITS).unwrap();
        let receivers = pool.dispatch_round_robin(&pos, candidates(&pos, &tables), 2);
        pool.start_all();
        let scored: Vec<_> = receivers
            .into_iter()
            .map(|rx| rx.recv().unwrap().unwrap())
            .map(|n| (n.mv, n.eval))
            .collect();
        runs.push(scored);
    }
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn test_round_robin_spreads_work() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();
    let pool: WorkerPool<Position> = WorkerPool::new(3, Arc::clone(&tables), Color::White, LIMITS).unwrap();

    let receivers = pool.dispatch_round_robin(&pos, candidates(&pos, &tables), 1);
    let queued: Vec<_> = pool.workers().iter().map(Worker::queued).collect();
    assert_eq!(queued, vec![7, 7, 6]);

    pool.start_all();
    for rx in receivers {
        rx.recv().unwrap().unwrap();
    }
    assert!(pool.workers().iter().all(|w| w.queued() == 0));
}

#[test]
fn test_queued_work_waits_for_start() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();
    let pool: WorkerPool<Position> = WorkerPool::new(1, Arc::clone(&tables), Color::White, LIMITS).unwrap();

    let rx = pool.dispatch_round_robin(&pos, candidates(&pos, &tables).into_iter().take(1), 1).remove(0);
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert!(rx.try_recv().is_err());
    assert_eq!(pool.workers()[0].queued(), 1);

    pool.start_all();
    assert!(rx.recv().unwrap().is_ok());
}

#[test]
fn test_shutdown_disconnects_pending_results() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();
    let pool: WorkerPool<Position> = WorkerPool::new(2, Arc::clone(&tables), Color::White, LIMITS).unwrap();

    let receivers = pool.dispatch_round_robin(&pos, candidates(&pos, &tables), 3);
    drop(pool);
    assert!(receivers.into_iter().all(|rx| rx.recv().is_err()));
}

#[test]
fn test_search_failure_is_delivered() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();
    let tiny = ArenaLimits { shallow_depth: 0, capacity: 1 };
    let pool: WorkerPool<Position> = WorkerPool::new(1, tables.clone(), Color::White, tiny).unwrap();

    let receivers = pool.dispatch_round_robin(&pos, candidates(&pos, &tables).into_iter().take(2), 3);
    pool.start_all();
    for rx in receivers {
        assert_eq!(
            rx.recv().unwrap(),
            Err(SearchError::StackCapacityExceeded { capacity: 1 })
        );
    }
}

#[test]
fn test_start_on_empty_queue_releases_nothing() {
    let tables = Arc::new(MoveTables::generate());
    let pos = Position::startpos();
    let pool: WorkerPool<Position> = WorkerPool::new(1, Arc::clone(&tables), Color::White, LIMITS).unwrap();

    pool.start_all();
    let rx = pool.dispatch_round_robin(&pos, candidates(&pos, &tables).into_iter().take(1), 1).remove(0);
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert!(rx.try_recv().is_err());

    pool.start_all();
    assert!(rx.recv().unwrap().is_ok());
}
