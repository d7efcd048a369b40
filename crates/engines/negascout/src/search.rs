//! Negascout (principal variation search) over a [`GameState`].
//!
//! Scores are negamax-style: each call returns the value of the position from
//! the point of view of the side on move, and the parent negates it.

use crate::{arena::SearchArena, error::SearchError, node::GameTreeNode, state::GameState, state::Side};

/// Width of the null window used to probe non-first children.
pub const EPSILON: f64 = 0.000_001;

/// Everything one recursive search needs besides the node being searched.
pub struct Searcher<'a, P: GameState> {
    tables: &'a P::Tables,
    position: &'a mut P,
    arena: &'a mut SearchArena<P::Move>,
    ply: u32,
}

impl<'a, P: GameState> Searcher<'a, P> {
    /// `ply` is the nominal depth of this iteration; stack depth and the
    /// distance fed to the evaluator are both measured against it.
    pub fn new(tables: &'a P::Tables, position: &'a mut P, arena: &'a mut SearchArena<P::Move>, ply: u32) -> Self {
        Self { tables, position, arena, ply }
    }

    /// Scores a root candidate for `player`.
    ///
    /// The candidate's move must already be applied to the position, so the
    /// opponent is on move and the search runs from their side.
    pub fn search(&mut self, node: &mut GameTreeNode<P::Move>, player: P::Side) -> Result<f64, SearchError> {
        Ok(-self.negascout(node, player.opponent(), self.ply, -f64::MAX, f64::MAX)?)
    }

    /// Searches `node` for `turn` with `depth` plies left inside `(alpha, beta)`.
    pub fn negascout(
        &mut self,
        node: &mut GameTreeNode<P::Move>,
        turn: P::Side,
        depth: u32,
        alpha: f64,
        beta: f64,
    ) -> Result<f64, SearchError> {
        self.arena.nodes += 1;
        let stack_depth = self.ply - depth;

        let Some(index) = self.arena.slot(stack_depth) else {
            if !node.is_expanded() {
                node.expand(&mut *self.position, self.tables, turn, &mut self.arena.moves);
            }
            return self.search_children(node, turn, depth, alpha, beta);
        };

        let mut scratch = self.arena.take(index)?;
        scratch.expand(&mut *self.position, self.tables, turn, &mut self.arena.moves);
        let result = self.search_children(&mut scratch, turn, depth, alpha, beta);
        self.arena.restore(index, scratch);
        result
    }

    fn search_children(
        &mut self,
        node: &mut GameTreeNode<P::Move>,
        turn: P::Side,
        depth: u32,
        alpha: f64,
        beta: f64,
    ) -> Result<f64, SearchError> {
        let children = node.children.get_or_insert_with(Vec::new);
        if depth == 0 || children.is_empty() {
            return Ok(self.position.evaluate(self.tables, turn, self.ply - depth));
        }

        let mut a = alpha;
        let mut b = beta;
        for (i, child) in children.iter_mut().enumerate() {
            let Some(mv) = child.mv else { continue };

            self.position.apply_move(mv);
            let scored = self.child_score(child, turn, depth, a, b, beta, i == 0);
            self.position.undo_move();

            a = a.max(scored?);
            if a >= beta {
                return Ok(a);
            }
            b = null_window_above(a);
        }
        Ok(a)
    }

    /// Null-window probe of one child, re-searched with the full upper bound
    /// when it lands strictly inside the window.
    #[allow(clippy::too_many_arguments)]
    fn child_score(
        &mut self,
        child: &mut GameTreeNode<P::Move>,
        turn: P::Side,
        depth: u32,
        a: f64,
        b: f64,
        beta: f64,
        first: bool,
    ) -> Result<f64, SearchError> {
        let next = turn.opponent();
        let t = -self.negascout(child, next, depth - 1, -b, -a)?;
        if t > a && t < beta && !first && depth > 1 {
            let full = -self.negascout(child, next, depth - 1, -beta, -t)?;
            return Ok(full.max(t));
        }
        Ok(t)
    }
}

/// Upper edge of the null window over `a`.
///
/// Near mate scores `a + EPSILON` rounds back to `a`, which would leave an
/// empty window that fails high on every probe; step to the next
/// representable value instead.
fn null_window_above(a: f64) -> f64 {
    let b = a + EPSILON;
    if b > a || !a.is_finite() {
        return b;
    }
    if a >= 0.0 {
        f64::from_bits(a.to_bits() + 1)
    } else {
        f64::from_bits(a.to_bits() - 1)
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
