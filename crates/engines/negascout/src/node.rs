//! Game tree nodes.

use std::cmp::Ordering;

use crate::state::GameState;

/// One node of the cached search tree.
///
/// `mv` is the move that led here (absent only for a freshly built root),
/// `eval` the last score recorded for it from the perspective of the side
/// that played `mv`, and `children` the legal replies once expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct GameTreeNode<M> {
    pub mv: Option<M>,
    pub eval: Option<f64>,
    pub children: Option<Vec<GameTreeNode<M>>>,
}

impl<M> Default for GameTreeNode<M> {
    fn default() -> Self {
        Self { mv: None, eval: None, children: None }
    }
}

impl<M: Copy + PartialEq> GameTreeNode<M> {
    /// An unexpanded root reached by `last`.
    pub fn root(last: Option<M>) -> Self {
        Self { mv: last, eval: None, children: None }
    }

    pub fn leaf(mv: M) -> Self {
        Self { mv: Some(mv), eval: None, children: None }
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[GameTreeNode<M>] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Ordering key; nodes never scored sort last.
    pub fn score(&self) -> f64 {
        self.eval.unwrap_or(f64::NEG_INFINITY)
    }

    /// Replaces the children with fresh leaves for every legal move of `side`.
    ///
    /// An existing child vector is cleared and refilled so repeated expansion
    /// of the same scratch node keeps its allocation.
    pub fn expand<P>(&mut self, position: &mut P, tables: &P::Tables, side: P::Side, buf: &mut Vec<M>)
    where
        P: GameState<Move = M>,
    {
        position.legal_moves_into(tables, side, buf);
        let children = self.children.get_or_insert_with(Vec::new);
        children.clear();
        children.extend(buf.drain(..).map(GameTreeNode::leaf));
    }

    /// Detaches the child reached by `mv`, dropping its siblings.
    pub fn take_child(&mut self, mv: M) -> Option<Self> {
        let children = self.children.take()?;
        children.into_iter().find(|child| child.mv == Some(mv))
    }

    /// Sorts children by score, best first. Equal scores keep their order.
    pub fn sort_children(&mut self) {
        if let Some(children) = self.children.as_mut() {
            sort_by_score(children);
        }
    }
}

/// Stable descending sort on [`GameTreeNode::score`].
///
/// `0.0` and `-0.0` count as a tie.
pub fn sort_by_score<M>(nodes: &mut [GameTreeNode<M>]) {
    nodes.sort_by(|a, b| {
        let (a, b) = (a.eval.unwrap_or(f64::NEG_INFINITY), b.eval.unwrap_or(f64::NEG_INFINITY));
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use chess_core::{Move, MoveTables, Position};

    use super::*;

    fn scored(from: u8, to: u8, eval: Option<f64>) -> GameTreeNode<Move> {
        GameTreeNode { eval, ..GameTreeNode::leaf(Move::new(from, to)) }
    }

    #[test]
    fn test_expand_lists_every_legal_move() {
        let tables = MoveTables::generate();
        let mut pos = Position::startpos();
        let mut node = GameTreeNode::root(None);
        let mut buf = Vec::new();
        node.expand(&mut pos, &tables, chess_core::Color::White, &mut buf);

        assert_eq!(node.children().len(), 20);
        assert!(node.children().iter().all(|c| c.eval.is_none() && !c.is_expanded()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_reexpansion_replaces_children() {
        let tables = MoveTables::generate();
        let mut pos = Position::startpos();
        let mut node = GameTreeNode::root(None);
        let mut buf = Vec::new();
        node.expand(&mut pos, &tables, chess_core::Color::White, &mut buf);
        node.expand(&mut pos, &tables, chess_core::Color::White, &mut buf);
        assert_eq!(node.children().len(), 20);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let mut nodes = vec![
            scored(8, 16, Some(1.0)),
            scored(9, 17, None),
            scored(10, 18, Some(5.0)),
            scored(11, 19, Some(1.0)),
        ];
        sort_by_score(&mut nodes);
        let order: Vec<_> = nodes.iter().map(|n| n.mv.unwrap().from).collect();
        assert_eq!(order, vec![10, 8, 11, 9]);
    }

    #[test]
    fn test_signed_zeros_tie() {
        let mut nodes = vec![scored(8, 16, Some(-0.0)), scored(9, 17, Some(0.0)), scored(10, 18, Some(-0.0))];
        sort_by_score(&mut nodes);
        let order: Vec<_> = nodes.iter().map(|n| n.mv.unwrap().from).collect();
        assert_eq!(order, vec![8, 9, 10]);
    }

    #[test]
    fn test_take_child_finds_matching_move() {
        let mut root = GameTreeNode::root(None);
        root.children = Some(vec![scored(8, 16, None), scored(12, 28, Some(3.0))]);
        let child = root.take_child(Move::new(12, 28)).unwrap();
        assert_eq!(child.eval, Some(3.0));
        assert!(root.take_child(Move::new(8, 16)).is_none());
    }
}
