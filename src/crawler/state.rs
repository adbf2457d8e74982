use serde::Serialize;
use std::collections::HashSet;

use crate::article::ArticleId;

/// Current state of the walk
#[derive(Debug)]
pub struct TraversalState {
    /// Article being expanded
    pub current: ArticleId,
    /// Clicks from the start to `current`
    pub hops: usize,
    /// Every article ever placed on the path, dead ends included
    pub visited: HashSet<ArticleId>,
    /// Articles from the start to `current`
    pub path: Vec<ArticleId>,
    pub backtracks: usize,
}

impl TraversalState {
    pub fn new(start: ArticleId) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start.clone());

        Self {
            current: start.clone(),
            hops: 0,
            visited,
            path: vec![start],
            backtracks: 0,
        }
    }

    /// One click forward
    pub fn advance(&mut self, next: ArticleId) {
        debug_assert!(!self.visited.contains(&next), "{} was already visited", next);
        self.visited.insert(next.clone());
        self.path.push(next.clone());
        self.current = next;
        self.hops += 1;
    }

    /// Steps back from a dead end. The dead end stays visited so it is never
    /// chosen again. Returns `None` when already at the start.
    pub fn backtrack(&mut self) -> Option<&ArticleId> {
        if self.path.len() < 2 {
            return None;
        }
        self.path.pop();
        self.current = self.path.last()?.clone();
        self.hops -= 1;
        self.backtracks += 1;
        Some(&self.current)
    }

    pub fn into_outcome(self) -> WalkOutcome {
        WalkOutcome {
            hops: self.hops,
            visited: self.visited.len(),
            terminal: self.current,
            path: self.path,
            backtracks: self.backtracks,
        }
    }
}

/// A finished walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkOutcome {
    pub hops: usize,
    /// Size of the visited set at the end, dead ends included
    pub visited: usize,
    pub terminal: ArticleId,
    pub path: Vec<ArticleId>,
    pub backtracks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(slug: &str) -> ArticleId {
        ArticleId::parse(slug).unwrap()
    }

    #[test]
    fn test_start_is_visited() {
        let state = TraversalState::new(id("Start"));
        assert!(state.visited.contains(&id("Start")));
        assert_eq!(state.path, vec![id("Start")]);
        assert_eq!(state.hops, 0);
    }

    #[test]
    fn test_each_hop_adds_exactly_one_visited() {
        let mut state = TraversalState::new(id("Start"));
        for (i, slug) in ["A", "B", "C", "D"].iter().enumerate() {
            let before = state.visited.len();
            state.advance(id(slug));
            assert_eq!(state.visited.len(), before + 1);
            assert_eq!(state.hops, i + 1);
        }
        assert_eq!(state.into_outcome().visited, 5);
    }

    #[test]
    fn test_backtrack_keeps_dead_end_visited() {
        let mut state = TraversalState::new(id("Start"));
        state.advance(id("A"));
        state.advance(id("Dead_end"));

        assert_eq!(state.backtrack(), Some(&id("A")));
        assert_eq!(state.hops, 1);
        assert_eq!(state.backtracks, 1);
        assert_eq!(state.path, vec![id("Start"), id("A")]);
        assert!(state.visited.contains(&id("Dead_end")));
        assert_eq!(state.visited.len(), 3);
    }

    #[test]
    fn test_cannot_backtrack_past_start() {
        let mut state = TraversalState::new(id("Start"));
        assert_eq!(state.backtrack(), None);
        assert_eq!(state.current, id("Start"));
    }
}
