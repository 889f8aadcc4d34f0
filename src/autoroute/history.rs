//! Best boards seen while routing, kept so the router can fall back to one of them.

use log::debug;

use crate::{
    board::{item::Item, statistics::BoardStatistics, RoutingBoard},
    settings::ScoringSettings,
};

#[derive(Debug, Clone)]
struct BoardHistoryEntry {
    board: RoutingBoard,
    hash: u64,
    fingerprint: Vec<Item>,
    score: f64,
    restore_count: usize,
}

/// A bounded set of board snapshots ranked by score. Snapshots are deep copies, both on
/// the way in and on the way out.
#[derive(Debug, Clone)]
pub struct BoardHistory {
    entries: Vec<BoardHistoryEntry>,
    scoring: ScoringSettings,
    capacity: usize,
}

impl BoardHistory {
    pub fn new(scoring: ScoringSettings, capacity: usize) -> Self {
        Self {
            entries: vec![],
            scoring,
            capacity: capacity.max(1),
        }
    }

    /// Scores and stores a copy of `board`. A board already in the history is not added
    /// again. Over capacity, the lowest-scoring entry is dropped.
    pub fn add(&mut self, board: &RoutingBoard) -> bool {
        let hash = board.state_hash();
        let fingerprint = board.fingerprint();

        if self.position(hash, &fingerprint).is_some() {
            return false;
        }

        let score = BoardStatistics::new(board).normalized_score(&self.scoring);
        debug!("adding board with score {:.2} to history", score);

        self.entries.push(BoardHistoryEntry {
            board: board.clone(),
            hash,
            fingerprint,
            score,
            restore_count: 0,
        });
        self.sort();

        if self.entries.len() > self.capacity {
            self.entries.pop();
        }

        true
    }

    fn sort(&mut self) {
        // Stable, so among equal scores the earlier board ranks first.
        self.entries
            .sort_by(|entry, other| other.score.total_cmp(&entry.score));
    }

    fn position(&self, hash: u64, fingerprint: &[Item]) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.hash == hash && entry.fingerprint == fingerprint)
    }

    pub fn contains(&self, board: &RoutingBoard) -> bool {
        self.position(board.state_hash(), &board.fingerprint())
            .is_some()
    }

    pub fn remove(&mut self, board: &RoutingBoard) -> bool {
        match self.position(board.state_hash(), &board.fingerprint()) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// A copy of the best board restored at most `max_restore_count` times so far. `0` means
    /// no limit.
    pub fn restore_board(&mut self, max_restore_count: usize) -> Option<RoutingBoard> {
        let max_restore_count = match max_restore_count {
            0 => usize::MAX,
            count => count,
        };

        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.restore_count <= max_restore_count)?;

        entry.restore_count += 1;
        Some(entry.board.clone())
    }

    pub fn restore_best_board(&mut self) -> Option<RoutingBoard> {
        self.restore_board(0)
    }

    pub fn max_score(&self) -> f64 {
        self.entries.first().map_or(0.0, |entry| entry.score)
    }

    /// 1-based position of `board` by score.
    pub fn rank(&self, board: &RoutingBoard) -> Option<usize> {
        self.position(board.state_hash(), &board.fingerprint())
            .map(|position| position + 1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
