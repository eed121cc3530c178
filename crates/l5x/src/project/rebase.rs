//! Rung positions against the start of a transaction.

use crate::error::L5xError;

/// Maps rung positions as they were when a transaction started to positions
/// in the routine as it is now.
///
/// Every insert and delete of the transaction is recorded by its start
/// position. An insert recorded at `p` lands before the rung that started at
/// `p`, so later inserts at the same start position follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRebaser {
    inserts: Vec<usize>,
    deletes: Vec<usize>,
}

impl IndexRebaser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rungs the routine had at the start, given its current count.
    pub fn start_count(&self, current: usize) -> usize {
        (current + self.deletes.len()).saturating_sub(self.inserts.len())
    }

    /// Current position at which a rung inserted at start position `start`
    /// goes.
    pub fn insert_position(&self, start: usize) -> usize {
        let before = self.inserts.iter().filter(|&&p| p <= start).count();
        let removed = self.deletes.iter().filter(|&&p| p < start).count();
        start + before - removed
    }

    /// Current position of the rung that was at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`L5xError::RungDeleted`] if the transaction deleted it.
    pub fn current(&self, start: usize) -> Result<usize, L5xError> {
        if self.deletes.contains(&start) {
            return Err(L5xError::RungDeleted { index: start });
        }
        Ok(self.insert_position(start))
    }

    pub fn record_insert(&mut self, start: usize) {
        self.inserts.push(start);
    }

    pub fn record_delete(&mut self, start: usize) {
        self.deletes.push(start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_positions_are_identity() {
        let rebaser = IndexRebaser::new();
        assert_eq!(rebaser.current(3).unwrap(), 3);
        assert_eq!(rebaser.start_count(5), 5);
    }

    #[test]
    fn test_inserts_shift_later_rungs() {
        let mut rebaser = IndexRebaser::new();
        rebaser.record_insert(1);
        assert_eq!(rebaser.current(0).unwrap(), 0);
        assert_eq!(rebaser.current(1).unwrap(), 2);
        assert_eq!(rebaser.current(4).unwrap(), 5);
        // A second insert at the same start position follows the first.
        assert_eq!(rebaser.insert_position(1), 2);
        assert_eq!(rebaser.start_count(6), 5);
    }

    #[test]
    fn test_deletes_shift_back_and_are_remembered() {
        let mut rebaser = IndexRebaser::new();
        rebaser.record_delete(2);
        assert_eq!(rebaser.current(1).unwrap(), 1);
        assert_eq!(rebaser.current(3).unwrap(), 2);
        assert!(matches!(
            rebaser.current(2),
            Err(L5xError::RungDeleted { index: 2 })
        ));
        assert_eq!(rebaser.start_count(4), 5);
    }

    #[test]
    fn test_mixed_batch() {
        // Start: [a, b, c, d]. Insert x at 0, delete b, insert y at 3.
        let mut rebaser = IndexRebaser::new();
        assert_eq!(rebaser.insert_position(0), 0);
        rebaser.record_insert(0);
        assert_eq!(rebaser.current(1).unwrap(), 2);
        rebaser.record_delete(1);
        assert_eq!(rebaser.insert_position(3), 3);
        rebaser.record_insert(3);
        // Now: [x, a, c, y, d].
        assert_eq!(rebaser.current(0).unwrap(), 1);
        assert_eq!(rebaser.current(2).unwrap(), 2);
        assert_eq!(rebaser.current(3).unwrap(), 4);
    }
}
