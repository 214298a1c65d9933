//! Threshold-to-reset policy.
//!
//! Every logical operation (one add, one forwarded property change, one
//! range operation) yields a batch of pending records. A batch of N records
//! is emitted record by record when N < threshold, and as exactly one reset
//! otherwise. Batches are judged one at a time; nothing accumulates across
//! operations.

use crate::types::ChangeRecord;

/// Pending records of one logical operation.
#[derive(Clone, Debug)]
pub(crate) struct Batch<R> {
    records: Vec<R>,
    /// Clear / explicit reset: already a reset regardless of threshold.
    reset: bool,
}

/// Emitted form of a batch.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Shape<R> {
    /// Nothing changed.
    Nothing,
    Individual(Vec<R>),
    Reset,
}

impl<R: ChangeRecord> Batch<R> {
    pub(crate) fn empty() -> Self {
        Self {
            records: Vec::new(),
            reset: false,
        }
    }

    pub(crate) fn single(record: R) -> Self {
        Self {
            records: vec![record],
            reset: false,
        }
    }

    pub(crate) fn reset() -> Self {
        Self {
            records: Vec::new(),
            reset: true,
        }
    }

    pub(crate) fn push(&mut self, record: R) {
        self.records.push(record);
    }

    /// Apply the threshold.
    pub(crate) fn shape(self, threshold: usize) -> Shape<R> {
        if self.reset {
            return Shape::Reset;
        }
        if self.records.is_empty() {
            return Shape::Nothing;
        }
        if collapses(self.records.len(), threshold) {
            Shape::Reset
        } else {
            Shape::Individual(self.records)
        }
    }
}

impl<R: ChangeRecord> From<Vec<R>> for Batch<R> {
    fn from(records: Vec<R>) -> Self {
        Self {
            records,
            reset: false,
        }
    }
}

/// Whether `pending` records are collapsed into one reset.
pub(crate) fn collapses(pending: usize, threshold: usize) -> bool {
    pending >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DictionaryChange;

    type Change = DictionaryChange<u32, u32>;

    fn batch_of(n: u32) -> Batch<Change> {
        (0..n)
            .map(|i| DictionaryChange::added(i, i))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_below_threshold_is_individual() {
        match batch_of(3).shape(4) {
            Shape::Individual(records) => {
                let keys: Vec<_> = records.iter().map(|r| r.key.unwrap()).collect();
                assert_eq!(keys, vec![0, 1, 2]);
            }
            other => panic!("expected individual records, got {:?}", other),
        }
    }

    #[test]
    fn test_at_threshold_collapses() {
        assert_eq!(batch_of(3).shape(3), Shape::Reset);
        assert_eq!(batch_of(10).shape(3), Shape::Reset);
    }

    #[test]
    fn test_zero_threshold_collapses_single_records() {
        assert_eq!(batch_of(1).shape(0), Shape::Reset);
    }

    #[test]
    fn test_max_threshold_never_collapses() {
        assert!(matches!(batch_of(50).shape(usize::MAX), Shape::Individual(_)));
    }

    #[test]
    fn test_empty_batch_emits_nothing() {
        assert_eq!(Batch::<Change>::empty().shape(0), Shape::Nothing);
    }

    #[test]
    fn test_explicit_reset_ignores_threshold() {
        assert_eq!(Batch::<Change>::reset().shape(usize::MAX), Shape::Reset);
    }
}
