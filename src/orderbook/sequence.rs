//! Sequence tracking for delta batches

use thiserror::Error;

/// Sequence guard errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Batch is older than or equal to the last accepted one
    #[error("stale sequence {received} (last accepted {last})")]
    Stale { last: u64, received: u64 },
}

/// Cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceState {
    /// No batch accepted since creation or the last reset
    #[default]
    Uninitialized,
    /// Tracking the last accepted sequence
    Synced { last: u64 },
}

/// Rejects replayed and out-of-order batches.
///
/// One cursor per market, shared by the bid and ask sides.
#[derive(Debug, Clone, Default)]
pub struct SequenceGuard {
    state: SequenceState,
}

impl SequenceGuard {
    /// Create a guard in the uninitialized state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Last accepted sequence, if any
    pub fn last(&self) -> Option<u64> {
        match self.state {
            SequenceState::Uninitialized => None,
            SequenceState::Synced { last } => Some(last),
        }
    }

    /// Admit `sequence` if it is the first seen or strictly newer.
    ///
    /// The cursor only moves on success.
    pub fn check(&mut self, sequence: u64) -> Result<(), SequenceError> {
        match self.state {
            SequenceState::Synced { last } if sequence <= last => Err(SequenceError::Stale {
                last,
                received: sequence,
            }),
            _ => {
                self.state = SequenceState::Synced { last: sequence };
                Ok(())
            }
        }
    }

    /// Forget the cursor
    pub fn reset(&mut self) {
        self.state = SequenceState::Uninitialized;
    }
}
