//! Undo/redo history engines for the backtrack editing core.
//!
//! Three parallel engines protect the three kinds of editable document
//! state: [`PatternHistory`] snapshots rectangular regions of the note
//! grid, [`SampleHistory`] snapshots byte ranges of sample audio under a
//! shared memory budget, and [`InstrumentHistory`] snapshots envelope
//! curves or whole instrument records. They share one contract — capture
//! a minimal snapshot before a mutation, restore it on undo, mirror it
//! for redo — but no runtime state.
//!
//! The engines are single-threaded and synchronous: every operation runs
//! to completion on the calling thread, and either commits its stack
//! changes or fails before any stack is touched. A new capture always
//! clears the affected redo history.

mod instrument;
mod pattern;
mod sample;

pub use instrument::{InstrumentHistory, InstrumentTarget};
pub use pattern::{PatternHistory, PatternRegion};
pub use sample::{SampleChange, SampleHistory};

use core::fmt;

/// Default maximum number of undo steps per entity stack.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Errors returned by history capture operations.
///
/// Undo/redo themselves don't use this type: an empty stack is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// Entity id out of range, or no entity at that slot
    InvalidEntity,
    /// Change region outside the entity's bounds or malformed (start > end).
    /// Callers treat this as a programming-contract violation.
    InvalidRange,
    /// Snapshot buffer allocation failed, or the payload alone exceeds the
    /// configured byte budget
    OutOfMemory,
    /// Capture is disabled (the configured byte budget is zero)
    Disabled,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::InvalidEntity => write!(f, "invalid entity reference"),
            HistoryError::InvalidRange => write!(f, "invalid change range"),
            HistoryError::OutOfMemory => write!(f, "snapshot allocation failed"),
            HistoryError::Disabled => write!(f, "history capture is disabled"),
        }
    }
}

impl std::error::Error for HistoryError {}

/// Change notification hook: fired once after every successful capture,
/// undo, or redo, with no payload. The editor hangs view refreshes off it.
pub(crate) type NotifyHook = Option<Box<dyn FnMut()>>;

pub(crate) fn fire(notify: &mut NotifyHook) {
    if let Some(hook) = notify {
        hook();
    }
}

/// Drop the oldest entries of `steps` so that one more entry fits under
/// `depth`.
pub(crate) fn evict_for_push<T>(steps: &mut Vec<T>, depth: usize) {
    if steps.len() >= depth {
        let excess = steps.len() + 1 - depth;
        steps.drain(..excess);
    }
}
