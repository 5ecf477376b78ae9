//! Undo/redo history for a participant's local edits.
//!
//! Records own deep copies of the state they restore. History is local to
//! one session and discarded when it ends.

mod record;
mod stack;

pub use record::{ChangeRecord, ChangeType, RecordTarget, Snapshot};
pub use stack::{ChangeEntry, ChangeStack};
