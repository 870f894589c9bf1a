//! Session domain module.
//!
//! # Module Structure
//!
//! - `entry`: log entry types (`SessionEntry`, `EntryRole`, `EntryId`)
//! - `log`: the append-only `SessionLog`
//! - `state`: request lifecycle (`SessionState`, `SessionStatus`, `PendingRequest`)

mod entry;
mod log;
mod state;

pub use entry::{EntryId, EntryRole, LogicalClock, SessionEntry};
pub use log::{LogSnapshot, MIN_HISTORY_CAPACITY, SessionLog};
pub use state::{PendingRequest, SessionState, SessionStatus};
