//! Session log entry types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logical-clock identifier of a log entry.
///
/// Ids grow strictly within a session and double as the request id of the
/// User entry that opened a request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// The operator's request.
    User,
    /// The generation engine's reply, failure summary, or cancellation notice.
    Engine,
}

/// A single, immutable entry of the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: EntryId,
    pub role: EntryRole,
    pub content: String,
    /// Wall-clock time (RFC 3339). Display only; never used for ordering.
    pub created_at: String,
}

impl SessionEntry {
    pub fn new(id: EntryId, role: EntryRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn user(id: EntryId, content: impl Into<String>) -> Self {
        Self::new(id, EntryRole::User, content)
    }

    pub fn engine(id: EntryId, content: impl Into<String>) -> Self {
        Self::new(id, EntryRole::Engine, content)
    }
}

/// Monotonic source of entry ids.
#[derive(Debug)]
pub struct LogicalClock {
    next: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id, strictly greater than every id returned before.
    pub fn tick(&self) -> EntryId {
        EntryId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}
