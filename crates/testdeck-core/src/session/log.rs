//! Append-only session log.

use super::entry::{EntryId, LogicalClock, SessionEntry};
use crate::error::{Result, TestdeckError};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Smallest capacity a bounded log accepts: the pinned request plus its
/// closing Engine entry.
pub const MIN_HISTORY_CAPACITY: usize = 2;

#[derive(Debug, Default)]
struct LogInner {
    entries: VecDeque<Arc<SessionEntry>>,
    /// Ids of the retained entries.
    ids: HashSet<EntryId>,
    /// User entry of the request currently in flight; never evicted.
    pinned: Option<EntryId>,
    version: u64,
}

/// Append-only, append-ordered record of one session's exchanges.
///
/// Append order is the only ordering authority. Every `append` happens under
/// a single mutex, so concurrent callers never observe a half-applied entry.
/// With a capacity configured, the oldest unpinned entry is evicted to make
/// room.
#[derive(Debug)]
pub struct SessionLog {
    inner: Mutex<LogInner>,
    clock: LogicalClock,
    capacity: Option<usize>,
    version_tx: watch::Sender<u64>,
}

impl SessionLog {
    /// Creates an unbounded log.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a log that keeps at most `capacity` entries.
    ///
    /// Capacities below [`MIN_HISTORY_CAPACITY`] are raised to it, so the
    /// reply to an in-flight request always has room.
    pub fn bounded(capacity: usize) -> Self {
        Self::build(Some(capacity))
    }

    /// Creates a log with an optional capacity.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self::build(capacity)
    }

    fn build(capacity: Option<usize>) -> Self {
        let capacity = capacity.map(|requested| {
            if requested < MIN_HISTORY_CAPACITY {
                tracing::warn!(
                    requested,
                    min = MIN_HISTORY_CAPACITY,
                    "History capacity raised to the minimum"
                );
            }
            requested.max(MIN_HISTORY_CAPACITY)
        });
        let (version_tx, _) = watch::channel(0);
        Self {
            inner: Mutex::new(LogInner::default()),
            clock: LogicalClock::new(),
            capacity,
            version_tx,
        }
    }

    // Every mutation leaves `LogInner` consistent before it can panic, so a
    // poisoned guard still holds valid data.
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates the id for the next entry.
    pub fn next_id(&self) -> EntryId {
        self.clock.tick()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends `entry` at the end of the log.
    ///
    /// An entry whose id is already present is dropped silently.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when the log is full and every retained
    /// entry is pinned.
    pub fn append(&self, entry: SessionEntry) -> Result<()> {
        let mut inner = self.lock();
        self.push(&mut inner, entry)
    }

    /// Appends `entry` and pins it so eviction skips it until
    /// [`release_pin`](Self::release_pin) is called.
    pub fn append_pinned(&self, entry: SessionEntry) -> Result<()> {
        let mut inner = self.lock();
        let id = entry.id;
        self.push(&mut inner, entry)?;
        inner.pinned = Some(id);
        Ok(())
    }

    /// Drops the current pin, if any.
    pub fn release_pin(&self) {
        self.lock().pinned = None;
    }

    fn push(&self, inner: &mut LogInner, entry: SessionEntry) -> Result<()> {
        if inner.ids.contains(&entry.id) {
            tracing::debug!(entry_id = %entry.id, "Duplicate log entry ignored");
            return Ok(());
        }

        if let Some(capacity) = self.capacity {
            while inner.entries.len() >= capacity {
                let pinned = inner.pinned;
                let victim = inner
                    .entries
                    .iter()
                    .position(|e| Some(e.id) != pinned)
                    .ok_or(TestdeckError::CapacityExceeded { capacity })?;
                if let Some(evicted) = inner.entries.remove(victim) {
                    inner.ids.remove(&evicted.id);
                    tracing::debug!(entry_id = %evicted.id, "Evicted oldest log entry");
                }
            }
        }

        inner.ids.insert(entry.id);
        inner.entries.push_back(Arc::new(entry));
        inner.version += 1;
        self.version_tx.send_replace(inner.version);
        Ok(())
    }

    /// Returns a snapshot of every entry in append order.
    pub fn all(&self) -> LogSnapshot {
        let inner = self.lock();
        LogSnapshot {
            entries: inner.entries.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn last(&self) -> Option<SessionEntry> {
        self.lock().entries.back().map(|e| e.as_ref().clone())
    }

    /// Removes every entry. Only an explicit session reset calls this.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.ids.clear();
        inner.pinned = None;
        inner.version += 1;
        self.version_tx.send_replace(inner.version);
    }

    /// Subscribes to the log version, bumped on every append and clear.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time view of the log.
///
/// Iterating does not consume the snapshot, so it can be walked any number
/// of times; later appends to the log are not reflected.
#[derive(Debug, Clone, Default)]
pub struct LogSnapshot {
    entries: Vec<Arc<SessionEntry>>,
}

impl LogSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &SessionEntry> + '_ {
        self.entries.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&SessionEntry> {
        self.entries.last().map(|e| e.as_ref())
    }

    pub fn to_vec(&self) -> Vec<SessionEntry> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::entry::EntryRole;

    fn user(log: &SessionLog, text: &str) -> SessionEntry {
        SessionEntry::user(log.next_id(), text)
    }

    #[test]
    fn test_append_keeps_order() {
        let log = SessionLog::new();
        log.append(user(&log, "a")).unwrap();
        log.append(SessionEntry::engine(log.next_id(), "b")).unwrap();

        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["a", "b"]);
        assert_eq!(log.last().map(|e| e.role), Some(EntryRole::Engine));
    }

    #[test]
    fn test_order_ignores_timestamps() {
        let log = SessionLog::new();
        let mut late = user(&log, "first");
        late.created_at = "2099-01-01T00:00:00+00:00".to_string();
        let mut early = user(&log, "second");
        early.created_at = "1999-01-01T00:00:00+00:00".to_string();

        log.append(late).unwrap();
        log.append(early).unwrap();

        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let log = SessionLog::new();
        log.append(user(&log, "x")).unwrap();
        let snapshot = log.all();

        assert_eq!(snapshot.iter().count(), 1);
        assert_eq!(snapshot.iter().count(), 1);

        log.append(user(&log, "y")).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_duplicate_id_ignored() {
        let log = SessionLog::new();
        let entry = user(&log, "once");
        log.append(entry.clone()).unwrap();
        log.append(entry).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_bounded_evicts_oldest_first() {
        let log = SessionLog::bounded(2);
        for text in ["a", "b", "c"] {
            log.append(user(&log, text)).unwrap();
        }
        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[test]
    fn test_bounded_never_evicts_pinned() {
        let log = SessionLog::bounded(2);
        log.append_pinned(user(&log, "request")).unwrap();
        log.append(SessionEntry::engine(log.next_id(), "noise")).unwrap();
        log.append(SessionEntry::engine(log.next_id(), "reply")).unwrap();

        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["request", "reply"]);

        log.release_pin();
        log.append(user(&log, "next")).unwrap();
        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["reply", "next"]);
    }

    #[test]
    fn test_tiny_capacity_still_keeps_reply() {
        let log = SessionLog::bounded(1);
        assert_eq!(log.capacity(), Some(MIN_HISTORY_CAPACITY));
        assert_eq!(SessionLog::with_capacity(Some(0)).capacity(), Some(2));

        log.append_pinned(user(&log, "request")).unwrap();
        log.append(SessionEntry::engine(log.next_id(), "reply")).unwrap();

        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["request", "reply"]);
    }

    #[test]
    fn test_evicted_id_can_be_appended_again() {
        let log = SessionLog::bounded(2);
        let first = user(&log, "a");
        log.append(first.clone()).unwrap();
        log.append(user(&log, "b")).unwrap();
        log.append(user(&log, "c")).unwrap();
        assert_eq!(log.len(), 2);

        // Only retained ids count as duplicates.
        log.append(first).unwrap();
        let contents: Vec<_> = log.all().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["c", "a"]);
    }

    #[test]
    fn test_clear_forgets_ids() {
        let log = SessionLog::new();
        let entry = user(&log, "again");
        log.append(entry.clone()).unwrap();
        log.clear();
        log.append(entry).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clear_and_version() {
        let log = SessionLog::new();
        let rx = log.subscribe();
        log.append(user(&log, "a")).unwrap();
        assert_eq!(*rx.borrow(), 1);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(*rx.borrow(), 2);
    }

    #[test]
    fn test_concurrent_appends_are_whole() {
        let log = Arc::new(SessionLog::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let entry = SessionEntry::user(log.next_id(), format!("{t}-{i}"));
                        log.append(entry).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = log.all();
        assert_eq!(snapshot.len(), 400);
        let mut ids: Vec<_> = snapshot.iter().map(|e| e.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 400);
    }
}
