//! Execution buffer and the monotonic clock it is timed against.
//!
//! The buffer is a slot array: a fired statement frees its slot, and new
//! statements reuse the first free slot before the array grows.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::permissions::CommandSource;

/// Monotonic time source for scheduling.
pub trait Clock: Send + Sync {
    /// Time since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock advanced explicitly by the host.
///
/// Clones share the same time, so the host can keep a handle while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current time. Earlier values than the current one are ignored.
    pub fn set(&self, now: Duration) {
        let nanos = u64::try_from(now.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| {
                Some(t.saturating_add(nanos))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// A statement waiting in the execution buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStatement {
    pub text: String,
    pub due: Duration,
    pub source: CommandSource,
    pub network: bool,
    /// Alias expansions between the submitted line and this statement.
    pub alias_depth: usize,
}

/// Slot array of scheduled statements.
#[derive(Debug, Default)]
pub struct ExecBuffer {
    slots: Vec<Option<ScheduledStatement>>,
}

impl ExecBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a statement in the first free slot, growing if none is free.
    /// Returns the slot index.
    pub fn enqueue(&mut self, statement: ScheduledStatement) -> usize {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(statement);
                index
            }
            None => {
                self.slots.push(Some(statement));
                self.slots.len() - 1
            }
        }
    }

    /// Free slot `index` and return its statement if it is due at `now`.
    pub fn take_due(&mut self, index: usize, now: Duration) -> Option<ScheduledStatement> {
        let slot = self.slots.get_mut(index)?;
        if slot.as_ref().is_some_and(|s| s.due <= now) {
            slot.take()
        } else {
            None
        }
    }

    /// Whether any queued statement is due at `now`.
    pub fn has_due(&self, now: Duration) -> bool {
        self.iter().any(|s| s.due <= now)
    }

    /// Number of slots, free or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of queued statements.
    pub fn queued(&self) -> usize {
        self.iter().count()
    }

    /// Queued statements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledStatement> {
        self.slots.iter().flatten()
    }

    /// Drop every queued statement. Slots are kept for reuse.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}
