/*
 * Scheduler Type Definitions
 *
 * This module defines the core types used throughout the scheduling core.
 * These types are designed to be lightweight, Copy-able, and suitable for
 * use in both the queue layer and the dispatch layer.
 */

use core::fmt;

use crate::thread::ThreadId;

/// Thread priority
///
/// Valid priorities span [0, 149]. Higher values indicate higher priority
/// and select a higher ready-queue tier. Values outside the range are
/// clamped at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Minimum priority
    pub const MIN: Priority = Priority(0);

    /// Maximum priority
    pub const MAX: Priority = Priority(149);

    /// Create a priority, clamping the value into [MIN, MAX]
    pub const fn new(value: i32) -> Self {
        if value < Self::MIN.0 {
            Self::MIN
        } else if value > Self::MAX.0 {
            Self::MAX
        } else {
            Priority(value)
        }
    }

    /// Get the value as i32
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Priority raised by `amount`, saturating at [`Priority::MAX`]
    pub const fn boosted(self, amount: i32) -> Self {
        Self::new(self.0.saturating_add(amount))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ready-queue tier
///
/// The scheduler keeps three ready queues with different ordering
/// disciplines. A thread's current priority selects its tier:
/// L1 serves shortest-predicted-burst first, L2 serves highest priority
/// first, L3 is plain FIFO.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueueLevel {
    /// Priority 100 and above, ordered ascending by burst estimate
    L1,
    /// Priority 50..=99, ordered descending by priority
    L2,
    /// Priority below 50, first-in first-out
    L3,
}

impl QueueLevel {
    /// Tier for a given priority
    pub const fn for_priority(priority: Priority) -> QueueLevel {
        if priority.0 >= 100 {
            QueueLevel::L1
        } else if priority.0 >= 50 {
            QueueLevel::L2
        } else {
            QueueLevel::L3
        }
    }

    /// Tier number as printed in telemetry (1, 2, or 3)
    pub const fn number(self) -> u32 {
        match self {
            QueueLevel::L1 => 1,
            QueueLevel::L2 => 2,
            QueueLevel::L3 => 3,
        }
    }
}

impl fmt::Display for QueueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.number())
    }
}

/// Fatal scheduler contract violations
///
/// Every failure the core can detect indicates corrupted kernel state, never
/// a recoverable runtime condition: the core performs no I/O and receives no
/// untrusted input. Operations surface these through `Result` so callers can
/// tell them apart from normal outcomes; the embedder is expected to abort
/// on any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedFatal {
    /// An operation requiring masked interrupts found them enabled
    InterruptsUnmasked { op: &'static str },
    /// A finishing dispatch found the destruction slot already occupied
    DestructionPending {
        pending: ThreadId,
        finishing: ThreadId,
    },
    /// A thread was inserted while already in a ready queue
    AlreadyQueued(ThreadId),
    /// A thread was removed while not in any ready queue
    NotQueued(ThreadId),
    /// A thread id was registered twice
    DuplicateThread(ThreadId),
    /// An operation named a thread the scheduler does not know
    UnknownThread(ThreadId),
    /// A thread that must leave the queues first is still queued
    StillQueued(ThreadId),
}

impl fmt::Display for SchedFatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedFatal::InterruptsUnmasked { op } => {
                write!(f, "{} requires interrupts masked", op)
            }
            SchedFatal::DestructionPending { pending, finishing } => write!(
                f,
                "thread {} finished while thread {} is still pending destruction",
                finishing.0, pending.0
            ),
            SchedFatal::AlreadyQueued(tid) => {
                write!(f, "thread {} is already in a ready queue", tid.0)
            }
            SchedFatal::NotQueued(tid) => {
                write!(f, "thread {} is not in any ready queue", tid.0)
            }
            SchedFatal::DuplicateThread(tid) => {
                write!(f, "thread {} is already registered with the scheduler", tid.0)
            }
            SchedFatal::UnknownThread(tid) => {
                write!(f, "thread {} is not registered with the scheduler", tid.0)
            }
            SchedFatal::StillQueued(tid) => {
                write!(f, "thread {} is still in a ready queue", tid.0)
            }
        }
    }
}
