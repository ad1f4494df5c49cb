/*
 * Thread Records
 *
 * This module defines the thread record the scheduling core keeps per
 * thread, together with its identifier and state types. Records live in
 * the dispatcher's arena and are referenced everywhere else by ThreadId.
 */

use alloc::string::String;
use core::fmt;

use crate::types::Priority;

/// Thread identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub usize);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

/// Thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Finished,
}

/// Thread record
///
/// Holds the scheduling-relevant fields for one thread. The stack, register
/// context, and address space live outside the core behind the machine
/// collaborator; the core only tracks what it needs to classify, order,
/// promote, and account for the thread.
///
/// Timestamps are ticks of the external clock. `ready_since` is reset on
/// every admission and on every aging promotion; `burst_start` is reset each
/// time the thread is dispatched.
#[derive(Debug, Clone)]
pub struct Thread {
    pub id: ThreadId,
    pub name: String,
    pub priority: Priority,
    pub state: ThreadState,

    /// Tick at which the thread most recently became Ready or was promoted
    pub ready_since: u64,

    /// Predicted length of the next CPU burst, orders the top tier
    pub burst_estimate: f64,

    /// Tick at which the thread most recently began Running
    pub burst_start: u64,

    /// Cumulative ticks spent Running
    pub total_exec_ticks: u64,

    /// Whether the thread owns a user address space (gates save/restore)
    pub has_user_space: bool,
}

impl Thread {
    pub fn new(id: ThreadId, name: &str, priority: Priority) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            state: ThreadState::Ready,
            ready_since: 0,
            burst_estimate: 0.0,
            burst_start: 0,
            total_exec_ticks: 0,
            has_user_space: false,
        }
    }
}
