/*
 * Scheduler Event Definitions
 *
 * This module defines the telemetry events the scheduling core emits and
 * the sink interface they flow through. The rendered strings are a
 * compatibility surface: verification harnesses parse them literally, so
 * the Display formats must stay stable down to the punctuation. The
 * insertion line ends with a period; the removal line does not.
 */

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::thread::ThreadId;
use crate::types::{Priority, QueueLevel};

/// Events the scheduling core reports through its sink
///
/// Each event captures the tick at which it occurred plus the identifiers a
/// harness needs; rendering happens in the Display impl so sinks can store
/// events structured and format them late.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedEvent {
    /// A thread was placed into a ready-queue tier
    Inserted {
        tick: u64,
        tid: ThreadId,
        level: QueueLevel,
    },

    /// The aging pass pulled a thread out of its tier for promotion
    Removed {
        tick: u64,
        tid: ThreadId,
        level: QueueLevel,
    },

    /// A promotion raised a thread's priority
    PriorityChanged {
        tick: u64,
        tid: ThreadId,
        from: Priority,
        to: Priority,
    },

    /// A thread was dispatched onto the CPU
    Selected { tick: u64, tid: ThreadId },

    /// A thread left the CPU; carries its new cumulative execution total
    Replaced {
        tick: u64,
        tid: ThreadId,
        executed_ticks: u64,
    },
}

impl SchedEvent {
    /// Get a short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SchedEvent::Inserted { .. } => "Inserted",
            SchedEvent::Removed { .. } => "Removed",
            SchedEvent::PriorityChanged { .. } => "PriorityChanged",
            SchedEvent::Selected { .. } => "Selected",
            SchedEvent::Replaced { .. } => "Replaced",
        }
    }
}

impl fmt::Display for SchedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedEvent::Inserted { tick, tid, level } => write!(
                f,
                "Tick {}: Thread {} is inserted into queue {}.",
                tick, tid.0, level
            ),
            SchedEvent::Removed { tick, tid, level } => write!(
                f,
                "Tick {}: Thread {} is removed from queue {}",
                tick, tid.0, level
            ),
            SchedEvent::PriorityChanged { tick, tid, from, to } => write!(
                f,
                "Tick {}: Thread {} changes its priority from {} to {}",
                tick, tid.0, from, to
            ),
            SchedEvent::Selected { tick, tid } => write!(
                f,
                "Tick {}: Thread {} is now selected for execution.",
                tick, tid.0
            ),
            SchedEvent::Replaced {
                tick,
                tid,
                executed_ticks,
            } => write!(
                f,
                "Tick {}: Thread {} is replaced, and it has executed {} ticks.",
                tick, tid.0, executed_ticks
            ),
        }
    }
}

/// Append-only diagnostic/telemetry stream
///
/// The dispatcher owns one sink and pushes every event through it. Sinks
/// must not re-enter the scheduler.
pub trait EventSink: Send {
    fn emit(&mut self, event: SchedEvent);
}

/// Sink that forwards each event through the logging facade
///
/// The default choice for kernel embedders: events end up wherever the
/// kernel routes its log records (serial console, ring buffer, ...).
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: SchedEvent) {
        log::info!("{}", event);
    }
}

/// Sink that collects events into a shared vector
///
/// Cloning yields another handle onto the same storage, so a harness can
/// keep one handle while the dispatcher owns the other and inspect the
/// stream afterwards.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    events: Arc<spin::Mutex<Vec<SchedEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all collected events, leaving the sink empty
    pub fn take(&self) -> Vec<SchedEvent> {
        core::mem::take(&mut *self.events.lock())
    }

    /// Render the collected events in emission order
    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: SchedEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_line_has_trailing_period() {
        let ev = SchedEvent::Inserted {
            tick: 30,
            tid: ThreadId(2),
            level: QueueLevel::L1,
        };
        assert_eq!(ev.to_string(), "Tick 30: Thread 2 is inserted into queue L1.");
    }

    #[test]
    fn removal_line_has_no_trailing_period() {
        let ev = SchedEvent::Removed {
            tick: 1500,
            tid: ThreadId(4),
            level: QueueLevel::L3,
        };
        assert_eq!(ev.to_string(), "Tick 1500: Thread 4 is removed from queue L3");
    }

    #[test]
    fn priority_change_line() {
        let ev = SchedEvent::PriorityChanged {
            tick: 1500,
            tid: ThreadId(4),
            from: Priority(40),
            to: Priority(50),
        };
        assert_eq!(
            ev.to_string(),
            "Tick 1500: Thread 4 changes its priority from 40 to 50"
        );
    }

    #[test]
    fn selection_line() {
        let ev = SchedEvent::Selected {
            tick: 80,
            tid: ThreadId(1),
        };
        assert_eq!(
            ev.to_string(),
            "Tick 80: Thread 1 is now selected for execution."
        );
    }

    #[test]
    fn replacement_line_carries_cumulative_ticks() {
        let ev = SchedEvent::Replaced {
            tick: 200,
            tid: ThreadId(0),
            executed_ticks: 170,
        };
        assert_eq!(
            ev.to_string(),
            "Tick 200: Thread 0 is replaced, and it has executed 170 ticks."
        );
    }

    #[test]
    fn vec_sink_handles_share_storage() {
        let sink = VecSink::new();
        let mut writer = sink.clone();
        writer.emit(SchedEvent::Selected {
            tick: 10,
            tid: ThreadId(1),
        });
        writer.emit(SchedEvent::Selected {
            tick: 20,
            tid: ThreadId(2),
        });
        assert_eq!(sink.len(), 2);
        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert!(sink.is_empty());
    }
}
