/*
 * Three-Tier Feedback Scheduler Core
 *
 * A machine-independent CPU scheduling core for a cooperative kernel:
 * three tiered ready queues with distinct ordering disciplines, time-driven
 * priority aging, a burst-time estimator feeding the top tier, and the
 * dispatch bookkeeping around a context switch, including single-slot
 * deferred destruction of finished threads.
 *
 * The core runs under masked interrupts and uses no locks of its own.
 * Everything machine-dependent (tick source, switch primitive, user-state
 * save/restore) sits behind the traits in `traits`; telemetry flows through
 * the sink in `events`. Hosted test doubles for all three collaborators are
 * included, so the dispatch logic also runs off-target.
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod aging;
pub mod dispatch;
pub mod events;
pub mod queues;
pub mod thread;
pub mod traits;
pub mod types;

pub use aging::AgingPromoter;
pub use dispatch::Dispatcher;
pub use events::{EventSink, LogSink, SchedEvent, VecSink};
pub use queues::ReadyQueueSet;
pub use thread::{Thread, ThreadId, ThreadState};
pub use traits::{Clock, MachineCtx, ManualClock, NoopMachine};
pub use types::{Priority, QueueLevel, SchedFatal};
