/*
 * Dispatcher
 *
 * The dispatcher is the scheduling context: it owns the thread arena, the
 * three ready queues, the identity of the running thread, the single
 * pending-destruction slot, and the collaborator handles (clock, machine
 * services, event sink). Every scheduling operation is a method on it.
 *
 * Callers drive the state machine from outside, with interrupts masked:
 *
 *   yield:   if let Some(next) = d.find_next_to_run()? {
 *                d.ready_to_run(current)?;
 *                d.run(next, false)?;
 *            }
 *   sleep:   d.mark_blocked(current)?;
 *            let next = ...;            // find_next_to_run until Some
 *            d.run(next, false)?;
 *   finish:  like sleep, with d.run(next, true)?
 *
 * Masked interrupts are the only mutual exclusion; the dispatcher holds no
 * locks and never blocks. Each fallible operation checks its preconditions
 * up front and returns a SchedFatal before mutating anything, so an Err
 * leaves the dispatcher in the state the caller handed it.
 */

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use crate::aging::AgingPromoter;
use crate::events::{EventSink, SchedEvent};
use crate::queues::ReadyQueueSet;
use crate::thread::{Thread, ThreadId, ThreadState};
use crate::traits::{Clock, MachineCtx};
use crate::types::{QueueLevel, SchedFatal};

/// Log a fatal at its detection site before handing it to the caller
fn fail(err: SchedFatal) -> SchedFatal {
    log::error!("{}", err);
    err
}

/// The scheduling context
pub struct Dispatcher {
    /// Every registered thread record, keyed by id
    threads: BTreeMap<ThreadId, Thread>,

    /// The three ready tiers
    queues: ReadyQueueSet,

    /// Thread currently on the CPU, always present in the arena
    current: ThreadId,

    /// Finished thread awaiting destruction, at most one at a time
    pending_destroy: Option<Thread>,

    clock: Box<dyn Clock>,
    machine: Box<dyn MachineCtx>,
    events: Box<dyn EventSink>,
}

impl Dispatcher {
    /// Build a dispatcher around the boot thread
    ///
    /// The boot thread becomes the initial Running `current` without passing
    /// through the queues. Its burst fields keep their constructed values,
    /// so its first replacement accounts from the point of construction.
    ///
    /// # Arguments
    /// - `boot`: the thread already executing when the dispatcher comes up
    /// - `clock`: tick source for timestamps and aging
    /// - `machine`: interrupt probe, switch primitive, user-state transfer
    /// - `events`: sink for the telemetry stream
    pub fn new(
        mut boot: Thread,
        clock: Box<dyn Clock>,
        machine: Box<dyn MachineCtx>,
        events: Box<dyn EventSink>,
    ) -> Self {
        boot.state = ThreadState::Running;
        let current = boot.id;
        log::info!("Dispatcher initialized, boot thread {} running", current);

        let mut threads = BTreeMap::new();
        threads.insert(current, boot);
        Self {
            threads,
            queues: ReadyQueueSet::new(),
            current,
            pending_destroy: None,
            clock,
            machine,
            events,
        }
    }

    fn ensure_masked(&self, op: &'static str) -> Result<(), SchedFatal> {
        if self.machine.interrupts_masked() {
            Ok(())
        } else {
            Err(fail(SchedFatal::InterruptsUnmasked { op }))
        }
    }

    /// Register a thread record in the arena
    ///
    /// The thread is not queued; call [`ready_to_run`](Self::ready_to_run)
    /// once it should become eligible for dispatch.
    pub fn admit(&mut self, thread: Thread) -> Result<(), SchedFatal> {
        self.ensure_masked("admit")?;
        if self.threads.contains_key(&thread.id) {
            return Err(fail(SchedFatal::DuplicateThread(thread.id)));
        }
        log::debug!("Admitted {} at priority {}", thread.id, thread.priority);
        self.threads.insert(thread.id, thread);
        Ok(())
    }

    /// Make a thread eligible for dispatch
    ///
    /// Marks it Ready, stamps its wait baseline with the current tick, and
    /// inserts it into the tier its priority selects, emitting the insertion
    /// event. Used for newly admitted threads, wakeups, and the outgoing
    /// thread of a yield.
    pub fn ready_to_run(&mut self, tid: ThreadId) -> Result<(), SchedFatal> {
        self.ensure_masked("ready_to_run")?;
        let now = self.clock.now_ticks();

        let Some(thread) = self.threads.get_mut(&tid) else {
            return Err(fail(SchedFatal::UnknownThread(tid)));
        };
        log::debug!("Putting {} on the ready list", tid);
        thread.state = ThreadState::Ready;
        thread.ready_since = now;

        let level = self.queues.insert(thread).map_err(fail)?;
        self.events.emit(SchedEvent::Inserted {
            tick: now,
            tid,
            level,
        });
        Ok(())
    }

    /// Pick the thread to dispatch next
    ///
    /// Runs the aging pass first, then takes the head of the highest
    /// non-empty tier. The returned thread has left the queues but is still
    /// Ready; the caller is expected to hand it to [`run`](Self::run).
    /// Returns `Ok(None)` when nothing is ready.
    pub fn find_next_to_run(&mut self) -> Result<Option<ThreadId>, SchedFatal> {
        self.ensure_masked("find_next_to_run")?;
        let now = self.clock.now_ticks();

        AgingPromoter::promote(now, &mut self.queues, &mut self.threads, &mut *self.events)
            .map_err(fail)?;
        Ok(self.queues.select_next())
    }

    /// Dispatch `next` onto the CPU, replacing the current thread
    ///
    /// With `finishing` set, the outgoing thread is done for good: its
    /// record leaves the arena and is parked in the destruction slot, to be
    /// dropped by the next dispatch. Otherwise the outgoing thread keeps the
    /// state its caller gave it (Ready for a yield, Blocked for a sleep).
    ///
    /// Emits the selection event for `next` and the replacement event for
    /// the outgoing thread, carrying its updated cumulative execution total.
    /// The incoming thread's burst prediction is refreshed from the burst
    /// the outgoing thread just completed.
    ///
    /// # Arguments
    /// - `next`: thread to dispatch, as returned by
    ///   [`find_next_to_run`](Self::find_next_to_run)
    /// - `finishing`: whether the outgoing thread is terminating
    pub fn run(&mut self, next: ThreadId, finishing: bool) -> Result<(), SchedFatal> {
        self.ensure_masked("run")?;
        let now = self.clock.now_ticks();
        let outgoing_id = self.current;

        if !self.threads.contains_key(&next) {
            return Err(fail(SchedFatal::UnknownThread(next)));
        }
        if self.queues.contains(next) {
            return Err(fail(SchedFatal::StillQueued(next)));
        }
        if finishing {
            // Two finishes without an intervening dispatch would overwrite
            // the first record before it was reclaimed.
            if let Some(pending) = &self.pending_destroy {
                return Err(fail(SchedFatal::DestructionPending {
                    pending: pending.id,
                    finishing: outgoing_id,
                }));
            }
            if self.queues.contains(outgoing_id) {
                return Err(fail(SchedFatal::StillQueued(outgoing_id)));
            }
        }

        // Whatever the previous dispatch parked is reclaimable now: the CPU
        // left its stack no later than that dispatch's switch.
        if let Some(done) = self.pending_destroy.take() {
            log::debug!("Destroying {}", done.id);
        }

        // Charge the burst that just ended to the outgoing thread.
        let (ran, out_estimate, out_user_space, out_total) = {
            let Some(out) = self.threads.get_mut(&outgoing_id) else {
                return Err(fail(SchedFatal::UnknownThread(outgoing_id)));
            };
            let ran = now.saturating_sub(out.burst_start);
            out.total_exec_ticks += ran;
            (ran, out.burst_estimate, out.has_user_space, out.total_exec_ticks)
        };

        // A finishing record leaves the arena; it is parked in the slot
        // right before control transfers.
        let corpse = if finishing {
            match self.threads.remove(&outgoing_id) {
                Some(mut record) => {
                    record.state = ThreadState::Finished;
                    Some(record)
                }
                None => return Err(fail(SchedFatal::UnknownThread(outgoing_id))),
            }
        } else {
            None
        };

        if out_user_space {
            self.machine.save_user_state(outgoing_id);
        }

        {
            let Some(incoming) = self.threads.get_mut(&next) else {
                return Err(fail(SchedFatal::UnknownThread(next)));
            };
            incoming.state = ThreadState::Running;
            // The incoming thread's prediction blends the burst the outgoing
            // thread just completed with the outgoing thread's own estimate.
            incoming.burst_estimate = (ran as f64 + out_estimate) / 2.0;
            incoming.burst_start = now;
        }
        self.current = next;

        log::debug!("Switching from: {} to: {}", outgoing_id, next);
        self.events.emit(SchedEvent::Selected {
            tick: now,
            tid: next,
        });
        self.events.emit(SchedEvent::Replaced {
            tick: now,
            tid: outgoing_id,
            executed_ticks: out_total,
        });

        self.pending_destroy = corpse;

        self.machine.switch_context(outgoing_id, next);

        // With a real switch primitive, execution reaches this point only
        // when the outgoing thread is resumed. It must come back masked.
        self.ensure_masked("context switch return")?;

        if !finishing && out_user_space {
            self.machine.restore_user_state(outgoing_id);
        }
        Ok(())
    }

    /// Record the external Running -> Blocked transition
    ///
    /// The thread stays in the arena and off the queues until some wakeup
    /// calls [`ready_to_run`](Self::ready_to_run) for it.
    pub fn mark_blocked(&mut self, tid: ThreadId) -> Result<(), SchedFatal> {
        self.ensure_masked("mark_blocked")?;
        let Some(thread) = self.threads.get_mut(&tid) else {
            return Err(fail(SchedFatal::UnknownThread(tid)));
        };
        if self.queues.contains(tid) {
            return Err(fail(SchedFatal::StillQueued(tid)));
        }
        thread.state = ThreadState::Blocked;
        Ok(())
    }

    // ========================================================================
    // READ ACCESSORS - No masking requirement, nothing mutates
    // ========================================================================

    /// Thread currently on the CPU
    pub fn current_thread(&self) -> ThreadId {
        self.current
    }

    /// Registered record for a thread, if any
    pub fn thread(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.get(&tid)
    }

    /// Thread parked for destruction, if any
    pub fn pending_destruction(&self) -> Option<ThreadId> {
        self.pending_destroy.as_ref().map(|t| t.id)
    }

    /// Whether a thread currently sits in a ready queue
    pub fn is_queued(&self, tid: ThreadId) -> bool {
        self.queues.contains(tid)
    }

    /// Total queued threads across all tiers
    pub fn queued_len(&self) -> usize {
        self.queues.len()
    }

    /// Queued threads in one tier
    pub fn level_len(&self, level: QueueLevel) -> usize {
        self.queues.level_len(level)
    }

    /// Dump the per-tier queue contents through the debug log
    pub fn log_queue_contents(&self) {
        for level in [QueueLevel::L1, QueueLevel::L2, QueueLevel::L3] {
            let ids = self.queues.snapshot(level);
            log::debug!("{} ({} queued): {:?}", level, ids.len(), ids);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("current", &self.current)
            .field("threads", &self.threads.len())
            .field("queued", &self.queues.len())
            .field("pending_destroy", &self.pending_destruction())
            .finish_non_exhaustive()
    }
}
