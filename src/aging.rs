/*
 * Priority Aging
 *
 * Threads that sit on a ready queue accumulate waiting time. Once a thread
 * has waited at least the aging threshold, the sweep pulls it out of its
 * tier, raises its priority by the aging boost (capped at the priority
 * maximum), stamps a fresh wait baseline, and re-inserts it into whichever
 * tier the new priority selects. Each promotion emits its removal, priority
 * change, and insertion events in that order; the priority change event is
 * skipped when the cap leaves the value unchanged.
 *
 * The sweep walks tiers top down over per-tier snapshots. Promotions only
 * ever move a thread upward, so a thread promoted out of L2 or L3 lands in
 * a tier whose pass has already finished and is not examined twice in one
 * sweep. The running thread is never queued and is never aged.
 */

use alloc::collections::BTreeMap;

use crate::events::{EventSink, SchedEvent};
use crate::queues::ReadyQueueSet;
use crate::thread::{Thread, ThreadId};
use crate::types::{QueueLevel, SchedFatal};

/// The time-driven promotion pass over the ready queues
pub struct AgingPromoter;

impl AgingPromoter {
    /// Waiting time, in ticks, after which a queued thread is promoted
    pub const THRESHOLD_TICKS: u64 = 1500;

    /// Priority increase applied per promotion
    pub const PRIORITY_BOOST: i32 = 10;

    /// Promote every queued thread that has waited at least the threshold
    ///
    /// Driven from the dispatcher on each selection pass, with interrupts
    /// already masked. Fails only on bookkeeping corruption, a queued id
    /// with no thread record or a tier that disagrees with the placement
    /// map.
    pub fn promote(
        now: u64,
        queues: &mut ReadyQueueSet,
        threads: &mut BTreeMap<ThreadId, Thread>,
        events: &mut dyn EventSink,
    ) -> Result<(), SchedFatal> {
        for level in [QueueLevel::L1, QueueLevel::L2, QueueLevel::L3] {
            for tid in queues.snapshot(level) {
                let thread = threads
                    .get_mut(&tid)
                    .ok_or(SchedFatal::UnknownThread(tid))?;
                if now.saturating_sub(thread.ready_since) < Self::THRESHOLD_TICKS {
                    continue;
                }

                let from = queues.remove(tid)?;
                events.emit(SchedEvent::Removed {
                    tick: now,
                    tid,
                    level: from,
                });

                let old = thread.priority;
                thread.priority = old.boosted(Self::PRIORITY_BOOST);
                thread.ready_since = now;
                if thread.priority != old {
                    events.emit(SchedEvent::PriorityChanged {
                        tick: now,
                        tid,
                        from: old,
                        to: thread.priority,
                    });
                }

                let to = queues.insert(thread)?;
                events.emit(SchedEvent::Inserted {
                    tick: now,
                    tid,
                    level: to,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecSink;
    use crate::types::Priority;

    fn setup() -> (ReadyQueueSet, BTreeMap<ThreadId, Thread>, VecSink) {
        (ReadyQueueSet::new(), BTreeMap::new(), VecSink::new())
    }

    fn admit(
        queues: &mut ReadyQueueSet,
        threads: &mut BTreeMap<ThreadId, Thread>,
        id: usize,
        priority: i32,
        ready_since: u64,
    ) {
        let mut t = Thread::new(ThreadId(id), "t", Priority::new(priority));
        t.ready_since = ready_since;
        queues.insert(&t).unwrap();
        threads.insert(t.id, t);
    }

    #[test]
    fn waiting_below_the_threshold_is_not_promoted() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 1, 40, 0);

        AgingPromoter::promote(1499, &mut queues, &mut threads, &mut sink).unwrap();

        assert!(sink.is_empty());
        assert_eq!(threads[&ThreadId(1)].priority, Priority::new(40));
        assert_eq!(queues.level_of(ThreadId(1)), Some(QueueLevel::L3));
    }

    #[test]
    fn waiting_exactly_the_threshold_is_promoted() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 1, 40, 0);

        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(1)].priority, Priority::new(50));
        assert_eq!(threads[&ThreadId(1)].ready_since, 1500);
    }

    #[test]
    fn promotion_across_the_l3_l2_boundary_reclassifies() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 7, 45, 100);

        AgingPromoter::promote(1600, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(queues.level_of(ThreadId(7)), Some(QueueLevel::L2));
        assert_eq!(
            sink.take(),
            [
                SchedEvent::Removed {
                    tick: 1600,
                    tid: ThreadId(7),
                    level: QueueLevel::L3,
                },
                SchedEvent::PriorityChanged {
                    tick: 1600,
                    tid: ThreadId(7),
                    from: Priority::new(45),
                    to: Priority::new(55),
                },
                SchedEvent::Inserted {
                    tick: 1600,
                    tid: ThreadId(7),
                    level: QueueLevel::L2,
                },
            ]
        );
    }

    #[test]
    fn promotion_across_the_l2_l1_boundary_reclassifies() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 2, 95, 0);

        AgingPromoter::promote(2000, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(2)].priority, Priority::new(105));
        assert_eq!(queues.level_of(ThreadId(2)), Some(QueueLevel::L1));
    }

    #[test]
    fn boost_saturates_at_the_priority_maximum() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 3, 145, 0);

        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(3)].priority, Priority::new(149));
        assert_eq!(
            sink.take(),
            [
                SchedEvent::Removed {
                    tick: 1500,
                    tid: ThreadId(3),
                    level: QueueLevel::L1,
                },
                SchedEvent::PriorityChanged {
                    tick: 1500,
                    tid: ThreadId(3),
                    from: Priority::new(145),
                    to: Priority::new(149),
                },
                SchedEvent::Inserted {
                    tick: 1500,
                    tid: ThreadId(3),
                    level: QueueLevel::L1,
                },
            ]
        );
    }

    #[test]
    fn capped_thread_cycles_without_a_priority_change_event() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 4, 149, 0);

        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(4)].priority, Priority::new(149));
        assert_eq!(threads[&ThreadId(4)].ready_since, 1500);
        assert_eq!(
            sink.take(),
            [
                SchedEvent::Removed {
                    tick: 1500,
                    tid: ThreadId(4),
                    level: QueueLevel::L1,
                },
                SchedEvent::Inserted {
                    tick: 1500,
                    tid: ThreadId(4),
                    level: QueueLevel::L1,
                },
            ]
        );
    }

    #[test]
    fn promotion_resets_the_wait_baseline() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 5, 40, 0);

        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();
        assert_eq!(threads[&ThreadId(5)].priority, Priority::new(50));
        assert_eq!(queues.level_of(ThreadId(5)), Some(QueueLevel::L2));

        // The clock restarts at the promotion, so nothing happens short of
        // another full threshold.
        AgingPromoter::promote(2999, &mut queues, &mut threads, &mut sink).unwrap();
        assert_eq!(threads[&ThreadId(5)].priority, Priority::new(50));

        AgingPromoter::promote(3000, &mut queues, &mut threads, &mut sink).unwrap();
        assert_eq!(threads[&ThreadId(5)].priority, Priority::new(60));
        assert_eq!(queues.level_of(ThreadId(5)), Some(QueueLevel::L2));
    }

    #[test]
    fn a_promoted_thread_is_not_examined_twice_in_one_sweep() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 6, 45, 0);

        // 45 -> 55 crosses into L2 after the L2 pass already ran; a second
        // look in the same sweep would have produced 65.
        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(6)].priority, Priority::new(55));
    }

    #[test]
    fn sweep_walks_tiers_top_down() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 1, 10, 0);
        admit(&mut queues, &mut threads, 2, 60, 0);
        admit(&mut queues, &mut threads, 3, 120, 0);

        AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink).unwrap();

        let order: alloc::vec::Vec<ThreadId> = sink
            .take()
            .into_iter()
            .filter_map(|e| match e {
                SchedEvent::Removed { tid, .. } => Some(tid),
                _ => None,
            })
            .collect();
        assert_eq!(order, [ThreadId(3), ThreadId(2), ThreadId(1)]);
    }

    #[test]
    fn unqueued_threads_are_left_alone() {
        let (mut queues, mut threads, mut sink) = setup();
        admit(&mut queues, &mut threads, 1, 40, 0);
        // Registered but running, so not on any queue.
        let mut running = Thread::new(ThreadId(2), "r", Priority::new(40));
        running.ready_since = 0;
        threads.insert(running.id, running);

        AgingPromoter::promote(5000, &mut queues, &mut threads, &mut sink).unwrap();

        assert_eq!(threads[&ThreadId(1)].priority, Priority::new(50));
        assert_eq!(threads[&ThreadId(2)].priority, Priority::new(40));
    }

    #[test]
    fn queued_id_without_a_record_is_fatal() {
        let (mut queues, mut threads, mut sink) = setup();
        let ghost = Thread::new(ThreadId(8), "g", Priority::new(10));
        queues.insert(&ghost).unwrap();

        assert_eq!(
            AgingPromoter::promote(1500, &mut queues, &mut threads, &mut sink),
            Err(SchedFatal::UnknownThread(ThreadId(8)))
        );
    }
}
