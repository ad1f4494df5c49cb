/*
 * Tiered Ready Queues
 *
 * This module implements the three-tier ready-queue structure:
 *
 * - L1 (priority >= 100): ordered ascending by burst estimate, so the
 *   thread with the shortest predicted burst is served first
 * - L2 (priority 50..=99): ordered descending by priority
 * - L3 (priority < 50): strict FIFO
 *
 * Selection is strict-priority across tiers: L1 drains before L2 is
 * considered, L2 before L3.
 *
 * The ordered tiers are backed by BTreeSets keyed by (ordering key,
 * insertion sequence, thread id). The monotone insertion sequence makes
 * every key unique and breaks ordering ties by arrival order. A placement
 * map records where each queued thread sits together with the exact key
 * needed to delete it, so the aging sweep can remove threads from the
 * middle of a tier without scanning and without holding references into
 * the containers.
 */

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::cmp::{Ordering, Reverse};

use crate::thread::{Thread, ThreadId};
use crate::types::{Priority, QueueLevel, SchedFatal};

/// Burst estimate with a total order, usable as a tree key
#[derive(Debug, Clone, Copy, PartialEq)]
struct BurstKey(f64);

impl Eq for BurstKey {}

impl PartialOrd for BurstKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BurstKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Where a queued thread currently sits, with the key needed to delete it
#[derive(Debug, Clone, Copy)]
enum Placement {
    L1 { burst: BurstKey, seq: u64 },
    L2 { priority: Priority, seq: u64 },
    L3,
}

impl Placement {
    fn level(&self) -> QueueLevel {
        match self {
            Placement::L1 { .. } => QueueLevel::L1,
            Placement::L2 { .. } => QueueLevel::L2,
            Placement::L3 => QueueLevel::L3,
        }
    }
}

/// The three tiered ready queues
///
/// A thread is a member of at most one tier at a time, tracked through the
/// placement map. Insertion classifies by the thread's current priority;
/// callers update priority and timestamps before inserting.
#[derive(Debug, Default)]
pub struct ReadyQueueSet {
    /// Top tier, shortest predicted burst first
    l1: BTreeSet<(BurstKey, u64, ThreadId)>,

    /// Middle tier, highest priority first
    l2: BTreeSet<(Reverse<Priority>, u64, ThreadId)>,

    /// Bottom tier, first-in first-out
    l3: VecDeque<ThreadId>,

    /// Current placement per queued thread
    members: BTreeMap<ThreadId, Placement>,

    /// Monotone insertion counter, breaks ordering ties by arrival
    next_seq: u64,
}

impl ReadyQueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a thread into the tier its current priority selects
    ///
    /// Reports the tier chosen so the caller can emit the insertion event.
    /// The thread must not already be queued anywhere.
    pub fn insert(&mut self, thread: &Thread) -> Result<QueueLevel, SchedFatal> {
        if self.members.contains_key(&thread.id) {
            return Err(SchedFatal::AlreadyQueued(thread.id));
        }

        let level = QueueLevel::for_priority(thread.priority);
        let seq = self.next_seq;
        self.next_seq += 1;

        match level {
            QueueLevel::L1 => {
                let burst = BurstKey(thread.burst_estimate);
                self.l1.insert((burst, seq, thread.id));
                self.members.insert(thread.id, Placement::L1 { burst, seq });
            }
            QueueLevel::L2 => {
                self.l2.insert((Reverse(thread.priority), seq, thread.id));
                self.members.insert(
                    thread.id,
                    Placement::L2 {
                        priority: thread.priority,
                        seq,
                    },
                );
            }
            QueueLevel::L3 => {
                self.l3.push_back(thread.id);
                self.members.insert(thread.id, Placement::L3);
            }
        }

        Ok(level)
    }

    /// Remove a thread from whichever tier currently holds it
    ///
    /// Reports the tier it was in so the caller can emit the removal event.
    /// The thread must be queued; a miss means the placement map and the
    /// containers disagree, which is corruption.
    pub fn remove(&mut self, tid: ThreadId) -> Result<QueueLevel, SchedFatal> {
        let placement = self
            .members
            .remove(&tid)
            .ok_or(SchedFatal::NotQueued(tid))?;

        let present = match placement {
            Placement::L1 { burst, seq } => self.l1.remove(&(burst, seq, tid)),
            Placement::L2 { priority, seq } => self.l2.remove(&(Reverse(priority), seq, tid)),
            Placement::L3 => match self.l3.iter().position(|&t| t == tid) {
                Some(idx) => {
                    self.l3.remove(idx);
                    true
                }
                None => false,
            },
        };

        if !present {
            return Err(SchedFatal::NotQueued(tid));
        }
        Ok(placement.level())
    }

    /// Take the next thread to run, strict priority across tiers
    ///
    /// L1's head is the smallest burst estimate, L2's the largest priority,
    /// L3's the oldest arrival. Returns None when all tiers are empty.
    pub fn select_next(&mut self) -> Option<ThreadId> {
        if let Some((_, _, tid)) = self.l1.pop_first() {
            self.members.remove(&tid);
            return Some(tid);
        }
        if let Some((_, _, tid)) = self.l2.pop_first() {
            self.members.remove(&tid);
            return Some(tid);
        }
        if let Some(tid) = self.l3.pop_front() {
            self.members.remove(&tid);
            return Some(tid);
        }
        None
    }

    /// Whether a thread is currently queued in any tier
    pub fn contains(&self, tid: ThreadId) -> bool {
        self.members.contains_key(&tid)
    }

    /// Tier currently holding a thread, if any
    pub fn level_of(&self, tid: ThreadId) -> Option<QueueLevel> {
        self.members.get(&tid).map(|p| p.level())
    }

    /// Total queued threads across all tiers
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Queued threads in one tier
    pub fn level_len(&self, level: QueueLevel) -> usize {
        match level {
            QueueLevel::L1 => self.l1.len(),
            QueueLevel::L2 => self.l2.len(),
            QueueLevel::L3 => self.l3.len(),
        }
    }

    /// Membership of one tier, in queue order
    ///
    /// The aging sweep iterates over this snapshot rather than the live
    /// containers, so promotions during the sweep cannot invalidate it.
    pub fn snapshot(&self, level: QueueLevel) -> Vec<ThreadId> {
        match level {
            QueueLevel::L1 => self.l1.iter().map(|&(_, _, tid)| tid).collect(),
            QueueLevel::L2 => self.l2.iter().map(|&(_, _, tid)| tid).collect(),
            QueueLevel::L3 => self.l3.iter().copied().collect(),
        }
    }
}
