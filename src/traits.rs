/*
 * Collaborator Trait Definitions
 *
 * The scheduling core is machine-independent: everything that touches
 * hardware sits behind the traits in this module. The kernel supplies real
 * implementations backed by the timer, the interrupt controller, and the
 * context-switch primitive; simulations and tests supply manual ones.
 *
 * This separation allows:
 * 1. Running the dispatch logic off-target, hosted, in unit tests
 * 2. Keeping the masked-interrupt precondition an explicit, probeable contract
 * 3. Clear ownership boundaries (the core never touches registers or stacks)
 */

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::thread::ThreadId;

/// Monotonic tick counter
///
/// Ticks originate outside the core, from a hardware timer or simulated
/// time. The core never advances the clock, it only reads it.
pub trait Clock: Send {
    /// Get current tick count
    fn now_ticks(&self) -> u64;
}

/// Machine-dependent kernel services
///
/// The only way the core reaches hardware state.
pub trait MachineCtx: Send {
    /// Whether interrupts are currently masked
    ///
    /// Masked interrupts are the core's sole mutual-exclusion mechanism;
    /// every mutating entry point probes this before touching state.
    fn interrupts_masked(&self) -> bool;

    /// Low-level control transfer from `outgoing` to `incoming`
    ///
    /// Must return with interrupts still masked. With a real switch
    /// primitive the call returns only when `outgoing` is next resumed.
    fn switch_context(&mut self, outgoing: ThreadId, incoming: ThreadId);

    /// Save the user-level register and address-space context of `tid`
    ///
    /// Invoked only for threads that own a user address space.
    fn save_user_state(&mut self, tid: ThreadId);

    /// Restore the user-level register and address-space context of `tid`
    ///
    /// Invoked only for threads that own a user address space.
    fn restore_user_state(&mut self, tid: ThreadId);
}

/// Hand-driven clock
///
/// Cloning yields another handle onto the same counter, so a harness can
/// advance time while the dispatcher reads it.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the counter to an absolute tick
    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Advance the counter by `ticks`
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

/// Machine services for synchronous embedders
///
/// Reports interrupts as always masked and treats switches and user-state
/// transfers as no-ops. Suitable wherever the dispatch loop runs
/// single-threaded and actual context transfer is modeled elsewhere.
#[derive(Debug, Default)]
pub struct NoopMachine;

impl MachineCtx for NoopMachine {
    fn interrupts_masked(&self) -> bool {
        true
    }

    fn switch_context(&mut self, _outgoing: ThreadId, _incoming: ThreadId) {}

    fn save_user_state(&mut self, _tid: ThreadId) {}

    fn restore_user_state(&mut self, _tid: ThreadId) {}
}
