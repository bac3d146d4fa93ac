// Copyright @yucwang 2026

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

struct BarrierState {
    participants: usize,
    arrived: usize,
    generation: u64,
}

/// Counting barrier whose last arriving thread runs a serial step before the
/// others are released. Waiters give up when the shared abort flag is raised;
/// whoever raises it must call `wake_all`.
pub struct PassBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl PassBarrier {
    pub fn new(participants: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState { participants: participants.max(1), arrived: 0, generation: 0 }),
            cvar: Condvar::new(),
        }
    }

    /// Only valid while no thread waits on the barrier.
    pub fn reset(&self, participants: usize) {
        let mut state = self.state.lock();
        state.participants = participants.max(1);
        state.arrived = 0;
        state.generation = state.generation.wrapping_add(1);
    }

    pub fn participants(&self) -> usize {
        self.state.lock().participants
    }

    /// Returns `true` once every participant arrived and `serial` ran, or
    /// `false` if the run was aborted.
    pub fn wait<F: FnOnce()>(&self, abort: &AtomicBool, serial: F) -> bool {
        let mut state = self.state.lock();
        if abort.load(Ordering::Acquire) {
            return false;
        }

        state.arrived += 1;
        if state.arrived == state.participants {
            serial();
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return true;
        }

        let generation = state.generation;
        loop {
            self.cvar.wait(&mut state);
            if state.generation != generation {
                return true;
            }
            if abort.load(Ordering::Acquire) {
                state.arrived -= 1;
                return false;
            }
        }
    }

    pub fn wake_all(&self) {
        // Taking the lock orders the wake-up after any waiter's abort check.
        let _state = self.state.lock();
        self.cvar.notify_all();
    }
}
