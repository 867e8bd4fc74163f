//! The tick barrier: `blocker(world)` waits on this until every live system
//! has drained its input channel for the current tick.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct State {
    /// How many live systems have drained their channel so far this round.
    done: usize,
    /// Bumped every time a round completes; `blocker` waits for this to
    /// move past the value it observed on entry, so a late-arriving waiter
    /// can't miss a notification that already fired.
    round: u64,
}

/// Shared, per-dispatcher completion tracker.
///
/// Every running system increments [`mark_done`](Self::mark_done) once it
/// has processed a message and found its own channel empty; once that
/// count reaches the live-system count, the round completes and every
/// thread blocked in [`wait_for_drain`](Self::wait_for_drain) wakes up.
pub(crate) struct Barrier {
    live: AtomicUsize,
    state: Mutex<State>,
    cvar: Condvar,
}

impl Barrier {
    pub(crate) fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
            state: Mutex::new(State::default()),
            cvar: Condvar::new(),
        }
    }

    /// Register one more live system participating in the barrier.
    pub(crate) fn add_live(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    /// A system has stopped (error or explicit cancellation); it no longer
    /// counts toward the round, and its departure may itself complete one.
    pub(crate) fn remove_live(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.try_complete();
    }

    /// Record that a system drained its channel after processing a message.
    pub(crate) fn mark_done(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.done += 1;
        }
        self.try_complete();
    }

    fn try_complete(&self) {
        let mut state = self.state.lock().unwrap();
        let live = self.live.load(Ordering::SeqCst);
        if state.done >= live {
            state.done = 0;
            state.round += 1;
            self.cvar.notify_all();
        }
    }

    /// Block until the round in progress when this is called completes.
    /// Returns immediately if there are no live systems to wait on.
    pub(crate) fn wait_for_drain(&self) {
        let mut state = self.state.lock().unwrap();
        if self.live.load(Ordering::SeqCst) == 0 {
            return;
        }
        let start = state.round;
        while state.round == start {
            state = self.cvar.wait(state).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_with_no_live_systems() {
        let barrier = Barrier::new();
        barrier.wait_for_drain();
    }

    #[test]
    fn wait_unblocks_once_every_live_system_marks_done() {
        let barrier = Arc::new(Barrier::new());
        barrier.add_live();
        barrier.add_live();

        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.wait_for_drain())
        };

        thread::sleep(Duration::from_millis(20));
        barrier.mark_done();
        barrier.mark_done();

        waiter.join().unwrap();
    }

    #[test]
    fn removing_the_last_live_system_completes_the_round() {
        let barrier = Barrier::new();
        barrier.add_live();
        barrier.mark_done();
        // Round already complete (done caught up to live before removal).
        barrier.remove_live();
        barrier.wait_for_drain();
    }
}
