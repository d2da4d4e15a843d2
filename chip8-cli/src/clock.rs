//! Timer clock and instruction budget.
use std::{
    thread,
    time::{Duration, Instant},
};

use chip8::Hz;

/// Software clock that drives the VM at the timer frequency.
///
/// Each tick the timers are counted down once, and a budget of instructions
/// is executed so that over many ticks the instruction rate matches the CPU
/// frequency. The fraction of an instruction that doesn't fit into a tick is
/// carried over into the next one.
pub struct Clock {
    last: Instant,
    cycle: Duration,
    cpu_frequency: u64,
    timer_frequency: u64,
    /// Instructions owed from previous ticks, scaled by the timer frequency.
    remainder: u64,
    throttle: bool,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    ///
    /// Timer frequency must not be zero.
    pub fn new(cpu_frequency: Hz, timer_frequency: Hz, throttle: bool) -> Self {
        debug_assert!(timer_frequency.0 > 0);

        Self {
            last: Instant::now(),
            cycle: timer_frequency.into(),
            cpu_frequency: cpu_frequency.0,
            timer_frequency: timer_frequency.0,
            remainder: 0,
            throttle,
        }
    }

    /// Number of instructions to execute during the next tick.
    pub fn budget(&mut self) -> u64 {
        let owed = self.remainder + self.cpu_frequency;
        self.remainder = owed % self.timer_frequency;
        owed / self.timer_frequency
    }

    /// Block the current thread until the next clock cycle.
    ///
    /// Does nothing when the clock is not throttled.
    pub fn wait(&mut self) {
        if !self.throttle {
            return;
        }

        loop {
            let elapsed = self.last.elapsed();
            if elapsed < self.cycle {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Start the next cycle from now, rather than trying to catch up.
                self.last = Instant::now();
                return;
            }
        }
    }
}
