//! # Timer Service
//!
//! Wall-clock and process CPU time elapsed since the timer was started. The timer is sampled,
//! never mutated, so it can be copied freely into callbacks running on solver threads.

use std::time::{Duration, Instant};

use cpu_time::ProcessTime;

/// Samples elapsed wall-clock and CPU time
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    wall_start: Instant,
    cpu_start: Duration,
}

impl Timer {
    /// Starts the timer. Should be called once at process entry.
    #[must_use]
    pub fn start() -> Self {
        Timer {
            wall_start: Instant::now(),
            cpu_start: cpu_now(),
        }
    }

    /// Wall-clock time elapsed since [`Timer::start`]
    #[must_use]
    pub fn wall_time(&self) -> Duration {
        self.wall_start.elapsed()
    }

    /// CPU time (user and system, all threads) used by the process since [`Timer::start`]
    #[must_use]
    pub fn cpu_time(&self) -> Duration {
        cpu_now().saturating_sub(self.cpu_start)
    }
}

fn cpu_now() -> Duration {
    ProcessTime::try_now()
        .map(|t| t.as_duration())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::Timer;

    #[test]
    fn monotonic() {
        let timer = Timer::start();
        let (w1, c1) = (timer.wall_time(), timer.cpu_time());
        let mut acc = 0u64;
        for i in 0..200_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        assert!(acc > 0);
        let (w2, c2) = (timer.wall_time(), timer.cpu_time());
        assert!(w2 >= w1);
        assert!(c2 >= c1);
    }

    #[test]
    fn copies_share_origin() {
        let timer = Timer::start();
        let copy = timer;
        assert!(copy.wall_time() >= std::time::Duration::ZERO);
        assert!(timer.wall_time() <= copy.wall_time() + std::time::Duration::from_secs(1));
    }
}
