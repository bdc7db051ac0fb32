//! Cancellable door timer.
//!
//! The deadline lives in the state machine. Re-arming on a fresh stop moves
//! the deadline forward, which invalidates the previous one; the event loop
//! rebuilds its sleep future from `deadline()` on every iteration, so an
//! invalidated deadline can never fire.

use tokio::time::{Duration, Instant};

/// One-shot re-armable timer.
pub struct Timer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    /// Creates a disarmed timer with a fixed timeout duration.
    pub fn new(duration: Duration) -> Timer {
        Timer {
            duration,
            deadline: None,
        }
    }

    /// Arms the timer, replacing any previous deadline.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.duration);
    }

    /// Disarms the timer.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// The current deadline, `None` while disarmed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disarmed() {
        let timer = Timer::new(Duration::from_millis(10));
        assert!(timer.deadline().is_none());
    }

    #[test]
    fn test_restart_moves_deadline_forward() {
        let mut timer = Timer::new(Duration::from_secs(1));
        timer.start();
        let first = timer.deadline().unwrap();
        timer.start();
        let second = timer.deadline().unwrap();
        assert!(second >= first);
    }

    #[test]
    fn test_cancel_disarms() {
        let mut timer = Timer::new(Duration::from_secs(1));
        timer.start();
        timer.cancel();
        assert!(timer.deadline().is_none());
    }
}
