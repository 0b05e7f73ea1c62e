// Sleeper Port (the timer capability)
// All waiting in core goes through this so tests can run on virtual time

use async_trait::async_trait;
use std::time::Duration;

/// Timer interface (allows recording/virtual time in tests)
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer (production)
///
/// Under `#[tokio::test(start_paused = true)]` this follows the paused clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every requested duration, then sleeps on the tokio clock
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn recorded(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }

        /// Recorded durations except those equal to `excluded` (e.g. a deadline)
        pub fn recorded_except(&self, excluded: Duration) -> Vec<Duration> {
            self.recorded()
                .into_iter()
                .filter(|d| *d != excluded)
                .collect()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::RecordingSleeper;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_recording_sleeper_follows_virtual_clock() {
        let sleeper = RecordingSleeper::new();
        let start = tokio::time::Instant::now();

        sleeper.sleep(Duration::from_millis(1500)).await;
        sleeper.sleep(Duration::from_secs(10)).await;

        assert_eq!(start.elapsed(), Duration::from_millis(11_500));
        assert_eq!(
            sleeper.recorded_except(Duration::from_secs(10)),
            vec![Duration::from_millis(1500)]
        );
    }
}
