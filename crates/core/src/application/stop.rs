// Monitor Stop Token

use tokio::sync::watch;

/// Stop signal held by one monitor task
#[derive(Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopToken {
    /// True once stop was requested or the sender is gone
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait for the stop signal (returns immediately if the sender was dropped)
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Stop sender kept in the registry entry
pub struct StopSender {
    tx: watch::Sender<bool>,
}

impl StopSender {
    /// Signal the monitor task to stop ticking
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a stop channel
pub fn stop_channel() -> (StopSender, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopSender { tx }, StopToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_signal() {
        let (tx, mut token) = stop_channel();
        assert!(!token.is_stopped());
        tx.stop();
        assert!(token.is_stopped());
        token.wait().await;
    }

    #[test]
    fn test_wait_pends_until_stopped() {
        let (tx, mut token) = stop_channel();
        let mut wait = tokio_test::task::spawn(async move { token.wait().await });

        tokio_test::assert_pending!(wait.poll());
        tx.stop();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_stop() {
        let (tx, mut token) = stop_channel();
        drop(tx);
        assert!(token.is_stopped());
        token.wait().await;
    }
}
