use std::future::Future;
use tokio::sync::watch;

/// Cooperative cancellation signal shared by a set of tasks.
#[derive(Clone)]
pub struct CancellationToken {
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { receiver: rx })
    }

    pub fn from_receiver(receiver: watch::Receiver<bool>) -> Self {
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    pub async fn cancelled(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped: nobody can cancel any more, so treat the
                // owner as gone.
                break;
            }
        }
    }

    /// Runs `fut` to completion unless cancellation arrives first.
    pub async fn run_until_cancelled<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (tx, token) = CancellationToken::new();
        let mut waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        assert!(!token.is_cancelled());
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_cancelled() {
        let (tx, mut token) = CancellationToken::new();
        let done = token.run_until_cancelled(async { 7 }).await;
        assert_eq!(done, Some(7));

        tx.send(true).unwrap();
        let hung = token
            .run_until_cancelled(tokio::time::sleep(Duration::from_secs(3600)))
            .await;
        assert!(hung.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_releases_waiters() {
        let (tx, mut token) = CancellationToken::new();
        let pending = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(pending.is_err());

        drop(tx);
        let released = tokio::time::timeout(Duration::from_secs(1), token.cancelled()).await;
        assert!(released.is_ok());
        assert!(!token.is_cancelled());
    }
}
