use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, DataError};

/// Optional cancellation applied to every statement a repository or
/// builder issues.
///
/// Without a token, timeout or deadline, calls run to completion or failure.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: Option<CancellationToken>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Per-statement time limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Absolute deadline shared by every statement.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some() || self.timeout.is_some() || self.deadline.is_some()
    }

    fn effective_deadline(&self) -> Option<Instant> {
        let from_timeout = self.timeout.map(|t| Instant::now() + t);
        match (self.deadline, from_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run `fut`, aborting it with [`DataError::Cancelled`] when the token
    /// fires or the deadline passes. An already-fired token aborts before
    /// `fut` is polled.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, DataError>
    where
        F: Future<Output = Result<T, DataError>>,
    {
        if !self.is_active() {
            return fut.await;
        }
        let deadline = self.effective_deadline();
        let fired = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = fired => Err(DataError::Cancelled(CancelReason::Token)),
            _ = expired => Err(DataError::Cancelled(CancelReason::Deadline)),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inactive_runs_to_completion() {
        let out = Cancellation::none().run(async { Ok::<_, DataError>(7) }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn test_fired_token_aborts_before_polling() {
        let token = CancellationToken::new();
        token.cancel();
        let polled = std::sync::atomic::AtomicBool::new(false);
        let err = Cancellation::none()
            .token(token)
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, DataError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Cancelled(CancelReason::Token)));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_slow_call() {
        let err = Cancellation::none()
            .timeout(Duration::from_millis(50))
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, DataError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Cancelled(CancelReason::Deadline)));
    }
}
