use std::{future::Future, time::Duration};

/// Fixed-interval retry without backoff, for handshakes with a peer that
/// may simply not be listening yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: String,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Call `op` with the 1-based attempt number until it succeeds or the
    /// attempt cap is reached. A cap of zero still makes one attempt.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_error = format!("{err:#}");
                    if attempt < attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }

        Err(RetryExhausted {
            attempts,
            last_error,
        })
    }
}
