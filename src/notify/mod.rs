//! One-way "processing complete" signal to the page.

pub mod retry;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use retry::{RetryExhausted, RetryPolicy};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Literal payload the page script listens for.
pub const LOAD_COMPLETE_MESSAGE: &str = "loadComplete";

/// Message channel into the active page. `send` fails while the page is not
/// ready to receive.
#[async_trait]
pub trait PageChannel: Send + Sync + 'static {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Channel for hosts without a page: records the message in the log.
pub struct LogChannel;

#[async_trait]
impl PageChannel for LogChannel {
    async fn send(&self, message: &str) -> Result<()> {
        log::info!("page notification: {message}");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn PageChannel>,
    policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl Notifier {
    pub fn new(channel: Arc<dyn PageChannel>, policy: RetryPolicy) -> Self {
        Self {
            channel,
            policy,
            shutdown: CancellationToken::new(),
        }
    }

    /// Fire-and-forget delivery of [`LOAD_COMPLETE_MESSAGE`]. The handle
    /// resolves to whether the page acknowledged it.
    pub fn notify_load_complete(&self) -> JoinHandle<bool> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.deliver(LOAD_COMPLETE_MESSAGE).await })
    }

    /// Retry `message` under the policy. Never errors: exhaustion is logged
    /// and reported as `false`.
    pub async fn deliver(&self, message: &str) -> bool {
        let channel = Arc::clone(&self.channel);
        let attempts = self.policy.run(|attempt| {
            let channel = Arc::clone(&channel);
            async move {
                log_debug!("delivering '{message}' (attempt {attempt})");
                channel.send(message).await
            }
        });

        tokio::select! {
            result = attempts => match result {
                Ok(()) => {
                    log_info!("page acknowledged '{message}'");
                    true
                }
                Err(err) => {
                    log_warn!("page notification '{message}' not delivered: {err}");
                    false
                }
            },
            _ = self.shutdown.cancelled() => {
                log_info!("notifier shut down before '{message}' was delivered");
                false
            }
        }
    }

    /// Abandon every pending delivery. In-flight interceptions are unaffected.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Page that starts listening after `ready_after` refused sends.
    struct SlowPage {
        ready_after: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl PageChannel for SlowPage {
        async fn send(&self, message: &str) -> Result<()> {
            assert_eq!(message, LOAD_COMPLETE_MESSAGE);
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call > self.ready_after {
                Ok(())
            } else {
                Err(anyhow!("receiving end does not exist"))
            }
        }
    }

    #[tokio::test]
    async fn retries_until_page_is_ready() {
        let page = Arc::new(SlowPage {
            ready_after: 2,
            calls: AtomicU32::new(0),
        });
        let notifier = Notifier::new(page.clone(), RetryPolicy::fixed(5, Duration::from_millis(1)));

        assert!(notifier.notify_load_complete().await.unwrap());
        assert_eq!(page.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_at_the_cap() {
        let page = Arc::new(SlowPage {
            ready_after: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let notifier = Notifier::new(page.clone(), RetryPolicy::fixed(3, Duration::from_millis(1)));

        assert!(!notifier.notify_load_complete().await.unwrap());
        assert_eq!(page.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn shutdown_abandons_pending_delivery() {
        let page = Arc::new(SlowPage {
            ready_after: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let notifier = Notifier::new(page, RetryPolicy::fixed(1_000, Duration::from_secs(1)));

        let handle = notifier.notify_load_complete();
        notifier.shutdown();
        assert!(!handle.await.unwrap());
    }
}
