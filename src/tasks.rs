use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// A background loop that runs `step` on a fixed period until cancelled.
///
/// Dropping the handle cancels the loop, so a periodic task cannot outlive its owner.
pub struct PeriodicTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl PeriodicTask {
    /// The first step runs immediately, then once every `period`.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut step: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now(), period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => step().await,
                    _ = token.cancelled() => {
                        log_debug!("{name} loop shutting down");
                        break;
                    }
                }
            }
        });

        log_debug!("{name} loop started (every {period:?})");
        Self {
            name,
            handle: Some(handle),
            cancel_token,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancel and wait for the loop to exit.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
