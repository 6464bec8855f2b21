use std::sync::Arc;
use std::time::Duration;

use rocket::tokio;
use uuid::Uuid;

use super::queue::FailureQueue;
use crate::mailer::{OutboundMessage, Transport};

/// What a single requeue cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Simulation mode: the queue was left alone.
    Skipped,
    /// Nothing queued.
    Idle,
    Delivered(Uuid),
    Requeued { id: Uuid, attempts: u32 },
    /// Background budget spent; the item is gone for good.
    Dropped { id: Uuid, attempts: u32 },
}

/// Drains the failure queue one item per cycle. Its own cadence is the
/// backoff, so each cycle makes exactly one send attempt.
pub struct RequeueWorker {
    queue: Arc<FailureQueue>,
    transport: Arc<dyn Transport>,
    from: String,
    max_attempts: u32,
}

impl RequeueWorker {
    pub fn new(
        queue: Arc<FailureQueue>,
        transport: Arc<dyn Transport>,
        from: String,
        max_attempts: u32,
    ) -> Self {
        RequeueWorker {
            queue,
            transport,
            from,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.transport.is_simulated() {
            return CycleOutcome::Skipped;
        }

        let Some(mut item) = self.queue.pop() else {
            return CycleOutcome::Idle;
        };

        if item.attempts >= self.max_attempts {
            log::error!(
                "[queue] dropping {} for {} after {} failed retries (queued {})",
                item.id,
                item.recipient,
                item.attempts,
                item.queued_at.format("%Y-%m-%d %H:%M:%S")
            );
            return CycleOutcome::Dropped {
                id: item.id,
                attempts: item.attempts,
            };
        }

        let message = OutboundMessage::confirmation(
            &self.from,
            &item.recipient,
            &item.display_name,
            &item.code,
        );

        match self.transport.send(&message).await {
            Ok(info) => {
                log::info!(
                    "[queue] redelivered {} to {} after {} failed retries: {}",
                    item.id,
                    item.recipient,
                    item.attempts,
                    info
                );
                CycleOutcome::Delivered(item.id)
            }
            Err(e) => {
                item.attempts += 1;
                if item.attempts >= self.max_attempts {
                    log::error!(
                        "[queue] permanently failed {} for {} after {} retries (queued {}): {}",
                        item.id,
                        item.recipient,
                        item.attempts,
                        item.queued_at.format("%Y-%m-%d %H:%M:%S"),
                        e
                    );
                    CycleOutcome::Dropped {
                        id: item.id,
                        attempts: item.attempts,
                    }
                } else {
                    log::warn!(
                        "[queue] retry {}/{} for {} to {} failed: {}",
                        item.attempts,
                        self.max_attempts,
                        item.id,
                        item.recipient,
                        e
                    );
                    let outcome = CycleOutcome::Requeued {
                        id: item.id,
                        attempts: item.attempts,
                    };
                    self.queue.push(item);
                    outcome
                }
            }
        }
    }

    /// Sleep, run a cycle, repeat. Never returns.
    pub async fn run(self, interval: Duration) {
        loop {
            tokio::time::sleep(interval).await;
            self.run_cycle().await;
        }
    }
}
