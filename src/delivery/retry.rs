use std::sync::Arc;
use std::time::Duration;

use rocket::tokio;
use thiserror::Error;

use crate::mailer::{OutboundMessage, Transport, TransportError};

/// How many immediate attempts to make and how long to pause between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delays: Vec<Duration>) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            delays,
        }
    }

    /// No pauses between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Vec::new())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pause after the failed attempt at zero-based `attempt`. Past the end of
    /// the schedule the last delay repeats.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.delays.last() {
            Some(last) => self
                .delays
                .get(attempt as usize)
                .copied()
                .unwrap_or(*last),
            None => Duration::ZERO,
        }
    }
}

#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct Exhausted {
    pub attempts: u32,
    #[source]
    pub last_error: TransportError,
}

/// How the sender waits out a backoff delay.
#[rocket::async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Real timer-backed waiting.
pub struct TokioPause;

#[rocket::async_trait]
impl Pause for TokioPause {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Foreground sender: strictly sequential attempts with backoff, until one
/// succeeds or the policy runs out.
pub struct RetrySender {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl RetrySender {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self::with_pause(transport, policy, Arc::new(TokioPause))
    }

    pub fn with_pause(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        pause: Arc<dyn Pause>,
    ) -> Self {
        RetrySender {
            transport,
            policy,
            pause,
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<String, Exhausted> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.transport.send(message).await {
                Ok(info) => {
                    log::info!(
                        "[delivery] sent to {} on attempt {}: {}",
                        message.to,
                        attempt,
                        info
                    );
                    return Ok(info);
                }
                Err(e) => {
                    log::warn!(
                        "[delivery] attempt {}/{} to {} failed: {}",
                        attempt,
                        self.policy.attempts,
                        message.to,
                        e
                    );
                    if attempt >= self.policy.attempts {
                        return Err(Exhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    let delay = self.policy.delay_for(attempt - 1);
                    if !delay.is_zero() {
                        self.pause.pause(delay).await;
                    }
                }
            }
        }
    }
}
