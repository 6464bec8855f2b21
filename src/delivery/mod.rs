pub mod queue;
pub mod retry;
pub mod worker;

use std::sync::Arc;

use serde::Deserialize;

use crate::config::Settings;
use crate::mailer::{OutboundMessage, Transport};
use crate::rate_limit::{AttemptLedger, RateLimiter};

use queue::{FailureQueue, QueuedItem};
use retry::{RetryPolicy, RetrySender};
use worker::RequeueWorker;

/// Inbound payload. Fields are optional so a missing one is a rejection,
/// not a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub recipient: Option<String>,
    pub display_name: Option<String>,
    pub code: Option<String>,
}

impl DeliveryRequest {
    pub fn new(recipient: &str, display_name: &str, code: &str) -> Self {
        DeliveryRequest {
            recipient: Some(recipient.to_string()),
            display_name: Some(display_name.to_string()),
            code: Some(code.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingField,
    RateLimited,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::MissingField => "Missing recipient, displayName or code",
            Rejection::RateLimited => "Too many requests. Try later.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered { simulated: bool },
    /// Foreground attempts failed; the background worker owns it now.
    Queued,
    Rejected(Rejection),
}

/// Entry point for a send-code request: validate, rate limit, send with
/// retries, and fall back to the failure queue.
pub struct DeliveryService {
    limiter: RateLimiter,
    transport: Arc<dyn Transport>,
    sender: RetrySender,
    queue: Arc<FailureQueue>,
    from: String,
    background_attempts: u32,
}

impl DeliveryService {
    pub fn new(
        limiter: RateLimiter,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        from: String,
        background_attempts: u32,
    ) -> Self {
        DeliveryService {
            limiter,
            sender: RetrySender::new(Arc::clone(&transport), policy),
            transport,
            queue: Arc::new(FailureQueue::new()),
            from,
            background_attempts,
        }
    }

    pub fn from_settings(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        let delivery = &settings.delivery;
        let limiter = RateLimiter::new(
            AttemptLedger::new(delivery.rate_window()),
            delivery.rate_max_attempts,
        );
        let policy = RetryPolicy::new(delivery.foreground_attempts, delivery.backoff());
        Self::new(
            limiter,
            transport,
            policy,
            settings.mailer.sender(),
            delivery.background_attempts,
        )
    }

    /// `caller` identifies the requesting client (already hashed by the route).
    pub async fn handle(&self, request: &DeliveryRequest, caller: &str) -> Outcome {
        let (Some(recipient), Some(display_name), Some(code)) = (
            required(&request.recipient),
            required(&request.display_name),
            required(&request.code),
        ) else {
            return Outcome::Rejected(Rejection::MissingField);
        };

        let message = OutboundMessage::confirmation(&self.from, recipient, display_name, code);

        if self.transport.is_simulated() {
            if let Err(e) = self.transport.send(&message).await {
                log::warn!("[delivery] simulated send to {} reported: {}", recipient, e);
            }
            return Outcome::Delivered { simulated: true };
        }

        let recipient_key = format!("recipient:{}", recipient.to_lowercase());
        let caller_key = format!("ip:{}", caller);
        let keys = [recipient_key.as_str(), caller_key.as_str()];
        if !self.limiter.try_admit(&keys) {
            let blocked: Vec<&str> = keys
                .iter()
                .copied()
                .filter(|key| !self.limiter.can_send(key))
                .collect();
            log::warn!("[delivery] rate limited {} on {}", recipient, blocked.join(", "));
            return Outcome::Rejected(Rejection::RateLimited);
        }

        match self.sender.send(&message).await {
            Ok(_) => Outcome::Delivered { simulated: false },
            Err(e) => {
                log::warn!("[delivery] queueing {} for background retry: {}", recipient, e);
                self.queue.push(QueuedItem::new(recipient, display_name, code));
                Outcome::Queued
            }
        }
    }

    /// A worker draining this service's failure queue through the same transport.
    pub fn requeue_worker(&self) -> RequeueWorker {
        RequeueWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.transport),
            self.from.clone(),
            self.background_attempts,
        )
    }

    pub fn queue(&self) -> &FailureQueue {
        &self.queue
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn is_simulated(&self) -> bool {
        self.transport.is_simulated()
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
