use std::sync::Mutex;

use super::{OutboundMessage, Transport, TransportError};

/// Log-only transport. Every send "succeeds"; messages are kept in an
/// in-memory outbox so they can be inspected.
pub struct SimulatedMailer {
    outbox: Mutex<Vec<OutboundMessage>>,
}

impl SimulatedMailer {
    pub fn new() -> Self {
        SimulatedMailer {
            outbox: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for SimulatedMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl Transport for SimulatedMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        log::info!(
            "[mailer] (simulated) to={} from={} subject={:?}\n{}",
            message.to,
            message.from,
            message.subject,
            message.text_body
        );
        self.outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok("simulated".to_string())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
