use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A confirmation email waiting for background redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    pub id: Uuid,
    pub recipient: String,
    pub display_name: String,
    pub code: String,
    /// Failed background cycles so far.
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
}

impl QueuedItem {
    pub fn new(recipient: &str, display_name: &str, code: &str) -> Self {
        QueuedItem {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            display_name: display_name.to_string(),
            code: code.to_string(),
            attempts: 0,
            queued_at: Utc::now(),
        }
    }
}

/// FIFO of undelivered items. Each operation takes the lock once, so an
/// item is never handed out twice or lost between a push and a pop.
#[derive(Default)]
pub struct FailureQueue {
    items: Mutex<VecDeque<QueuedItem>>,
}

impl FailureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn push(&self, item: QueuedItem) {
        self.lock().push_back(item);
    }

    /// Take the oldest item, if any.
    pub fn pop(&self) -> Option<QueuedItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents, oldest first.
    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<QueuedItem> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}
