use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Per-key sliding-window record of send attempts.
/// Keys are namespaced by the caller, e.g. "recipient:<address>" or "ip:<ip_hash>".
pub struct AttemptLedger {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl AttemptLedger {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        AttemptLedger {
            entries: Mutex::new(HashMap::new()),
            window,
            clock,
        }
    }

    /// Append the current time to `key`'s attempts.
    pub fn record(&self, key: &str) {
        let now = self.clock.now();
        self.lock().entry(key.to_string()).or_default().push(now);
    }

    /// Drop attempts older than the window and return the ones still live.
    /// The purge sticks: later reads only ever see live entries.
    pub fn purge_expired(&self, key: &str) -> Vec<Instant> {
        let cutoff = self.cutoff();
        let mut map = self.lock();
        let attempts = map.entry(key.to_string()).or_default();
        prune(attempts, cutoff);
        attempts.clone()
    }

    /// Check every key against `max_attempts` and, only if all of them pass,
    /// record an attempt for each. Runs under one lock so concurrent callers
    /// can't both slip in under the limit.
    pub fn record_all_if_under(&self, keys: &[&str], max_attempts: usize) -> bool {
        let now = self.clock.now();
        let cutoff = self.cutoff();
        let mut map = self.lock();

        for key in keys {
            let attempts = map.entry(key.to_string()).or_default();
            prune(attempts, cutoff);
            if attempts.len() >= max_attempts {
                return false;
            }
        }

        for key in keys {
            map.entry(key.to_string()).or_default().push(now);
        }
        true
    }

    /// Forget keys with no live attempts. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let cutoff = self.cutoff();
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, attempts| {
            prune(attempts, cutoff);
            !attempts.is_empty()
        });
        before - map.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn cutoff(&self) -> Option<Instant> {
        // None while the process is younger than the window: nothing can be stale yet
        self.clock.now().checked_sub(self.window)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn prune(attempts: &mut Vec<Instant>, cutoff: Option<Instant>) {
    if let Some(cutoff) = cutoff {
        attempts.retain(|t| *t >= cutoff);
    }
}

/// Admission gate over an [`AttemptLedger`]: a key may send while it has
/// fewer than `max_attempts` live attempts in the window.
pub struct RateLimiter {
    ledger: AttemptLedger,
    max_attempts: usize,
}

impl RateLimiter {
    pub fn new(ledger: AttemptLedger, max_attempts: usize) -> Self {
        RateLimiter {
            ledger,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn can_send(&self, key: &str) -> bool {
        self.ledger.purge_expired(key).len() < self.max_attempts
    }

    /// Check remaining attempts without recording a new one.
    pub fn remaining(&self, key: &str) -> usize {
        self.max_attempts
            .saturating_sub(self.ledger.purge_expired(key).len())
    }

    /// Admit a send only if every key is under the limit, recording the
    /// attempt against all of them at admission time.
    pub fn try_admit(&self, keys: &[&str]) -> bool {
        self.ledger.record_all_if_under(keys, self.max_attempts)
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }
}
