//! Round-robin credential pool with per-key cooldowns.
//!
//! The pool hands out API keys and tracks which ones are cooling down
//! after a rate-limit response. It never retries anything itself; the
//! pipeline controller owns the retry and rotation policy and only
//! reports outcomes back here.
//!
//! The mutex is never held across an await: `acquire` computes how long
//! to sleep under the lock, releases it, sleeps, and re-checks.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use wordreel_common::{Error, Result};

#[derive(Debug)]
struct Slot {
    key: String,
    cooldown_until: Option<Instant>,
    consecutive_failures: u32,
}

impl Slot {
    fn eligible(&self, now: Instant) -> bool {
        match self.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }
}

#[derive(Debug)]
struct Inner {
    slots: Vec<Slot>,
    /// Next slot to try; advances on every successful acquire so load
    /// spreads across keys.
    cursor: usize,
}

impl Inner {
    fn take_eligible(&mut self, now: Instant) -> Option<String> {
        let n = self.slots.len();
        for offset in 0..n {
            let idx = (self.cursor + offset) % n;
            if self.slots[idx].eligible(now) {
                self.cursor = (idx + 1) % n;
                self.slots[idx].cooldown_until = None;
                return Some(self.slots[idx].key.clone());
            }
        }
        None
    }

    fn earliest_cooldown(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|s| s.cooldown_until).min()
    }
}

#[derive(Debug)]
pub struct CredentialPool {
    inner: Mutex<Inner>,
    default_cooldown: Duration,
}

impl CredentialPool {
    /// Build a pool over the configured keys. An empty key list is a
    /// configuration error, not something to discover mid-pipeline.
    pub fn new(keys: Vec<String>, default_cooldown: Duration) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::validation("credential pool requires at least one API key"));
        }

        let slots = keys
            .into_iter()
            .map(|key| Slot {
                key,
                cooldown_until: None,
                consecutive_failures: 0,
            })
            .collect();

        Ok(Self {
            inner: Mutex::new(Inner { slots, cursor: 0 }),
            default_cooldown,
        })
    }

    /// Acquire the next eligible credential, waiting for a cooldown to
    /// expire if every key is cooling down, bounded by `max_wait`.
    pub async fn acquire(&self, max_wait: Duration) -> Result<String> {
        let deadline = Instant::now() + max_wait;

        loop {
            let earliest = {
                let mut inner = self.inner.lock();
                let now = Instant::now();
                if let Some(key) = inner.take_eligible(now) {
                    return Ok(key);
                }
                inner.earliest_cooldown()
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::NoCredentialAvailable);
            }

            // Sleep until the earliest cooldown expires (or the deadline,
            // whichever comes first), then re-check.
            let wake_at = earliest.map_or(deadline, |t| t.min(deadline));
            if wake_at <= now {
                continue;
            }
            tokio::time::sleep_until(wake_at).await;

            if Instant::now() >= deadline {
                let mut inner = self.inner.lock();
                match inner.take_eligible(Instant::now()) {
                    Some(key) => return Ok(key),
                    None => return Err(Error::NoCredentialAvailable),
                }
            }
        }
    }

    /// Put a credential on cooldown after a rate-limit response. Uses the
    /// service's retry-after hint when present, the configured default
    /// otherwise.
    pub fn report_rate_limited(&self, key: &str, retry_after: Option<Duration>) {
        let cooldown = retry_after.unwrap_or(self.default_cooldown);
        let until = Instant::now() + cooldown;

        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.iter_mut().find(|s| s.key == key) {
            slot.cooldown_until = Some(until);
            slot.consecutive_failures += 1;
            tracing::debug!(
                cooldown_secs = cooldown.as_secs(),
                failures = slot.consecutive_failures,
                "credential placed on cooldown"
            );
        }
    }

    /// Reset the failure counter after a successful call.
    pub fn report_success(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.slots.iter_mut().find(|s| s.key == key) {
            slot.consecutive_failures = 0;
        }
    }
}
