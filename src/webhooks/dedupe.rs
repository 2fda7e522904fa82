//! Delivery-id deduplication.
//!
//! GitHub can redeliver a webhook with the same `X-GitHub-Delivery` ID (manual
//! redelivery, retry after a timeout). A repeat of a successfully handled
//! delivery within the TTL window is treated as a no-op so subscribers do not
//! receive duplicate notifications.
//!
//! Checking and recording are separate steps: an ID is recorded only once its
//! delivery has been fully processed. A delivery that failed is never marked
//! seen, so the provider's redelivery of it goes through.
//!
//! The cache is in-memory only, which matches the single-process deployment
//! model; a restart forgets seen IDs and a rare post-restart redelivery is
//! delivered again.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::types::DeliveryId;

/// TTL-bounded set of successfully handled delivery IDs.
#[derive(Debug)]
pub struct DeliveryDedupe {
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
}

impl DeliveryDedupe {
    /// Creates a cache with the default 10-minute window.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        DeliveryDedupe {
            seen: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        match self.seen.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic elsewhere; failing open keeps
            // ingestion alive at the cost of a possible duplicate.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Whether this ID was already handled within the TTL window.
    ///
    /// Expired entries are pruned on every call, keeping the map bounded by
    /// the delivery rate within one window.
    pub fn is_duplicate(&self, delivery_id: &DeliveryId) -> bool {
        let now = Utc::now();
        let mut seen = self.lock();
        seen.retain(|_, handled_at| now - *handled_at < self.ttl);
        seen.contains_key(delivery_id.as_str())
    }

    /// Marks an ID as handled. Called only after processing succeeded.
    pub fn record(&self, delivery_id: &DeliveryId) {
        let now = Utc::now();
        self.lock().insert(delivery_id.as_str().to_string(), now);
    }
}

impl Default for DeliveryDedupe {
    fn default() -> Self {
        Self::new()
    }
}
