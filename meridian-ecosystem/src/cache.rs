//! Local result cache.
//!
//! Stores the last successful answer per capability and request key as
//! JSON. Entries past the TTL are stale: the gateway still serves them in
//! offline mode or when the live call fails.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::ports::Capability;

struct Entry {
    stored_at: Instant,
    value: serde_json::Value,
}

/// Cache lookup outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Cached<T> {
    /// Within the TTL
    Fresh(T),
    /// Older than the TTL
    Stale(T),
    Miss,
}

impl<T> Cached<T> {
    /// The value regardless of age
    pub fn any(self) -> Option<T> {
        match self {
            Cached::Fresh(value) | Cached::Stale(value) => Some(value),
            Cached::Miss => None,
        }
    }
}

/// TTL cache keyed by capability and request key.
pub struct AdvisoryCache {
    ttl: Duration,
    entries: RwLock<HashMap<(Capability, String), Entry>>,
}

impl AdvisoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store a successful result.
    pub fn store<T: Serialize>(&self, capability: Capability, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                let entry = Entry {
                    stored_at: Instant::now(),
                    value,
                };
                self.entries.write().insert((capability, key.to_string()), entry);
            },
            Err(err) => debug!(%capability, key, error = %err, "Result not cacheable"),
        }
    }

    /// Look up a result.
    pub fn get<T: DeserializeOwned>(&self, capability: Capability, key: &str) -> Cached<T> {
        let entries = self.entries.read();
        let Some(entry) = entries.get(&(capability, key.to_string())) else {
            return Cached::Miss;
        };

        let value = match serde_json::from_value(entry.value.clone()) {
            Ok(value) => value,
            Err(err) => {
                debug!(%capability, key, error = %err, "Cached result unreadable");
                return Cached::Miss;
            },
        };

        if entry.stored_at.elapsed() <= self.ttl {
            Cached::Fresh(value)
        } else {
            Cached::Stale(value)
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
