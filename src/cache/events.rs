//! Cache change notifications
//!
//! Every committed transform on the [`crate::cache::CacheStore`] is announced
//! on a `tokio::sync::broadcast` channel so UI layers can re-render without
//! polling. Publishing is fire-and-forget: with no subscribers the event is
//! dropped, and a lagging subscriber sees a `Lagged` error on its next recv
//! rather than blocking writers.

use crate::core::hasher::Digest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What changed in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A single field of one record was rewritten
    Patched { digest: Digest, field: String },

    /// A record was inserted or fully replaced
    Upserted { digest: Digest },

    /// The whole snapshot was replaced from a refetch
    Replaced { count: usize },
}

impl CacheEvent {
    /// The digest this event concerns, if it concerns a single record
    pub fn digest(&self) -> Option<&Digest> {
        match self {
            CacheEvent::Patched { digest, .. } | CacheEvent::Upserted { digest } => Some(digest),
            CacheEvent::Replaced { .. } => None,
        }
    }

    /// Get the action name (patched, upserted, replaced)
    pub fn action(&self) -> &'static str {
        match self {
            CacheEvent::Patched { .. } => "patched",
            CacheEvent::Upserted { .. } => "upserted",
            CacheEvent::Replaced { .. } => "replaced",
        }
    }
}

/// Envelope wrapping a cache event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the transform committed
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: CacheEvent,
}

impl EventEnvelope {
    /// Create a new event envelope
    pub fn new(event: CacheEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::ContentHasher;

    #[test]
    fn test_event_serialization_tags_action() {
        let digest = ContentHasher::hash_bytes(b"x");
        let event = CacheEvent::Patched {
            digest: digest.clone(),
            field: "isPaid".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "patched");
        assert_eq!(json["digest"], digest.as_str());
    }

    #[test]
    fn test_event_digest_accessor() {
        let digest = ContentHasher::hash_bytes(b"x");
        assert_eq!(
            CacheEvent::Upserted {
                digest: digest.clone()
            }
            .digest(),
            Some(&digest)
        );
        assert_eq!(CacheEvent::Replaced { count: 3 }.digest(), None);
        assert_eq!(CacheEvent::Replaced { count: 3 }.action(), "replaced");
    }

    #[test]
    fn test_envelope_has_metadata() {
        let envelope = EventEnvelope::new(CacheEvent::Replaced { count: 0 });
        assert!(!envelope.id.is_nil());
        assert!(envelope.timestamp <= Utc::now());
    }
}
