//! Per-digest mutation serialization
//!
//! At most one mutation per digest may be committing to the remote store at a
//! time. Without this guard, two rapid toggles of the same switch race
//! against whichever network response returns first, and the cached value can
//! flicker back to a stale state.
//!
//! The policy is **last-patch-wins with queued application**: a mutation
//! arriving while another is in flight for the same digest queues behind it
//! (it is never dropped) and applies against the post-settlement snapshot.
//! `tokio::sync::Mutex` hands out its lock in FIFO order, so commit order
//! follows issue order. Unrelated digests acquire independently and never
//! block each other.

use crate::core::hasher::Digest;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Holds the slot for one in-flight mutation; dropping it releases the slot
///
/// Release is tied to drop so it happens on every exit path out of a mutation
/// body, including early `?` returns.
pub struct MutationToken {
    id: Uuid,
    digest: Digest,
    _permit: OwnedMutexGuard<()>,
}

impl MutationToken {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Explicitly release the slot (equivalent to dropping the token)
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for MutationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationToken")
            .field("id", &self.id)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Hands out per-digest mutation slots
#[derive(Default)]
pub struct MutationSerializer {
    slots: StdMutex<HashMap<Digest, Arc<AsyncMutex<()>>>>,
}

impl MutationSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the slot of `digest` and take it
    ///
    /// Returns once no other mutation for this digest is in flight. Waiters
    /// are served in arrival order.
    pub async fn acquire(&self, digest: &Digest) -> MutationToken {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop slots nobody holds or waits on; the map otherwise grows
            // with every digest ever mutated.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(digest.clone()).or_default())
        };

        let permit = slot.lock_owned().await;
        let token = MutationToken {
            id: Uuid::new_v4(),
            digest: digest.clone(),
            _permit: permit,
        };
        tracing::debug!(digest = %digest, token = %token.id, "mutation slot acquired");
        token
    }

    /// Whether a mutation for this digest is currently in flight
    pub fn is_busy(&self, digest: &Digest) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(digest) {
            Some(slot) => slot.try_lock().is_err(),
            None => false,
        }
    }

    /// Number of digests with a live slot (held or awaited)
    pub fn slot_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.len()
    }
}
