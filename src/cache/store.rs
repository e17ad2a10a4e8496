//! Shared, subscribable invoice cache
//!
//! The [`CacheStore`] holds the one snapshot of the invoice collection the UI
//! reads. It is the single shared mutable resource of the client, and
//! [`CacheStore::apply_local`] is its only mutation entry point: a transform
//! runs to completion under the write lock, so readers observe either the
//! pre- or post-transform snapshot, never a partial one. Coordination of
//! *which* transforms run (and in what order per digest) is the
//! [`crate::sync::MutationSerializer`]'s job, not the store's.

use crate::cache::events::{CacheEvent, EventEnvelope};
use crate::core::hasher::Digest;
use crate::core::invoice::{FieldPatch, InvoiceRecord};
use indexmap::IndexMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// An ordered view of the invoice collection
///
/// Insertion order is display order. Digests are unique by construction:
/// upserting an existing digest replaces the record in place without moving
/// it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    records: IndexMap<Digest, InvoiceRecord>,
}

impl CacheSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a fetched collection, preserving order
    pub fn from_records(records: Vec<InvoiceRecord>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            snapshot.upsert(record);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by digest
    pub fn get(&self, digest: &Digest) -> Option<&InvoiceRecord> {
        self.records.get(digest)
    }

    /// Mutable lookup, used by transforms inside `apply_local`
    pub fn get_mut(&mut self, digest: &Digest) -> Option<&mut InvoiceRecord> {
        self.records.get_mut(digest)
    }

    /// Display position of a digest, if present
    pub fn position(&self, digest: &Digest) -> Option<usize> {
        self.records.get_index_of(digest)
    }

    /// Insert a record, or replace it in place if the digest is known
    pub fn upsert(&mut self, record: InvoiceRecord) {
        self.records.insert(record.file_hash.clone(), record);
    }

    /// Records in display order
    pub fn records(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.records.values()
    }

    /// Clone out the records in display order
    pub fn to_vec(&self) -> Vec<InvoiceRecord> {
        self.records.values().cloned().collect()
    }
}

/// The shared cache behind a single mutation entry point
///
/// Readers clone the snapshot out; subscribers get a [`CacheEvent`] after
/// every committed transform, before any related network activity settles.
pub struct CacheStore {
    inner: RwLock<CacheSnapshot>,
    events: broadcast::Sender<EventEnvelope>,
}

impl CacheStore {
    /// Create an empty store
    ///
    /// `event_capacity` bounds the broadcast buffer; slow subscribers beyond
    /// it receive `Lagged` on their next recv.
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            inner: RwLock::new(CacheSnapshot::new()),
            events,
        }
    }

    /// The current snapshot
    pub fn read(&self) -> CacheSnapshot {
        // A poisoned lock still holds a coherent snapshot: transforms run to
        // completion before the guard is released.
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to cache change events
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Synchronously mutate the snapshot and notify subscribers
    ///
    /// The transform runs atomically under the write lock and must not
    /// disturb records it does not address. It returns the event announcing
    /// the change, or `None` for a no-op that subscribers need not hear
    /// about. The event is published after the lock is released, so
    /// subscribers reading the store observe the post-transform state.
    pub fn apply_local<F>(&self, transform: F)
    where
        F: FnOnce(&mut CacheSnapshot) -> Option<CacheEvent>,
    {
        let event = {
            let mut snapshot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            transform(&mut snapshot)
        };
        if let Some(event) = event {
            self.publish(event);
        }
    }

    /// Replace the whole collection from a refetch
    ///
    /// This is the only path that removes records from the cache.
    pub fn replace_all(&self, records: Vec<InvoiceRecord>) {
        let count = records.len();
        self.apply_local(move |snapshot| {
            *snapshot = CacheSnapshot::from_records(records);
            Some(CacheEvent::Replaced { count })
        });
    }

    /// Insert or replace a single record
    pub fn upsert(&self, record: InvoiceRecord) {
        self.apply_local(move |snapshot| {
            let digest = record.file_hash.clone();
            snapshot.upsert(record);
            Some(CacheEvent::Upserted { digest })
        });
    }

    /// Rewrite one field of one record; a no-op if the digest is absent
    ///
    /// Returns whether a record was actually patched. Patching an absent
    /// digest is not an error: the cache may have moved on under an in-flight
    /// mutation, and a stray merge by digest is safely ignorable. A skipped
    /// patch publishes no event.
    pub fn patch_record(&self, digest: &Digest, patch: FieldPatch) -> bool {
        let mut applied = false;
        self.apply_local(|snapshot| {
            let record = snapshot.get_mut(digest)?;
            patch.apply_to(record);
            applied = true;
            Some(CacheEvent::Patched {
                digest: digest.clone(),
                field: patch.field_name().to_string(),
            })
        });
        applied
    }

    fn publish(&self, event: CacheEvent) {
        // send() fails only with no subscribers, which is fine
        let _ = self.events.send(EventEnvelope::new(event));
    }
}
