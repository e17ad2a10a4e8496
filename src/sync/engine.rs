//! Optimistic, per-key-serialized application of field patches
//!
//! The engine is the write path of the client: it mutates the shared cache
//! synchronously, then commits the change to the remote store, holding the
//! digest's mutation slot across both steps.
//!
//! Settlement never writes back into the cache. On success the optimistic
//! state *is* the committed truth — no refetch, trading a small staleness
//! window against a round-trip per toggle. On failure the error is surfaced
//! and the optimistic write stays: automatic rollback could itself race with
//! a queued mutation for the same digest, so reconciliation belongs to the
//! caller.

use crate::cache::CacheStore;
use crate::core::error::SyncResult;
use crate::core::gateway::InvoiceGateway;
use crate::core::hasher::Digest;
use crate::core::invoice::{InvoicePatch, InvoiceRecord};
use std::sync::Arc;

use super::serializer::MutationSerializer;

/// Applies single-field patches optimistically, one in flight per digest
pub struct OptimisticUpdateEngine {
    store: Arc<CacheStore>,
    serializer: Arc<MutationSerializer>,
    gateway: Arc<dyn InvoiceGateway>,
}

impl OptimisticUpdateEngine {
    pub fn new(store: Arc<CacheStore>, gateway: Arc<dyn InvoiceGateway>) -> Self {
        Self {
            store,
            serializer: Arc::new(MutationSerializer::new()),
            gateway,
        }
    }

    /// The cache this engine writes to
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Apply a single-field patch: cache first, then the remote store
    ///
    /// Steps, in order:
    /// 1. validate the patch (exactly one recognized field),
    /// 2. take the digest's mutation slot (queueing behind any in-flight
    ///    mutation for the same digest),
    /// 3. rewrite the one field in the cache synchronously — a no-op if the
    ///    digest is absent from the snapshot,
    /// 4. issue the remote single-field update and await settlement,
    /// 5. return the server's record (success) or the error (failure); the
    ///    cache is not touched again either way.
    ///
    /// The slot is released on every exit path.
    pub async fn apply(&self, digest: &Digest, patch: InvoicePatch) -> SyncResult<InvoiceRecord> {
        let field = patch.validate()?;

        let token = self.serializer.acquire(digest).await;

        let applied = self.store.patch_record(digest, field);
        if applied {
            tracing::debug!(digest = %digest, field = field.field_name(), "optimistic write applied");
        } else {
            tracing::debug!(digest = %digest, "digest absent from cache, optimistic write skipped");
        }

        let result = self.gateway.update_field(digest, field).await;
        match &result {
            Ok(_) => {
                tracing::debug!(digest = %digest, field = field.field_name(), "field update committed");
            }
            Err(e) => {
                tracing::warn!(
                    digest = %digest,
                    field = field.field_name(),
                    error = %e,
                    "field update failed, optimistic state left in place"
                );
            }
        }

        token.release();
        result
    }

    /// Refetch the full collection and replace the cache with it
    ///
    /// The only path that removes records from the client's view.
    pub async fn refresh(&self) -> SyncResult<usize> {
        let records = self.gateway.fetch_invoices().await?;
        let count = records.len();
        self.store.replace_all(records);
        tracing::info!(count, "invoice cache refreshed");
        Ok(count)
    }
}
