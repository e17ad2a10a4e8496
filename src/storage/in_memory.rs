//! In-memory implementation of InvoiceGateway for testing and development
//!
//! Behaves like the remote store (existence checks, upsert-on-update, 409 on
//! duplicate upload) and records enough about the calls it serves to let
//! tests assert ordering and concurrency properties: commit order per digest,
//! overlapping commits on the same digest, peak concurrency across digests.

use crate::core::error::{SyncError, SyncResult};
use crate::core::gateway::{InvoiceGateway, InvoiceUpload};
use crate::core::hasher::Digest;
use crate::core::invoice::{ExistenceCheck, FieldPatch, InvoiceRecord};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// In-memory invoice gateway
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceGateway {
    invoices: Arc<RwLock<IndexMap<Digest, InvoiceRecord>>>,
    update_log: Arc<Mutex<Vec<(Digest, FieldPatch)>>>,
    upload_log: Arc<Mutex<Vec<Digest>>>,
    update_delay: Arc<Mutex<Option<Duration>>>,
    fail_next_update: Arc<AtomicBool>,
    fail_next_check: Arc<AtomicBool>,
    in_flight: Arc<Mutex<FlightTracker>>,
    overlap_detected: Arc<AtomicBool>,
}

/// Tracks concurrent update_field calls, per digest and overall
#[derive(Default)]
struct FlightTracker {
    per_digest: HashMap<Digest, usize>,
    total: usize,
    peak_total: usize,
}

impl InMemoryInvoiceGateway {
    /// Create an empty in-memory gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway pre-populated with invoices
    pub fn with_invoices(records: Vec<InvoiceRecord>) -> Self {
        let gateway = Self::new();
        for record in records {
            gateway.seed(record);
        }
        gateway
    }

    /// Insert or replace a record directly, bypassing the upload path
    pub fn seed(&self, record: InvoiceRecord) {
        let mut invoices = self
            .invoices
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        invoices.insert(record.file_hash.clone(), record);
    }

    /// Artificial latency for update calls, to let tests overlap mutations
    pub fn set_update_delay(&self, delay: Duration) {
        *self
            .update_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Make the next update call fail with a 500 Server error
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    /// Make the next existence check fail with a Network error
    pub fn fail_next_check(&self) {
        self.fail_next_check.store(true, Ordering::SeqCst);
    }

    /// Number of update calls served (including failed ones)
    pub fn update_count(&self) -> usize {
        self.update_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The served update calls, in commit order
    pub fn update_log(&self) -> Vec<(Digest, FieldPatch)> {
        self.update_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of upload calls served
    pub fn upload_count(&self) -> usize {
        self.upload_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether two update calls for the same digest ever overlapped
    pub fn overlap_detected(&self) -> bool {
        self.overlap_detected.load(Ordering::SeqCst)
    }

    /// Highest number of update calls in flight at once, across all digests
    pub fn peak_concurrency(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peak_total
    }

    fn enter_flight(&self, digest: &Digest) {
        let mut tracker = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let per_key = tracker.per_digest.entry(digest.clone()).or_insert(0);
        *per_key += 1;
        if *per_key > 1 {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        tracker.total += 1;
        tracker.peak_total = tracker.peak_total.max(tracker.total);
    }

    fn leave_flight(&self, digest: &Digest) {
        let mut tracker = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(per_key) = tracker.per_digest.get_mut(digest) {
            *per_key = per_key.saturating_sub(1);
        }
        tracker.total = tracker.total.saturating_sub(1);
    }
}

#[async_trait]
impl InvoiceGateway for InMemoryInvoiceGateway {
    async fn fetch_invoices(&self) -> SyncResult<Vec<InvoiceRecord>> {
        let invoices = self.invoices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(invoices.values().cloned().collect())
    }

    async fn check_exists(&self, digest: &Digest) -> SyncResult<ExistenceCheck> {
        if self.fail_next_check.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Network {
                message: "connection refused".to_string(),
            });
        }
        let invoices = self.invoices.read().unwrap_or_else(PoisonError::into_inner);
        Ok(match invoices.get(digest) {
            Some(record) => ExistenceCheck::found(record.clone()),
            None => ExistenceCheck::absent(),
        })
    }

    async fn update_field(&self, digest: &Digest, patch: FieldPatch) -> SyncResult<InvoiceRecord> {
        self.enter_flight(digest);

        let delay = *self
            .update_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.fail_next_update.swap(false, Ordering::SeqCst) {
            Err(SyncError::Server {
                status: 500,
                body: "injected failure".to_string(),
            })
        } else {
            self.update_log
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((digest.clone(), patch));

            // Upsert semantics: an unknown digest gets a bare record, the
            // same way the store treats updates as metadata upserts.
            let mut invoices = self
                .invoices
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let record = invoices
                .entry(digest.clone())
                .or_insert_with(|| InvoiceRecord::new(digest.clone()));
            patch.apply_to(record);
            Ok(record.clone())
        };

        self.leave_flight(digest);
        result
    }

    async fn upload(&self, upload: InvoiceUpload) -> SyncResult<()> {
        {
            let invoices = self.invoices.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = invoices.get(&upload.digest) {
                if existing.file_exists {
                    return Err(SyncError::Conflict {
                        digest: upload.digest,
                    });
                }
            }
        }

        self.upload_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(upload.digest.clone());

        let metadata = upload.metadata;
        let record = InvoiceRecord {
            original_file_name: upload.file_name,
            id: metadata.id,
            date: metadata.date,
            amount: metadata.amount,
            is_paid: metadata.is_paid,
            is_reviewed: metadata.is_reviewed,
            file_exists: true,
            ..InvoiceRecord::new(upload.digest)
        };
        self.seed(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gateway::UploadMetadata;
    use crate::core::hasher::ContentHasher;

    fn upload_for(bytes: &[u8]) -> InvoiceUpload {
        InvoiceUpload {
            digest: ContentHasher::hash_bytes(bytes),
            file_name: "invoice.pdf".to_string(),
            bytes: bytes.to_vec(),
            metadata: UploadMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_check_exists_reflects_seeded_records() {
        let gateway = InMemoryInvoiceGateway::new();
        let digest = ContentHasher::hash_bytes(b"a");

        let check = gateway.check_exists(&digest).await.unwrap();
        assert!(!check.exists);
        assert!(check.invoice.is_none());

        gateway.seed(InvoiceRecord::new(digest.clone()));
        let check = gateway.check_exists(&digest).await.unwrap();
        assert!(check.exists);
        assert_eq!(check.invoice.unwrap().file_hash, digest);
    }

    #[tokio::test]
    async fn test_update_applies_single_field_and_logs() {
        let gateway = InMemoryInvoiceGateway::with_invoices(vec![InvoiceRecord::new(
            ContentHasher::hash_bytes(b"a"),
        )]);
        let digest = ContentHasher::hash_bytes(b"a");

        let updated = gateway
            .update_field(&digest, FieldPatch::Paid(true))
            .await
            .unwrap();
        assert!(updated.is_paid);
        assert!(!updated.is_reviewed);
        assert_eq!(gateway.update_log(), vec![(digest, FieldPatch::Paid(true))]);
    }

    #[tokio::test]
    async fn test_injected_failure_fails_once() {
        let gateway = InMemoryInvoiceGateway::new();
        let digest = ContentHasher::hash_bytes(b"a");
        gateway.fail_next_update();

        let err = gateway
            .update_field(&digest, FieldPatch::Paid(true))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "SERVER_ERROR");

        // The failure is one-shot.
        assert!(
            gateway
                .update_field(&digest, FieldPatch::Paid(true))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_injected_check_failure_fails_once() {
        let gateway = InMemoryInvoiceGateway::new();
        let digest = ContentHasher::hash_bytes(b"a");
        gateway.fail_next_check();

        let err = gateway.check_exists(&digest).await.unwrap_err();
        assert_eq!(err.error_code(), "NETWORK_ERROR");

        // The failure is one-shot.
        assert!(gateway.check_exists(&digest).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_upload_conflicts() {
        let gateway = InMemoryInvoiceGateway::new();
        gateway.upload(upload_for(b"a")).await.unwrap();

        let err = gateway.upload(upload_for(b"a")).await.unwrap_err();
        assert_eq!(err.error_code(), "INVOICE_ALREADY_EXISTS");
        assert_eq!(gateway.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_repair_upload_is_accepted() {
        let gateway = InMemoryInvoiceGateway::new();
        let digest = ContentHasher::hash_bytes(b"a");
        gateway.seed(InvoiceRecord {
            file_exists: false,
            ..InvoiceRecord::new(digest.clone())
        });

        gateway.upload(upload_for(b"a")).await.unwrap();
        let check = gateway.check_exists(&digest).await.unwrap();
        assert!(check.invoice.unwrap().file_exists);
    }
}
