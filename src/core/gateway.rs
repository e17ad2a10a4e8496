//! Gateway trait for the remote invoice store
//!
//! The client is agnostic to the transport: the HTTP implementation lives in
//! [`crate::storage::http`], and an in-memory implementation for testing and
//! development lives in [`crate::storage::in_memory`].

use crate::core::error::SyncResult;
use crate::core::hasher::Digest;
use crate::core::invoice::{ExistenceCheck, FieldPatch, InvoiceRecord};
use async_trait::async_trait;
use chrono::NaiveDate;

/// User-entered metadata accompanying an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadMetadata {
    /// Business invoice number
    pub id: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub is_paid: bool,
    pub is_reviewed: bool,
}

/// A complete upload request: file bytes plus metadata
///
/// The digest is computed by the caller during the pre-upload check and
/// travels with the request so conflict errors can name the colliding key.
#[derive(Debug, Clone)]
pub struct InvoiceUpload {
    pub digest: Digest,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub metadata: UploadMetadata,
}

/// Remote store contract consumed by the sync engine and the upload flow
///
/// `check_exists` is idempotent and side-effect-free. `update_field` carries
/// a single-field payload; the store is never asked to change more than one
/// mutable field per request.
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    /// Fetch the full invoice collection
    async fn fetch_invoices(&self) -> SyncResult<Vec<InvoiceRecord>>;

    /// Ask whether a record with this digest already exists
    async fn check_exists(&self, digest: &Digest) -> SyncResult<ExistenceCheck>;

    /// Apply a single-field update and return the updated record
    async fn update_field(&self, digest: &Digest, patch: FieldPatch) -> SyncResult<InvoiceRecord>;

    /// Upload a new invoice file with its metadata
    async fn upload(&self, upload: InvoiceUpload) -> SyncResult<()>;
}
