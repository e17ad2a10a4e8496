//! Pre-upload deduplication gate and upload submission
//!
//! Before any upload leaves the client, the file is validated locally, its
//! digest computed, and the remote store asked whether that digest is already
//! known. A duplicate is refused *before* the multipart POST is issued — no
//! bandwidth is spent re-uploading a file the store already has.
//!
//! The existence check also powers the "repair upload" case: when metadata
//! for the digest exists but the binary artifact is missing, the known
//! metadata is handed back so the form can be pre-populated and the upload is
//! allowed to proceed.

use crate::cache::CacheStore;
use crate::config::ClientConfig;
use crate::core::error::{SyncError, SyncResult};
use crate::core::gateway::{InvoiceGateway, InvoiceUpload, UploadMetadata};
use crate::core::hasher::{ContentHasher, Digest};
use crate::core::invoice::InvoiceRecord;
use std::sync::Arc;

/// Outcome of the pre-upload check
#[derive(Debug, Clone, PartialEq)]
pub enum UploadTicket {
    /// The digest is unknown; the upload may proceed
    New { digest: Digest },

    /// Record and file both exist; submitting this ticket is refused locally
    Duplicate { existing: InvoiceRecord },

    /// Metadata exists but the file is missing; uploading repairs the record
    Repair { existing: InvoiceRecord },
}

impl UploadTicket {
    /// The digest this ticket was issued for
    pub fn digest(&self) -> &Digest {
        match self {
            UploadTicket::New { digest } => digest,
            UploadTicket::Duplicate { existing } | UploadTicket::Repair { existing } => {
                &existing.file_hash
            }
        }
    }

    /// The known record, for pre-populating form fields
    pub fn existing(&self) -> Option<&InvoiceRecord> {
        match self {
            UploadTicket::New { .. } => None,
            UploadTicket::Duplicate { existing } | UploadTicket::Repair { existing } => {
                Some(existing)
            }
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, UploadTicket::Duplicate { .. })
    }
}

/// Hash → existence-check → upload pipeline
pub struct UploadFlow {
    config: ClientConfig,
    gateway: Arc<dyn InvoiceGateway>,
    store: Arc<CacheStore>,
}

impl UploadFlow {
    pub fn new(
        config: ClientConfig,
        gateway: Arc<dyn InvoiceGateway>,
        store: Arc<CacheStore>,
    ) -> Self {
        Self {
            config,
            gateway,
            store,
        }
    }

    /// Local validation of the candidate file, before any hashing
    pub fn validate_file(&self, file_name: &str, size: u64) -> SyncResult<()> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        let allowed = extension
            .as_deref()
            .is_some_and(|ext| self.config.allowed_extensions.iter().any(|a| a == ext));
        if !allowed {
            return Err(SyncError::InvalidFile {
                reason: format!(
                    "file type not allowed, allowed types are: {}",
                    self.config.allowed_extensions.join(", ")
                ),
            });
        }

        if size > self.config.max_file_size {
            return Err(SyncError::InvalidFile {
                reason: format!(
                    "file size exceeds the maximum limit of {} bytes",
                    self.config.max_file_size
                ),
            });
        }

        Ok(())
    }

    /// Validate, hash and check the remote store for the digest
    ///
    /// A [`SyncError::Network`] here means "cannot verify" and blocks the
    /// upload; it is never treated as "does not exist".
    pub async fn precheck(&self, file_name: &str, bytes: &[u8]) -> SyncResult<UploadTicket> {
        self.validate_file(file_name, bytes.len() as u64)?;

        let digest = ContentHasher::hash_bytes(bytes);
        let check = self.gateway.check_exists(&digest).await?;

        let ticket = match check.invoice {
            Some(existing) if check.exists && existing.file_exists => {
                tracing::info!(digest = %digest, "duplicate upload detected");
                UploadTicket::Duplicate { existing }
            }
            Some(existing) if check.exists => {
                tracing::info!(digest = %digest, "known metadata with missing file, repair upload");
                UploadTicket::Repair { existing }
            }
            _ => UploadTicket::New { digest },
        };
        Ok(ticket)
    }

    /// Submit an upload for a previously issued ticket
    ///
    /// A duplicate ticket fails with [`SyncError::Conflict`] before the
    /// network call is issued. On success the new record is upserted into the
    /// cache optimistically.
    pub async fn submit(
        &self,
        ticket: &UploadTicket,
        metadata: UploadMetadata,
        file_name: String,
        bytes: Vec<u8>,
    ) -> SyncResult<InvoiceRecord> {
        if ticket.is_duplicate() {
            return Err(SyncError::Conflict {
                digest: ticket.digest().clone(),
            });
        }

        let digest = ticket.digest().clone();
        let upload = InvoiceUpload {
            digest: digest.clone(),
            file_name: file_name.clone(),
            bytes,
            metadata: metadata.clone(),
        };
        self.gateway.upload(upload).await?;

        let record = InvoiceRecord {
            original_file_name: file_name,
            id: metadata.id,
            date: metadata.date,
            amount: metadata.amount,
            is_paid: metadata.is_paid,
            is_reviewed: metadata.is_reviewed,
            file_exists: true,
            ..InvoiceRecord::new(digest.clone())
        };
        self.store.upsert(record.clone());
        tracing::info!(digest = %digest, "invoice uploaded and cached");
        Ok(record)
    }
}
