//! # invoice-sync
//!
//! A client-side synchronization engine for invoice records held in a remote
//! content-addressed store.
//!
//! ## Features
//!
//! - **Content-Addressed Identity**: invoices are keyed by the SHA-256 digest
//!   of their file bytes; filenames and metadata never affect identity
//! - **Pre-Upload Deduplication**: the remote store is consulted before any
//!   upload, so duplicate files are refused without spending bandwidth
//! - **Repair Uploads**: known metadata with a missing binary artifact is
//!   detected and handed back for form pre-population
//! - **Optimistic Updates**: single-field patches mutate the shared cache
//!   synchronously and commit to the remote store afterwards
//! - **Per-Key Serialization**: at most one mutation per digest is in flight;
//!   later patches queue in issue order (last patch wins, none dropped)
//! - **Subscribable Cache**: every committed transform is broadcast so UI
//!   layers re-render without polling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use invoice_sync::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::default();
//! let store = Arc::new(CacheStore::new(config.event_capacity));
//! let gateway: Arc<dyn InvoiceGateway> = Arc::new(HttpInvoiceGateway::new(&config)?);
//!
//! let engine = OptimisticUpdateEngine::new(store.clone(), gateway.clone());
//! engine.refresh().await?;
//!
//! // Toggle a payment switch: cache first, remote store second.
//! engine.apply(&digest, InvoicePatch::paid(true)).await?;
//!
//! // Gate an upload on the dedup pre-check.
//! let flow = UploadFlow::new(config, gateway, store);
//! let ticket = flow.precheck("invoice.pdf", &bytes).await?;
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod storage;
pub mod sync;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Types ===
    pub use crate::core::{
        error::{SyncError, SyncResult},
        gateway::{InvoiceGateway, InvoiceUpload, UploadMetadata},
        hasher::{ContentHasher, Digest},
        invoice::{ExistenceCheck, FieldPatch, InvoicePatch, InvoiceRecord},
    };

    // === Cache ===
    pub use crate::cache::{CacheEvent, CacheSnapshot, CacheStore, EventEnvelope};

    // === Sync ===
    pub use crate::sync::{
        MutationSerializer, MutationToken, OptimisticUpdateEngine, UploadFlow, UploadTicket,
    };

    // === Storage ===
    pub use crate::storage::{HttpInvoiceGateway, InMemoryInvoiceGateway};

    // === Config ===
    pub use crate::config::ClientConfig;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
