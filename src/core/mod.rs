//! Core module containing the data model, error taxonomy and remote contract

pub mod error;
pub mod gateway;
pub mod hasher;
pub mod invoice;

pub use error::{SyncError, SyncResult};
pub use gateway::{InvoiceGateway, InvoiceUpload, UploadMetadata};
pub use hasher::{ContentHasher, Digest, ParseDigestError};
pub use invoice::{ExistenceCheck, FieldPatch, InvoicePatch, InvoiceRecord};
