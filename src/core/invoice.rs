//! Invoice data model and single-field patches
//!
//! Wire shapes follow the remote store's JSON contract: camelCase field names,
//! `fileHash` as the immutable primary identity, and optional business fields
//! (`id` is the human invoice number, not a database id).

use crate::core::error::{SyncError, SyncResult};
use crate::core::hasher::Digest;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single invoice record as held in the cache and on the wire
///
/// `file_hash` is immutable and unique; all other fields are mutable.
/// `file_exists` tells whether the stored binary artifact is present even
/// when the metadata record exists (the "repair upload" case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub file_hash: Digest,

    #[serde(default)]
    pub original_file_name: String,

    /// Business invoice number; may be absent ("unknown" in the UI)
    pub id: Option<String>,

    pub date: Option<NaiveDate>,

    pub amount: Option<f64>,

    #[serde(default)]
    pub is_paid: bool,

    #[serde(default)]
    pub is_reviewed: bool,

    #[serde(default)]
    pub file_exists: bool,
}

impl InvoiceRecord {
    /// Create a bare record for a freshly hashed file
    pub fn new(file_hash: Digest) -> Self {
        Self {
            file_hash,
            original_file_name: String::new(),
            id: None,
            date: None,
            amount: None,
            is_paid: false,
            is_reviewed: false,
            file_exists: false,
        }
    }

    /// The invoice number as shown to users
    pub fn display_number(&self) -> &str {
        self.id.as_deref().unwrap_or("unknown")
    }
}

/// A validated patch touching exactly one mutable field
///
/// The enum makes the "exactly one field" invariant structural: there is no
/// way to express a patch touching zero or two fields with this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPatch {
    Paid(bool),
    Reviewed(bool),
}

impl FieldPatch {
    /// The wire name of the patched field
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldPatch::Paid(_) => "isPaid",
            FieldPatch::Reviewed(_) => "isReviewed",
        }
    }

    /// Rewrite the single matching field on a record, leaving the rest alone
    pub fn apply_to(&self, record: &mut InvoiceRecord) {
        match self {
            FieldPatch::Paid(v) => record.is_paid = *v,
            FieldPatch::Reviewed(v) => record.is_reviewed = *v,
        }
    }

    /// The single-field JSON body for the remote update call
    pub fn to_body(&self) -> serde_json::Value {
        match self {
            FieldPatch::Paid(v) => serde_json::json!({ "isPaid": v }),
            FieldPatch::Reviewed(v) => serde_json::json!({ "isReviewed": v }),
        }
    }
}

/// Wire-shaped patch request, before validation
///
/// Mirrors the remote contract: a payload with zero or more than one of the
/// recognized mutable fields set is a client-side contract violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reviewed: Option<bool>,
}

impl InvoicePatch {
    /// A patch setting only the payment status
    pub fn paid(value: bool) -> Self {
        Self {
            is_paid: Some(value),
            is_reviewed: None,
        }
    }

    /// A patch setting only the review status
    pub fn reviewed(value: bool) -> Self {
        Self {
            is_paid: None,
            is_reviewed: Some(value),
        }
    }

    /// Check that exactly one recognized field is set
    pub fn validate(self) -> SyncResult<FieldPatch> {
        match (self.is_paid, self.is_reviewed) {
            (Some(v), None) => Ok(FieldPatch::Paid(v)),
            (None, Some(v)) => Ok(FieldPatch::Reviewed(v)),
            (None, None) => Err(SyncError::InvalidPatch {
                message: "patch sets no recognized field".to_string(),
            }),
            (Some(_), Some(_)) => Err(SyncError::InvalidPatch {
                message: "patch sets more than one field".to_string(),
            }),
        }
    }
}

/// Result of asking the remote store whether a digest is already known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistenceCheck {
    pub exists: bool,
    pub invoice: Option<InvoiceRecord>,
}

impl ExistenceCheck {
    /// A check reporting that the digest is unknown
    pub fn absent() -> Self {
        Self {
            exists: false,
            invoice: None,
        }
    }

    /// A check reporting a known record
    pub fn found(invoice: InvoiceRecord) -> Self {
        Self {
            exists: true,
            invoice: Some(invoice),
        }
    }
}
