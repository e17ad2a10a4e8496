//! HTTP implementation of the invoice gateway
//!
//! Talks to the remote store's REST surface:
//!
//! - `GET  /api/v1/invoices` — full collection
//! - `GET  /api/v1/invoice/{digest}/exists` — pre-upload existence check
//! - `PATCH /api/v1/invoice/{digest}/payment-status` — `{ "isPaid": bool }`
//! - `PATCH /api/v1/invoice/{digest}/review-status` — `{ "isReviewed": bool }`
//! - `POST /api/v1/invoice/upload` — multipart form (file + metadata fields)
//!
//! Transport failures surface as [`SyncError::Network`]; non-2xx responses as
//! [`SyncError::Server`] with the body verbatim, except the upload 409 which
//! becomes [`SyncError::Conflict`].

use crate::config::ClientConfig;
use crate::core::error::{SyncError, SyncResult};
use crate::core::gateway::{InvoiceGateway, InvoiceUpload};
use crate::core::hasher::Digest;
use crate::core::invoice::{ExistenceCheck, FieldPatch, InvoiceRecord};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

/// Gateway backed by the remote store's HTTP API
pub struct HttpInvoiceGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInvoiceGateway {
    /// Build a gateway from client configuration
    pub fn new(config: &ClientConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a gateway against a base URL with default settings
    pub fn from_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into a Server error with its body verbatim
    async fn server_error(response: reqwest::Response) -> SyncError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        SyncError::Server { status, body }
    }
}

#[async_trait]
impl InvoiceGateway for HttpInvoiceGateway {
    async fn fetch_invoices(&self) -> SyncResult<Vec<InvoiceRecord>> {
        let response = self.client.get(self.url("/api/v1/invoices")).send().await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn check_exists(&self, digest: &Digest) -> SyncResult<ExistenceCheck> {
        let url = self.url(&format!("/api/v1/invoice/{}/exists", digest));
        tracing::debug!(digest = %digest, "checking digest existence");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_field(&self, digest: &Digest, patch: FieldPatch) -> SyncResult<InvoiceRecord> {
        let sub_path = match patch {
            FieldPatch::Paid(_) => "payment-status",
            FieldPatch::Reviewed(_) => "review-status",
        };
        let url = self.url(&format!("/api/v1/invoice/{}/{}", digest, sub_path));
        tracing::debug!(digest = %digest, field = patch.field_name(), "sending field update");

        let response = self.client.patch(url).json(&patch.to_body()).send().await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn upload(&self, upload: InvoiceUpload) -> SyncResult<()> {
        let file_part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str("application/pdf")?;

        let metadata = upload.metadata;
        let mut form = Form::new()
            .part("invoice", file_part)
            .text("isPaid", if metadata.is_paid { "true" } else { "false" })
            .text(
                "isReviewed",
                if metadata.is_reviewed { "true" } else { "false" },
            );
        if let Some(id) = metadata.id {
            form = form.text("id", id);
        }
        if let Some(date) = metadata.date {
            form = form.text("date", date.format("%Y-%m-%d").to_string());
        }
        if let Some(amount) = metadata.amount {
            form = form.text("amount", amount.to_string());
        }

        tracing::info!(digest = %upload.digest, "uploading invoice file");
        let response = self
            .client
            .post(self.url("/api/v1/invoice/upload"))
            .multipart(form)
            .send()
            .await?;

        match response.status().as_u16() {
            s if (200..300).contains(&s) => Ok(()),
            409 => Err(SyncError::Conflict {
                digest: upload.digest,
            }),
            _ => Err(Self::server_error(response).await),
        }
    }
}
