//! Document backend client
//!
//! [`ApiClient`] wraps the backend's HTTP surface:
//!
//! - `POST /api/v1/upload` - multipart PDF upload, returns a document id
//! - `POST /api/v1/chat` - question about an uploaded document
//! - `GET /` - health check, also available without a client via [`check_health`]
//!
//! Upload and chat need a bearer token, which is taken from the
//! [`AuthGateway`] at call time. Without a session they fail with
//! `PdfChatError::AuthRequired` before any request is built. Each call is a
//! single attempt; there is no retry and no caching.

pub mod error_body;
pub mod fake;
pub mod types;

pub use error_body::extract_error_message;
pub use fake::FakeDocumentApi;
pub use types::{Answer, DocumentId, UploadFile, UploadReceipt};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthGateway;
use crate::config::ApiConfig;
use crate::error::{PdfChatError, Result};
use types::{ChatRequestWire, ChatResponseWire, HealthWire, UploadResponseWire};

/// Backend operations the controllers depend on
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Upload a PDF for ingestion
    ///
    /// # Errors
    ///
    /// - `PdfChatError::AuthRequired` without a session (no request is made)
    /// - `PdfChatError::Upload` on a non-success status
    /// - `PdfChatError::InvalidResponse` when the body has no usable id
    /// - `PdfChatError::Network` when the backend cannot be reached
    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt>;

    /// Ask a question about an uploaded document
    ///
    /// # Errors
    ///
    /// Same contract as [`upload_document`](Self::upload_document), with
    /// `PdfChatError::Chat` for non-success statuses.
    async fn ask_question(&self, document_id: &DocumentId, question: &str) -> Result<Answer>;
}

/// HTTP implementation of [`DocumentApi`]
///
/// # Examples
///
/// ```no_run
/// use pdfchat::api::{ApiClient, DocumentApi, UploadFile};
/// use pdfchat::auth::FakeAuthGateway;
/// use pdfchat::config::ApiConfig;
/// use std::sync::Arc;
///
/// # async fn example() -> pdfchat::error::Result<()> {
/// let auth = Arc::new(FakeAuthGateway::new());
/// let api = ApiClient::new(&ApiConfig::default(), auth)?;
/// let file = UploadFile::from_path(std::path::Path::new("report.pdf")).await?;
/// let receipt = api.upload_document(file).await?;
/// let answer = api.ask_question(&receipt.document_id, "Summarize it").await?;
/// println!("{}", answer.text);
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Arc<dyn AuthGateway>,
}

impl ApiClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, auth: Arc<dyn AuthGateway>) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Check that the backend answers `GET /` with `{"status": "ok"}`
    pub async fn health(&self) -> Result<()> {
        get_health(&self.client, &self.base_url).await
    }

    async fn bearer_token(&self, purpose: &str) -> Result<String> {
        match self.auth.session().await? {
            Some(session) => Ok(session.access_token),
            None => Err(PdfChatError::AuthRequired(format!(
                "You must be logged in to {}.",
                purpose
            ))
            .into()),
        }
    }
}

#[async_trait]
impl DocumentApi for ApiClient {
    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt> {
        let token = self.bearer_token("upload files").await?;

        let url = format!("{}/api/v1/upload", self.base_url);
        tracing::info!(file = %file.file_name, size = file.bytes.len(), "Uploading document");

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str("application/pdf")
            .map_err(PdfChatError::Http)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = extract_error_message(status, &body);
            tracing::warn!(status = %status, message = %message, "Upload rejected");
            return Err(PdfChatError::Upload { message }.into());
        }

        let wire: UploadResponseWire = serde_json::from_str(&body).map_err(|e| {
            PdfChatError::InvalidResponse(format!("Malformed upload response: {}", e))
        })?;
        let receipt = wire.into_receipt()?;
        tracing::info!(document_id = %receipt.document_id, "Document ingested");
        Ok(receipt)
    }

    async fn ask_question(&self, document_id: &DocumentId, question: &str) -> Result<Answer> {
        let token = self.bearer_token("chat").await?;

        let url = format!("{}/api/v1/chat", self.base_url);
        tracing::debug!(document_id = %document_id, "Sending question");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&ChatRequestWire {
                document_id,
                question,
            })
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = extract_error_message(status, &body);
            tracing::warn!(status = %status, message = %message, "Chat request rejected");
            return Err(PdfChatError::Chat { message }.into());
        }

        let wire: ChatResponseWire = serde_json::from_str(&body).map_err(|e| {
            PdfChatError::InvalidResponse(format!("Malformed chat response: {}", e))
        })?;
        wire.into_answer()
    }
}

/// Check the configured backend without an identity gateway
///
/// `GET /` needs no bearer token, so this is usable before anyone signs in.
pub async fn check_health(config: &ApiConfig) -> Result<()> {
    let client = http_client(config)?;
    get_health(&client, config.base_url.trim_end_matches('/')).await
}

fn http_client(config: &ApiConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(PdfChatError::Http)?;
    Ok(client)
}

async fn get_health(client: &Client, base_url: &str) -> Result<()> {
    let url = format!("{}/", base_url);
    let response = client.get(&url).send().await.map_err(network_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PdfChatError::Network(extract_error_message(status, &body)).into());
    }

    let health: HealthWire = response.json().await.map_err(|e| {
        PdfChatError::InvalidResponse(format!("Malformed health response: {}", e))
    })?;
    match health.status.as_deref() {
        Some("ok") => Ok(()),
        other => Err(PdfChatError::InvalidResponse(format!(
            "Unexpected health status: {}",
            other.unwrap_or("<missing>")
        ))
        .into()),
    }
}

fn network_error(e: reqwest::Error) -> PdfChatError {
    tracing::warn!(error = %e, "Backend unreachable");
    PdfChatError::Network(e.to_string())
}
