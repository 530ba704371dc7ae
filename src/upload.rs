//! Upload controller
//!
//! Drives a single upload through `Idle -> Uploading -> Idle`. Whatever the
//! outcome, the controller is back in `Idle` when [`UploadController::submit`]
//! returns, and the status line describes what happened.

use std::path::Path;

use crate::api::{DocumentApi, DocumentId, UploadFile};
use crate::error::{user_message, PdfChatError, Result};

/// Where the controller is in an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading,
}

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Loading,
    Success,
    Error,
}

/// User-facing status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub kind: StatusKind,
    pub text: String,
}

impl UploadStatus {
    fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Result of the most recent upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success(DocumentId),
    Failed(String),
}

/// Upload form controller
#[derive(Debug)]
pub struct UploadController {
    state: UploadState,
    status: Option<UploadStatus>,
    last_outcome: Option<UploadOutcome>,
}

impl UploadController {
    pub fn new() -> Self {
        Self {
            state: UploadState::Idle,
            status: None,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn status(&self) -> Option<&UploadStatus> {
        self.status.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&UploadOutcome> {
        self.last_outcome.as_ref()
    }

    /// Upload the file at `selection`
    ///
    /// `None` means nothing was selected and is rejected without contacting
    /// the backend. The returned id is meant to be handed to
    /// [`ChatController::on_upload_success`](crate::session::ChatController::on_upload_success).
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Validation` for a missing or unreadable file,
    /// otherwise whatever [`DocumentApi::upload_document`] returned.
    pub async fn submit(
        &mut self,
        api: &dyn DocumentApi,
        selection: Option<&Path>,
    ) -> Result<DocumentId> {
        let Some(path) = selection else {
            self.status = Some(UploadStatus::new(
                StatusKind::Error,
                "Please select a PDF file first.",
            ));
            return Err(
                PdfChatError::Validation("Please select a PDF file first.".to_string()).into(),
            );
        };

        let file = match UploadFile::from_path(path).await {
            Ok(file) => file,
            Err(e) => {
                self.status = Some(UploadStatus::new(
                    StatusKind::Error,
                    format!("Upload failed: {}", user_message(&e)),
                ));
                return Err(e);
            }
        };

        self.submit_file(api, file).await
    }

    /// Upload an already loaded file
    pub async fn submit_file(
        &mut self,
        api: &dyn DocumentApi,
        file: UploadFile,
    ) -> Result<DocumentId> {
        self.state = UploadState::Uploading;
        self.status = Some(UploadStatus::new(
            StatusKind::Loading,
            format!("Uploading and processing: {}...", file.file_name),
        ));

        let result = api.upload_document(file).await;

        // Reset happens on every path.
        self.state = UploadState::Idle;

        match result {
            Ok(receipt) => {
                self.status = Some(UploadStatus::new(
                    StatusKind::Success,
                    "File processed successfully! You can now ask questions.",
                ));
                self.last_outcome = Some(UploadOutcome::Success(receipt.document_id.clone()));
                Ok(receipt.document_id)
            }
            Err(e) => {
                let message = user_message(&e);
                tracing::warn!(error = %message, "Upload failed");
                self.status = Some(UploadStatus::new(
                    StatusKind::Error,
                    format!("Upload failed: {}", message),
                ));
                self.last_outcome = Some(UploadOutcome::Failed(message));
                Err(e)
            }
        }
    }
}

impl Default for UploadController {
    fn default() -> Self {
        Self::new()
    }
}
