//! Request and response types for the document backend
//!
//! Wire structs are private to the API layer. What leaves it is already
//! validated: a [`DocumentId`] is guaranteed non-empty text, so controllers
//! never inspect identifier shapes themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{PdfChatError, Result};

/// Identifier the backend assigns to an ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Build an identifier from text
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::InvalidResponse` for empty or blank text.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PdfChatError::InvalidResponse("empty document_id".to_string()).into());
        }
        Ok(Self(id))
    }

    /// Validate the `document_id` field of a success body
    ///
    /// Accepts a non-empty string, or an integer which is coerced to its
    /// decimal form. Anything else (missing, null, object, array, float,
    /// bool) is rejected.
    pub(crate) fn from_wire(value: Option<&serde_json::Value>) -> Result<Self> {
        match value {
            None | Some(serde_json::Value::Null) => Err(PdfChatError::InvalidResponse(
                "missing document_id".to_string(),
            )
            .into()),
            Some(serde_json::Value::String(s)) => Self::new(s.as_str()),
            Some(serde_json::Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Self::new(n.to_string())
            }
            Some(other) => Err(PdfChatError::InvalidResponse(format!(
                "document_id must be a string, got {}",
                json_kind(other)
            ))
            .into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a non-integer number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A file selected for upload
#[derive(Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as name
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Validation` naming the path if it cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PdfChatError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self { file_name, bytes })
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Successful upload result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub document_id: DocumentId,
    pub filename: Option<String>,
    pub message: Option<String>,
}

/// Answer to a chat question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// `POST /api/v1/upload` success body
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponseWire {
    #[serde(default)]
    pub document_id: Option<serde_json::Value>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponseWire {
    pub(crate) fn into_receipt(self) -> Result<UploadReceipt> {
        Ok(UploadReceipt {
            document_id: DocumentId::from_wire(self.document_id.as_ref())?,
            filename: self.filename,
            message: self.message,
        })
    }
}

/// `POST /api/v1/chat` request body
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestWire<'a> {
    pub document_id: &'a DocumentId,
    pub question: &'a str,
}

/// `POST /api/v1/chat` success body
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseWire {
    #[serde(default)]
    pub answer: Option<String>,
}

impl ChatResponseWire {
    pub(crate) fn into_answer(self) -> Result<Answer> {
        match self.answer {
            Some(text) => Ok(Answer { text }),
            None => Err(PdfChatError::InvalidResponse("missing answer".to_string()).into()),
        }
    }
}

/// `GET /` body
#[derive(Debug, Deserialize)]
pub(crate) struct HealthWire {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_kind;
    use serde_json::json;

    fn invalid_response(result: Result<DocumentId>) -> String {
        let err = result.unwrap_err();
        match error_kind(&err) {
            Some(PdfChatError::InvalidResponse(msg)) => msg.clone(),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_document_id_from_string() {
        let id = DocumentId::from_wire(Some(&json!("42"))).unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_document_id_integer_is_coerced() {
        let id = DocumentId::from_wire(Some(&json!(42))).unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_document_id_missing_or_null() {
        assert_eq!(invalid_response(DocumentId::from_wire(None)), "missing document_id");
        assert_eq!(
            invalid_response(DocumentId::from_wire(Some(&json!(null)))),
            "missing document_id"
        );
    }

    #[test]
    fn test_document_id_object_rejected() {
        let msg = invalid_response(DocumentId::from_wire(Some(&json!({"id": "42"}))));
        assert_eq!(msg, "document_id must be a string, got an object");
    }

    #[test]
    fn test_document_id_rejects_blank_and_float() {
        invalid_response(DocumentId::from_wire(Some(&json!("  "))));
        invalid_response(DocumentId::from_wire(Some(&json!(4.2))));
        invalid_response(DocumentId::from_wire(Some(&json!(true))));
    }

    #[test]
    fn test_chat_request_serializes_flat_id() {
        let id = DocumentId::new("doc-7").unwrap();
        let body = serde_json::to_value(ChatRequestWire {
            document_id: &id,
            question: "What is it?",
        })
        .unwrap();
        assert_eq!(body, json!({"document_id": "doc-7", "question": "What is it?"}));
    }

    #[test]
    fn test_upload_wire_keeps_optional_fields() {
        let wire: UploadResponseWire = serde_json::from_value(json!({
            "message": "File uploaded and processed successfully.",
            "filename": "a.pdf",
            "document_id": "abc"
        }))
        .unwrap();
        let receipt = wire.into_receipt().unwrap();
        assert_eq!(receipt.document_id.as_str(), "abc");
        assert_eq!(receipt.filename.as_deref(), Some("a.pdf"));
    }

    #[test]
    fn test_chat_wire_missing_answer() {
        let wire: ChatResponseWire = serde_json::from_value(json!({"question": "q"})).unwrap();
        assert!(wire.into_answer().is_err());
    }

    #[tokio::test]
    async fn test_upload_file_from_missing_path() {
        let err = UploadFile::from_path(Path::new("/nonexistent/report.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Cannot read /nonexistent/report.pdf"));
    }

    #[tokio::test]
    async fn test_upload_file_from_path_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.bytes, b"%PDF-1.4");
    }
}
