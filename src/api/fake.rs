//! In-process fake backend for controller tests
//!
//! [`FakeDocumentApi`] answers from scripted queues and records every call,
//! so controllers can be driven without HTTP. When a queue is empty it falls
//! back to a canned success: uploads get ids `doc-1`, `doc-2`, ... and
//! questions are echoed back as `answer: <question>`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Answer, DocumentApi, DocumentId, UploadFile, UploadReceipt};
use crate::error::Result;

/// Scripted [`DocumentApi`]
#[derive(Default)]
pub struct FakeDocumentApi {
    upload_replies: Mutex<VecDeque<Result<UploadReceipt>>>,
    answer_replies: Mutex<VecDeque<Result<Answer>>>,
    uploads: Mutex<Vec<String>>,
    questions: Mutex<Vec<(DocumentId, String)>>,
    next_id: AtomicUsize,
}

impl FakeDocumentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `upload_document` call
    pub fn push_upload(&self, reply: Result<UploadReceipt>) {
        if let Ok(mut queue) = self.upload_replies.lock() {
            queue.push_back(reply);
        }
    }

    /// Queue the result of the next `ask_question` call
    pub fn push_answer(&self, reply: Result<Answer>) {
        if let Ok(mut queue) = self.answer_replies.lock() {
            queue.push_back(reply);
        }
    }

    /// File names passed to `upload_document`, in call order
    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploads.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// `(document_id, question)` pairs passed to `ask_question`
    pub fn questions(&self) -> Vec<(DocumentId, String)> {
        self.questions.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.uploaded_files().len() + self.questions().len()
    }
}

#[async_trait]
impl DocumentApi for FakeDocumentApi {
    async fn upload_document(&self, file: UploadFile) -> Result<UploadReceipt> {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(file.file_name.clone());
        }

        let scripted = self
            .upload_replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match scripted {
            Some(reply) => reply,
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(UploadReceipt {
                    document_id: DocumentId::new(format!("doc-{}", n))?,
                    filename: Some(file.file_name),
                    message: None,
                })
            }
        }
    }

    async fn ask_question(&self, document_id: &DocumentId, question: &str) -> Result<Answer> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push((document_id.clone(), question.to_string()));
        }

        let scripted = self
            .answer_replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        scripted.unwrap_or_else(|| {
            Ok(Answer {
                text: format!("answer: {}", question),
            })
        })
    }
}
