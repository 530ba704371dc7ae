//! Session and chat controller
//!
//! [`ChatController`] owns the client's session state machine:
//!
//! ```text
//! Unauthenticated --(session appears)--> AuthenticatedNoDocument
//! AuthenticatedNoDocument --(upload success)--> AuthenticatedWithDocument
//! Any --(sign-out)--> Unauthenticated
//! ```
//!
//! and the transcript shown to the user. Questions are only dispatched in
//! `AuthenticatedWithDocument`, one at a time.
//!
//! Dispatch is split in two so a front end can await the backend without
//! holding the controller: [`ChatController::begin_question`] appends the
//! user message and a placeholder and hands back a [`PendingQuestion`];
//! [`ChatController::complete_question`] fills the placeholder in. Every
//! reset bumps a generation counter, and completions from an older
//! generation are dropped.

use colored::Colorize;
use std::fmt;

use crate::api::{Answer, DocumentApi, DocumentId};
use crate::auth::{Session, SessionEvent, SessionEventKind};
use crate::error::{user_message, PdfChatError, Result};

/// Bot prompt shown whenever the transcript is reset
pub const UPLOAD_PROMPT: &str = "Please upload a document to begin.";

/// Inline error for questions asked before a document is loaded
pub const NO_DOCUMENT_ERROR: &str = "Error: Please upload a document before asking a question.";

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    AuthenticatedNoDocument,
    AuthenticatedWithDocument,
}

impl Phase {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Sign in with /login to get started",
            Self::AuthenticatedNoDocument => "Upload a PDF with /upload <path>",
            Self::AuthenticatedWithDocument => "Ask anything about the document",
        }
    }

    /// Colored tag for prompts and status output
    pub fn colored_tag(&self) -> String {
        match self {
            Self::Unauthenticated => format!("[{}]", "SIGNED OUT".red()),
            Self::AuthenticatedNoDocument => format!("[{}]", "NO DOCUMENT".yellow()),
            Self::AuthenticatedWithDocument => format!("[{}]", "READY".green()),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            Self::AuthenticatedNoDocument => write!(f, "AUTHENTICATED_NO_DOCUMENT"),
            Self::AuthenticatedWithDocument => write!(f, "AUTHENTICATED_WITH_DOCUMENT"),
        }
    }
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// Rendering hint for a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Normal,
    Thinking,
    Error,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub status: MessageStatus,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            status: MessageStatus::Normal,
        }
    }

    fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            status: MessageStatus::Normal,
        }
    }

    fn bot_error(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            status: MessageStatus::Error,
        }
    }
}

/// A question whose answer has not been applied yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    generation: u64,
    placeholder: usize,
    document_id: DocumentId,
    question: String,
}

impl PendingQuestion {
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// What happened to a submitted question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Empty input; nothing happened
    Ignored,
    /// The placeholder now holds the answer
    Answered,
    /// The placeholder now holds an error message
    Failed,
    /// The session was reset while waiting; the completion was dropped
    Discarded,
}

/// Owner of session state and transcript
#[derive(Debug)]
pub struct ChatController {
    phase: Phase,
    user_email: Option<String>,
    document: Option<DocumentId>,
    messages: Vec<ChatMessage>,
    pending: bool,
    generation: u64,
    thinking_text: String,
}

impl ChatController {
    /// Create a signed-out controller showing the upload prompt
    pub fn new(thinking_text: impl Into<String>) -> Self {
        let mut controller = Self {
            phase: Phase::Unauthenticated,
            user_email: None,
            document: None,
            messages: Vec::new(),
            pending: false,
            generation: 0,
            thinking_text: thinking_text.into(),
        };
        controller.reset();
        controller
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether the chat input accepts a question right now
    pub fn chat_enabled(&self) -> bool {
        self.phase == Phase::AuthenticatedWithDocument && !self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Apply a notification from the identity gateway
    ///
    /// A `SignedIn` event always starts a new session: any loaded document
    /// and transcript from the previous one are dropped.
    pub fn apply_event(&mut self, event: &SessionEvent) {
        tracing::debug!(kind = ?event.kind, "Applying session event");
        if event.kind == SessionEventKind::SignedIn && self.phase != Phase::Unauthenticated {
            self.start_new_session();
        }
        self.apply_session(event.session.as_ref());
    }

    /// Move to the state implied by the presence or absence of a session
    ///
    /// A session re-announced for the same user (a token refresh) only
    /// updates the stored email; the loaded document stays. A session for a
    /// different user starts over.
    pub fn apply_session(&mut self, session: Option<&Session>) {
        match session {
            Some(session) => {
                let other_user = self
                    .user_email
                    .as_deref()
                    .is_some_and(|email| email != session.email);
                if other_user && self.phase != Phase::Unauthenticated {
                    self.start_new_session();
                }
                self.user_email = Some(session.email.clone());
                if self.phase == Phase::Unauthenticated {
                    self.phase = Phase::AuthenticatedNoDocument;
                    tracing::info!(email = %session.email, phase = %self.phase, "Session started");
                }
            }
            None => {
                if self.phase != Phase::Unauthenticated {
                    tracing::info!("Session ended");
                }
                self.user_email = None;
                self.phase = Phase::Unauthenticated;
                self.reset();
            }
        }
    }

    /// Attach a freshly ingested document
    ///
    /// Clears the transcript and enables chat. Replaces any earlier document.
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::AuthRequired` when signed out.
    pub fn on_upload_success(&mut self, document_id: DocumentId) -> Result<()> {
        if self.phase == Phase::Unauthenticated {
            return Err(PdfChatError::AuthRequired(
                "You must be logged in to use a document.".to_string(),
            )
            .into());
        }

        self.bump_generation();
        self.messages.clear();
        self.messages.push(ChatMessage::bot(format!(
            "PDF processed successfully. Document ID: {}. You can now ask questions.",
            document_id
        )));
        tracing::info!(document_id = %document_id, "Document attached");
        self.document = Some(document_id);
        self.phase = Phase::AuthenticatedWithDocument;
        Ok(())
    }

    /// Validate a question and record it in the transcript
    ///
    /// Returns `Ok(None)` for blank input, which changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Validation` when no document is loaded (an
    /// inline error is appended to the transcript) or when another question
    /// is still waiting for its answer.
    pub fn begin_question(&mut self, input: &str) -> Result<Option<PendingQuestion>> {
        let question = input.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let document_id = match (&self.document, self.phase) {
            (Some(id), Phase::AuthenticatedWithDocument) => id.clone(),
            _ => {
                self.messages.push(ChatMessage::bot_error(NO_DOCUMENT_ERROR));
                return Err(PdfChatError::Validation(
                    "Please upload a document before asking a question.".to_string(),
                )
                .into());
            }
        };

        if self.pending {
            return Err(PdfChatError::Validation(
                "Please wait for the current answer.".to_string(),
            )
            .into());
        }

        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage {
            sender: Sender::Bot,
            text: self.thinking_text.clone(),
            status: MessageStatus::Thinking,
        });
        self.pending = true;

        Ok(Some(PendingQuestion {
            generation: self.generation,
            placeholder: self.messages.len() - 1,
            document_id,
            question: question.to_string(),
        }))
    }

    /// Apply the backend's reply to a pending question
    pub fn complete_question(
        &mut self,
        pending: PendingQuestion,
        reply: Result<Answer>,
    ) -> AskOutcome {
        if pending.generation != self.generation {
            tracing::debug!(
                stale = pending.generation,
                current = self.generation,
                "Dropping stale answer"
            );
            return AskOutcome::Discarded;
        }
        self.pending = false;

        let Some(slot) = self.messages.get_mut(pending.placeholder) else {
            return AskOutcome::Discarded;
        };
        match reply {
            Ok(answer) => {
                slot.text = answer.text;
                slot.status = MessageStatus::Normal;
                AskOutcome::Answered
            }
            Err(e) => {
                tracing::warn!(error = %e, "Question failed");
                slot.text = format!("Error: {}", user_message(&e));
                slot.status = MessageStatus::Error;
                AskOutcome::Failed
            }
        }
    }

    /// Submit a question and wait for its answer
    ///
    /// # Errors
    ///
    /// Only local rejections are errors; see [`begin_question`](Self::begin_question).
    /// Backend failures are written into the transcript and reported as
    /// [`AskOutcome::Failed`].
    pub async fn ask(&mut self, api: &dyn DocumentApi, input: &str) -> Result<AskOutcome> {
        let Some(pending) = self.begin_question(input)? else {
            return Ok(AskOutcome::Ignored);
        };
        let reply = api
            .ask_question(pending.document_id(), pending.question())
            .await;
        Ok(self.complete_question(pending, reply))
    }

    fn reset(&mut self) {
        self.bump_generation();
        self.document = None;
        self.messages.clear();
        self.messages.push(ChatMessage::bot(UPLOAD_PROMPT));
    }

    fn start_new_session(&mut self) {
        tracing::info!("New sign-in; dropping previous session state");
        self.reset();
        self.phase = Phase::AuthenticatedNoDocument;
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        self.pending = false;
    }
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new("Thinking...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FakeDocumentApi;
    use crate::error::error_kind;

    fn session(email: &str) -> Session {
        Session {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: None,
            email: email.to_string(),
        }
    }

    fn ready_controller() -> ChatController {
        let mut chat = ChatController::default();
        chat.apply_session(Some(&session("ada@example.com")));
        chat.on_upload_success(DocumentId::new("42").unwrap())
            .unwrap();
        chat
    }

    #[test]
    fn test_initial_state_shows_upload_prompt() {
        let chat = ChatController::default();
        assert_eq!(chat.phase(), Phase::Unauthenticated);
        assert!(!chat.chat_enabled());
        assert_eq!(chat.messages(), &[ChatMessage::bot(UPLOAD_PROMPT)]);
    }

    #[test]
    fn test_session_appears_then_upload_enables_chat() {
        let mut chat = ChatController::default();
        chat.apply_session(Some(&session("ada@example.com")));
        assert_eq!(chat.phase(), Phase::AuthenticatedNoDocument);
        assert_eq!(chat.user_email(), Some("ada@example.com"));
        assert!(!chat.chat_enabled());

        chat.on_upload_success(DocumentId::new("42").unwrap())
            .unwrap();
        assert_eq!(chat.phase(), Phase::AuthenticatedWithDocument);
        assert!(chat.chat_enabled());
        assert_eq!(chat.document_id().unwrap().as_str(), "42");
        assert_eq!(
            chat.messages()[0].text,
            "PDF processed successfully. Document ID: 42. You can now ask questions."
        );
    }

    #[test]
    fn test_upload_success_while_signed_out_is_rejected() {
        let mut chat = ChatController::default();
        let err = chat
            .on_upload_success(DocumentId::new("42").unwrap())
            .unwrap_err();
        assert!(matches!(error_kind(&err), Some(PdfChatError::AuthRequired(_))));
        assert_eq!(chat.phase(), Phase::Unauthenticated);
    }

    #[test]
    fn test_token_refresh_keeps_document() {
        let mut chat = ready_controller();
        chat.apply_session(Some(&session("ada@example.com")));
        assert_eq!(chat.phase(), Phase::AuthenticatedWithDocument);
        assert!(chat.document_id().is_some());
    }

    #[test]
    fn test_refresh_event_keeps_document() {
        let mut chat = ready_controller();
        chat.apply_event(&SessionEvent {
            kind: SessionEventKind::TokenRefreshed,
            session: Some(session("ada@example.com")),
        });
        assert_eq!(chat.phase(), Phase::AuthenticatedWithDocument);
        assert_eq!(chat.document_id().unwrap().as_str(), "42");
    }

    #[test]
    fn test_new_sign_in_drops_document_and_history() {
        let mut chat = ready_controller();
        let pending = chat.begin_question("hello").unwrap().unwrap();

        chat.apply_event(&SessionEvent {
            kind: SessionEventKind::SignedIn,
            session: Some(session("ada@example.com")),
        });
        assert_eq!(chat.phase(), Phase::AuthenticatedNoDocument);
        assert!(chat.document_id().is_none());
        assert!(!chat.chat_enabled());
        assert_eq!(chat.messages(), &[ChatMessage::bot(UPLOAD_PROMPT)]);

        let reply = Ok(Answer {
            text: "late".to_string(),
        });
        assert_eq!(chat.complete_question(pending, reply), AskOutcome::Discarded);
    }

    #[test]
    fn test_session_for_other_user_starts_over() {
        let mut chat = ready_controller();
        chat.apply_session(Some(&session("bob@example.com")));
        assert_eq!(chat.phase(), Phase::AuthenticatedNoDocument);
        assert_eq!(chat.user_email(), Some("bob@example.com"));
        assert!(chat.document_id().is_none());
    }

    #[test]
    fn test_sign_out_clears_document_and_history() {
        let mut chat = ready_controller();
        chat.begin_question("hello").unwrap();

        chat.apply_session(None);
        assert_eq!(chat.phase(), Phase::Unauthenticated);
        assert!(chat.document_id().is_none());
        assert!(chat.user_email().is_none());
        assert!(!chat.is_pending());
        assert_eq!(chat.messages(), &[ChatMessage::bot(UPLOAD_PROMPT)]);
    }

    #[test]
    fn test_empty_question_is_noop_in_every_phase() {
        let mut chat = ChatController::default();
        assert!(chat.begin_question("   ").unwrap().is_none());
        assert_eq!(chat.messages().len(), 1);

        let mut chat = ready_controller();
        let before = chat.messages().to_vec();
        assert!(chat.begin_question("").unwrap().is_none());
        assert_eq!(chat.messages(), before.as_slice());
    }

    #[test]
    fn test_question_without_document_appends_inline_error() {
        let mut chat = ChatController::default();
        chat.apply_session(Some(&session("ada@example.com")));

        let err = chat.begin_question("what?").unwrap_err();
        assert!(matches!(error_kind(&err), Some(PdfChatError::Validation(_))));
        let last = chat.messages().last().unwrap();
        assert_eq!(last.text, NO_DOCUMENT_ERROR);
        assert_eq!(last.status, MessageStatus::Error);
    }

    #[test]
    fn test_begin_question_appends_user_and_placeholder() {
        let mut chat = ready_controller();
        let pending = chat.begin_question("  What is it?  ").unwrap().unwrap();

        assert_eq!(pending.question(), "What is it?");
        assert_eq!(pending.document_id().as_str(), "42");
        let n = chat.messages().len();
        assert_eq!(chat.messages()[n - 2], ChatMessage::user("What is it?"));
        assert_eq!(chat.messages()[n - 1].status, MessageStatus::Thinking);
        assert_eq!(chat.messages()[n - 1].text, "Thinking...");
        assert!(!chat.chat_enabled());
    }

    #[test]
    fn test_second_question_while_pending_is_rejected() {
        let mut chat = ready_controller();
        let _pending = chat.begin_question("first").unwrap().unwrap();
        let len = chat.messages().len();

        let err = chat.begin_question("second").unwrap_err();
        assert_eq!(err.to_string(), "Please wait for the current answer.");
        assert_eq!(chat.messages().len(), len);
    }

    #[test]
    fn test_completion_after_sign_out_is_discarded() {
        let mut chat = ready_controller();
        let pending = chat.begin_question("first").unwrap().unwrap();

        chat.apply_session(None);
        let outcome = chat.complete_question(
            pending,
            Ok(Answer {
                text: "late".to_string(),
            }),
        );
        assert_eq!(outcome, AskOutcome::Discarded);
        assert_eq!(chat.messages(), &[ChatMessage::bot(UPLOAD_PROMPT)]);
    }

    #[test]
    fn test_completion_after_new_upload_is_discarded() {
        let mut chat = ready_controller();
        let pending = chat.begin_question("about doc 42").unwrap().unwrap();
        chat.on_upload_success(DocumentId::new("43").unwrap())
            .unwrap();

        let outcome = chat.complete_question(
            pending,
            Ok(Answer {
                text: "stale".to_string(),
            }),
        );
        assert_eq!(outcome, AskOutcome::Discarded);
        assert!(chat.messages().iter().all(|m| m.text != "stale"));
        assert!(chat.chat_enabled());
    }

    #[tokio::test]
    async fn test_ask_replaces_placeholder_with_answer() {
        let api = FakeDocumentApi::new();
        let mut chat = ready_controller();

        let outcome = chat.ask(&api, "Who wrote it?").await.unwrap();
        assert_eq!(outcome, AskOutcome::Answered);
        let last = chat.messages().last().unwrap();
        assert_eq!(last.text, "answer: Who wrote it?");
        assert_eq!(last.status, MessageStatus::Normal);
        assert!(chat.chat_enabled());
        assert_eq!(
            api.questions(),
            vec![(DocumentId::new("42").unwrap(), "Who wrote it?".to_string())]
        );
    }

    #[tokio::test]
    async fn test_ask_failure_marks_placeholder_as_error() {
        let api = FakeDocumentApi::new();
        api.push_answer(Err(PdfChatError::Chat {
            message: "body.question - field required".to_string(),
        }
        .into()));
        let mut chat = ready_controller();

        let outcome = chat.ask(&api, "?").await.unwrap();
        assert_eq!(outcome, AskOutcome::Failed);
        let last = chat.messages().last().unwrap();
        assert_eq!(last.text, "Error: body.question - field required");
        assert_eq!(last.status, MessageStatus::Error);
        assert!(chat.chat_enabled());
    }

    #[tokio::test]
    async fn test_ask_empty_makes_no_call() {
        let api = FakeDocumentApi::new();
        let mut chat = ready_controller();
        assert_eq!(chat.ask(&api, "  ").await.unwrap(), AskOutcome::Ignored);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_without_document_makes_no_call() {
        let api = FakeDocumentApi::new();
        let mut chat = ChatController::default();
        assert!(chat.ask(&api, "hello").await.is_err());
        assert_eq!(api.call_count(), 0);
    }
}
