//! Client application wiring
//!
//! [`ChatApp`] is the single owner of client state for one run: it holds the
//! identity gateway, the backend API, both controllers, and the session
//! subscription that keeps the chat controller in step with the gateway.
//! Front ends (the interactive loop, the one-shot `ask` command) drive it
//! and render what it reports.

use std::path::Path;
use std::sync::Arc;

use crate::api::{DocumentApi, DocumentId};
use crate::auth::{AuthGateway, Credentials, SessionSubscription, SignUpOutcome};
use crate::error::{error_kind, user_message, PdfChatError, Result};
use crate::session::{AskOutcome, ChatController, ChatMessage, Phase};
use crate::upload::UploadController;

/// Message shown after a sign-up that still needs email confirmation
pub const SIGNUP_CONFIRM_MESSAGE: &str = "Signup successful! Please check your email.";

/// Client state for one run
pub struct ChatApp {
    auth: Arc<dyn AuthGateway>,
    api: Arc<dyn DocumentApi>,
    chat: ChatController,
    uploader: UploadController,
    subscription: SessionSubscription,
}

impl ChatApp {
    /// Wire the controllers to the gateway and apply the current session
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        api: Arc<dyn DocumentApi>,
        thinking_text: impl Into<String>,
    ) -> Self {
        let subscription = auth.subscribe();
        let mut app = Self {
            auth,
            api,
            chat: ChatController::new(thinking_text),
            uploader: UploadController::new(),
            subscription,
        };
        app.sync_session();
        app
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn uploader(&self) -> &UploadController {
        &self.uploader
    }

    /// Apply every session notification received since the last call
    ///
    /// Returns the phase before the first applied event, if any were applied.
    pub fn sync_session(&mut self) -> Option<Phase> {
        let before = self.chat.phase();
        let mut applied = false;
        while let Some(event) = self.subscription.try_next() {
            self.chat.apply_event(&event);
            applied = true;
        }
        applied.then_some(before)
    }

    /// Validate credentials locally, then sign in
    ///
    /// # Errors
    ///
    /// `PdfChatError::Validation` for malformed input (the gateway is not
    /// called), otherwise whatever the gateway reports.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        let credentials = Credentials::new(email, password)?;
        let session = self.auth.sign_in(&credentials).await?;
        self.sync_session();
        Ok(format!("User: {}", session.email))
    }

    /// Validate credentials locally, then register
    pub async fn signup(&mut self, email: &str, password: &str) -> Result<String> {
        let credentials = Credentials::new(email, password)?;
        let outcome = self.auth.sign_up(&credentials).await?;
        self.sync_session();
        Ok(match outcome {
            SignUpOutcome::ConfirmationRequired => SIGNUP_CONFIRM_MESSAGE.to_string(),
            SignUpOutcome::SignedIn(session) => format!("Signed up. User: {}", session.email),
        })
    }

    /// Sign out and reset the transcript
    pub async fn logout(&mut self) -> Result<()> {
        self.auth.sign_out().await?;
        self.sync_session();
        Ok(())
    }

    /// Upload a file and attach the resulting document to the chat
    pub async fn upload(&mut self, path: Option<&Path>) -> Result<DocumentId> {
        let result = self.uploader.submit(self.api.as_ref(), path).await;
        // An expired session may have been dropped during the upload.
        self.sync_session();
        let document_id = result?;
        self.chat.on_upload_success(document_id.clone())?;
        Ok(document_id)
    }

    /// Ask a question
    ///
    /// `on_thinking` is called with the placeholder message once the question
    /// is accepted, before the backend is contacted.
    pub async fn ask_with<F>(&mut self, input: &str, on_thinking: F) -> Result<AskOutcome>
    where
        F: FnOnce(&ChatMessage),
    {
        let Some(pending) = self.chat.begin_question(input)? else {
            return Ok(AskOutcome::Ignored);
        };
        if let Some(placeholder) = self.chat.messages().last() {
            on_thinking(placeholder);
        }

        let api = Arc::clone(&self.api);
        let reply = api
            .ask_question(pending.document_id(), pending.question())
            .await;
        Ok(self.chat.complete_question(pending, reply))
    }

    /// Ask a question without a thinking callback
    pub async fn ask(&mut self, input: &str) -> Result<AskOutcome> {
        self.ask_with(input, |_| {}).await
    }

    /// Detach from the gateway
    pub fn shutdown(mut self) {
        self.subscription.unsubscribe();
        tracing::debug!("Chat session closed");
    }
}

/// Render an authentication failure the way the sign-in form shows it.
///
/// Local validation failures are shown as-is; provider and transport
/// failures are prefixed with the action, e.g. `Login failed: ...`.
pub fn auth_failure_message(action: &str, err: &anyhow::Error) -> String {
    match error_kind(err) {
        Some(PdfChatError::Validation(msg)) => msg.clone(),
        _ => format!("{} failed: {}", action, user_message(err)),
    }
}
