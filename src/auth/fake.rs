//! In-memory identity gateway for tests and offline use
//!
//! [`FakeAuthGateway`] keeps a table of registered accounts and issues
//! opaque tokens without any network traffic. Call counters let tests assert
//! that locally rejected input never reached the provider.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    AuthGateway, Credentials, Session, SessionEventKind, SessionStore, SessionSubscription,
    SignUpOutcome,
};
use crate::error::{PdfChatError, Result};

/// In-memory [`AuthGateway`]
///
/// # Examples
///
/// ```
/// use pdfchat::auth::{AuthGateway, Credentials, FakeAuthGateway};
///
/// # #[tokio::main]
/// # async fn main() {
/// let auth = FakeAuthGateway::with_account("ada@example.com", "hunter22");
/// let creds = Credentials::new("ada@example.com", "hunter22").unwrap();
/// let session = auth.sign_in(&creds).await.unwrap();
/// assert_eq!(session.email, "ada@example.com");
/// assert_eq!(auth.sign_in_calls(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct FakeAuthGateway {
    accounts: Mutex<HashMap<String, String>>,
    store: SessionStore,
    auto_confirm: bool,
    issued: AtomicUsize,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl FakeAuthGateway {
    /// Gateway with no accounts; sign-ups require confirmation
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway with one registered account
    pub fn with_account(email: &str, password: &str) -> Self {
        let gateway = Self::new();
        gateway.add_account(email, password);
        gateway
    }

    /// Sign-ups immediately produce a session
    pub fn auto_confirm(mut self) -> Self {
        self.auto_confirm = true;
        self
    }

    pub fn add_account(&self, email: &str, password: &str) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(email.to_string(), password.to_string());
        }
    }

    /// Mark the current session expired; the next `session()` call drops it
    pub fn expire_session(&self) {
        if let Some(mut session) = self.store.current() {
            session.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
            self.store
                .publish(SessionEventKind::TokenRefreshed, Some(session));
        }
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_up_calls(&self) -> usize {
        self.sign_up_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, email: &str) -> Session {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Session {
            access_token: format!("fake-token-{}", n),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            email: email.to_string(),
        }
    }

    fn lock_accounts(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.accounts.lock().map_err(|_| {
            PdfChatError::Auth("Failed to acquire lock on account table".to_string()).into()
        })
    }
}

#[async_trait]
impl AuthGateway for FakeAuthGateway {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);

        let known = self
            .lock_accounts()?
            .get(credentials.email())
            .map(|p| p == credentials.password())
            .unwrap_or(false);
        if !known {
            return Err(PdfChatError::Auth("Invalid login credentials".to_string()).into());
        }

        let session = self.issue(credentials.email());
        self.store
            .publish(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut accounts = self.lock_accounts()?;
            if accounts.contains_key(credentials.email()) {
                return Err(PdfChatError::Auth("User already registered".to_string()).into());
            }
            accounts.insert(
                credentials.email().to_string(),
                credentials.password().to_string(),
            );
        }

        if !self.auto_confirm {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }

        let session = self.issue(credentials.email());
        self.store
            .publish(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.store.current().is_some() {
            self.store.publish(SessionEventKind::SignedOut, None);
        }
        Ok(())
    }

    async fn session(&self) -> Result<Option<Session>> {
        match self.store.current() {
            Some(session) if session.is_expired() => {
                self.store.publish(SessionEventKind::SignedOut, None);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.store.subscribe()
    }
}
