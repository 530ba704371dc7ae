//! Identity provider abstraction
//!
//! The client never talks to the identity provider directly from its
//! controllers. Everything goes through [`AuthGateway`], which owns the
//! current [`Session`] and announces changes to it through
//! [`SessionSubscription`]s.
//!
//! Two gateways ship with the crate:
//!
//! - [`SupabaseAuth`]: GoTrue REST protocol over HTTP
//! - [`FakeAuthGateway`]: in-memory accounts for tests and offline demos
//!
//! Credentials are validated locally by [`Credentials::new`] before a
//! gateway ever sees them, so malformed input can never reach a provider.

pub mod fake;
pub mod supabase;
pub mod validation;

pub use fake::FakeAuthGateway;
pub use supabase::SupabaseAuth;
pub use validation::{Credentials, MIN_PASSWORD_LEN};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::watch;

use crate::error::Result;

/// An authenticated session issued by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for the document backend
    pub access_token: String,

    /// Token used to obtain a new access token once this one expires
    pub refresh_token: Option<String>,

    /// Expiry instant; `None` means the provider did not say
    pub expires_at: Option<DateTime<Utc>>,

    /// Email of the signed-in user, for display
    pub email: String,
}

impl Session {
    /// Returns `true` when the access token is expired or about to expire.
    ///
    /// A 60-second buffer leaves room for a refresh before the backend
    /// starts rejecting the token.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => Utc::now() >= expires_at - chrono::Duration::seconds(60),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("email", &self.email)
            .finish()
    }
}

/// Why a session notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// First notification a subscriber receives, carrying whatever session
    /// exists at subscription time
    InitialSession,
    /// A sign-in (or auto-confirmed sign-up) produced a session
    SignedIn,
    /// The session was refreshed with a new access token
    TokenRefreshed,
    /// The session ended, by sign-out or by expiry
    SignedOut,
}

/// A session change as seen by subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account exists but the email address must be confirmed first
    ConfirmationRequired,
    /// The provider auto-confirmed the account and signed the user in
    SignedIn(Session),
}

/// Identity provider operations used by the client.
///
/// Implementations own the current session. Every change to it must be
/// published to subscribers through a [`SessionStore`].
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Sign in with validated credentials
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Auth` when the provider rejects the credentials
    /// and `PdfChatError::Network` when it cannot be reached.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session>;

    /// Register a new account
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Auth` when the provider refuses the registration.
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome>;

    /// End the current session
    ///
    /// The local session is cleared even if the provider call fails.
    async fn sign_out(&self) -> Result<()>;

    /// Current session, refreshed first if it has expired
    ///
    /// Returns `Ok(None)` when nobody is signed in or the session expired
    /// and could not be refreshed.
    async fn session(&self) -> Result<Option<Session>>;

    /// Subscribe to session changes
    fn subscribe(&self) -> SessionSubscription;
}

/// Holder of the current session plus its change channel.
///
/// Backed by a `watch` channel: the channel value *is* the latest event, so
/// late subscribers always see the current session and a slow subscriber only
/// ever misses intermediate states, never the latest one.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create an empty store (nobody signed in)
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionEvent {
            kind: SessionEventKind::InitialSession,
            session: None,
        });
        Self { tx }
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    /// Replace the session and notify subscribers
    pub fn publish(&self, kind: SessionEventKind, session: Option<Session>) {
        tracing::debug!(
            ?kind,
            signed_in = session.is_some(),
            subscribers = self.tx.receiver_count(),
            "Session change"
        );
        self.tx.send_replace(SessionEvent { kind, session });
    }

    /// Create a subscription that first yields the current session
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: Some(self.tx.subscribe()),
            initial_delivered: false,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of session notifications.
///
/// The first call to [`next`](Self::next) or [`try_next`](Self::try_next)
/// returns an [`SessionEventKind::InitialSession`] event with the session
/// current at that moment; later calls return changes. Calling
/// [`unsubscribe`](Self::unsubscribe), or dropping the subscription, detaches
/// it from the gateway; the gateway never waits on detached subscribers.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: Option<watch::Receiver<SessionEvent>>,
    initial_delivered: bool,
}

impl SessionSubscription {
    /// Wait for the next event
    ///
    /// Returns `None` once unsubscribed or when the gateway is gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        if let Some(event) = self.take_initial() {
            return Some(event);
        }
        let rx = self.rx.as_mut()?;
        rx.changed().await.ok()?;
        let event = rx.borrow_and_update().clone();
        Some(event)
    }

    /// Return the next event if one is ready, without waiting
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        if let Some(event) = self.take_initial() {
            return Some(event);
        }
        let rx = self.rx.as_mut()?;
        match rx.has_changed() {
            Ok(true) => Some(rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Stop receiving notifications
    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }

    /// Whether this subscription still receives notifications
    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    fn take_initial(&mut self) -> Option<SessionEvent> {
        if self.initial_delivered {
            return None;
        }
        let rx = self.rx.as_mut()?;
        self.initial_delivered = true;
        let session = rx.borrow_and_update().session.clone();
        Some(SessionEvent {
            kind: SessionEventKind::InitialSession,
            session,
        })
    }
}
