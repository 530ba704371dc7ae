//! GoTrue (Supabase Auth) gateway
//!
//! Speaks the password-grant subset of the GoTrue REST API:
//!
//! - `POST /auth/v1/token?grant_type=password` - sign in
//! - `POST /auth/v1/token?grant_type=refresh_token` - refresh an expired session
//! - `POST /auth/v1/signup` - register
//! - `POST /auth/v1/logout` - revoke the session
//!
//! Every request carries the project's public key in the `apikey` header.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{
    AuthGateway, Credentials, Session, SessionEventKind, SessionStore, SessionSubscription,
    SignUpOutcome,
};
use crate::config::AuthConfig;
use crate::error::{PdfChatError, Result};

/// Session payload returned by the token and (auto-confirmed) signup endpoints
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            });
        let email = self
            .user
            .and_then(|u| u.email)
            .unwrap_or_else(|| fallback_email.to_string());

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            email,
        }
    }
}

/// Identity gateway backed by a GoTrue server
///
/// # Examples
///
/// ```no_run
/// use pdfchat::auth::{AuthGateway, Credentials, SupabaseAuth};
/// use pdfchat::config::AuthConfig;
///
/// # async fn example() -> pdfchat::error::Result<()> {
/// let config = AuthConfig {
///     url: "https://project.supabase.co".to_string(),
///     anon_key: "public-anon-key".to_string(),
/// };
/// let auth = SupabaseAuth::new(&config, std::time::Duration::from_secs(30))?;
/// let session = auth.sign_in(&Credentials::new("ada@example.com", "hunter22")?).await?;
/// println!("signed in as {}", session.email);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    store: SessionStore,
    refresh_lock: Mutex<()>,
}

impl SupabaseAuth {
    /// Create a gateway for the configured project
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Config` if the anon key is missing and
    /// `PdfChatError::Http` if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig, timeout: Duration) -> Result<Self> {
        if config.anon_key.trim().is_empty() {
            return Err(PdfChatError::Config(
                "auth.anon_key must be set (or PDFCHAT_AUTH_ANON_KEY)".to_string(),
            )
            .into());
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PdfChatError::Http)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            store: SessionStore::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        tracing::debug!(url = %url, "Identity provider request");

        let mut request = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Identity provider unreachable");
            PdfChatError::Network(format!("Could not reach authentication service: {}", e)).into()
        })
    }

    async fn token_request(&self, grant_type: &str, body: serde_json::Value) -> Result<TokenResponse> {
        let response = self
            .post(&format!("token?grant_type={}", grant_type), &body, None)
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PdfChatError::Auth(provider_error_message(status, &text)).into());
        }

        serde_json::from_str(&text).map_err(|e| {
            PdfChatError::InvalidResponse(format!("Malformed token response: {}", e)).into()
        })
    }

    async fn refresh(&self, expired: &Session) -> Option<Session> {
        let refresh_token = expired.refresh_token.as_deref()?;
        match self
            .token_request(
                "refresh_token",
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await
        {
            Ok(token) => Some(token.into_session(&expired.email)),
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed");
                None
            }
        }
    }
}

#[async_trait]
impl AuthGateway for SupabaseAuth {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let token = self
            .token_request(
                "password",
                serde_json::json!({
                    "email": credentials.email(),
                    "password": credentials.password(),
                }),
            )
            .await?;

        let session = token.into_session(credentials.email());
        tracing::info!(email = %session.email, "Signed in");
        self.store
            .publish(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        let response = self
            .post(
                "signup",
                &serde_json::json!({
                    "email": credentials.email(),
                    "password": credentials.password(),
                }),
                None,
            )
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PdfChatError::Auth(provider_error_message(status, &text)).into());
        }

        // Without email confirmation GoTrue answers with a full session;
        // otherwise it returns only the pending user record.
        match serde_json::from_str::<TokenResponse>(&text) {
            Ok(token) => {
                let session = token.into_session(credentials.email());
                tracing::info!(email = %session.email, "Signed up and signed in");
                self.store
                    .publish(SessionEventKind::SignedIn, Some(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            Err(_) => {
                tracing::info!(email = %credentials.email(), "Signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.store.current() else {
            return Ok(());
        };

        match self
            .post("logout", &serde_json::json!({}), Some(&session.access_token))
            .await
        {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "Provider rejected logout");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Logout request failed"),
        }

        tracing::info!(email = %session.email, "Signed out");
        self.store.publish(SessionEventKind::SignedOut, None);
        Ok(())
    }

    async fn session(&self) -> Result<Option<Session>> {
        let Some(current) = self.store.current() else {
            return Ok(None);
        };
        if !current.is_expired() {
            return Ok(Some(current));
        }

        // Serialize refreshes; a concurrent caller may already have done it.
        let _guard = self.refresh_lock.lock().await;
        let Some(current) = self.store.current() else {
            return Ok(None);
        };
        if !current.is_expired() {
            return Ok(Some(current));
        }

        match self.refresh(&current).await {
            Some(refreshed) => {
                tracing::info!(email = %refreshed.email, "Session refreshed");
                self.store
                    .publish(SessionEventKind::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            None => {
                tracing::info!(email = %current.email, "Session expired");
                self.store.publish(SessionEventKind::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.store.subscribe()
    }
}

/// Extract a readable message from a GoTrue error body.
///
/// GoTrue has used several shapes over its versions; the first non-empty of
/// `error_description`, `msg`, `message`, `error` wins.
fn provider_error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
                .find(|s| !s.trim().is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP error! Status: {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_anon_key() {
        let config = AuthConfig {
            url: "http://localhost:54321".to_string(),
            anon_key: "  ".to_string(),
        };
        assert!(SupabaseAuth::new(&config, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_provider_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            provider_error_message(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_provider_error_msg_shape() {
        let body = r#"{"code":422,"msg":"User already registered"}"#;
        assert_eq!(
            provider_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "User already registered"
        );
    }

    #[test]
    fn test_provider_error_non_json_falls_back_to_status() {
        assert_eq!(
            provider_error_message(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            "HTTP error! Status: 502"
        );
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":3600,"expires_at":4102444800,"user":{"email":"x@y.io"}}"#,
        )
        .unwrap();
        let session = token.into_session("fallback@y.io");
        assert_eq!(session.email, "x@y.io");
        assert_eq!(session.expires_at.unwrap().timestamp(), 4102444800);
    }

    #[test]
    fn test_token_response_without_user_uses_fallback_email() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":60}"#).unwrap();
        let session = token.into_session("fallback@y.io");
        assert_eq!(session.email, "fallback@y.io");
        assert!(session.expires_at.is_some());
    }
}
