//! Local credential validation
//!
//! Rejects malformed sign-in and sign-up input before any request is made.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{PdfChatError, Result};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .unwrap_or_else(|e| unreachable!("static email pattern is valid: {e}"))
    })
}

/// Email and password that passed local validation.
///
/// The only way to obtain one is [`Credentials::new`], so every
/// [`AuthGateway`](super::AuthGateway) call receives well-formed input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Validate raw form input
    ///
    /// Both fields are trimmed first. Checks run in order: presence, email
    /// shape, password length; the first failure wins.
    ///
    /// # Errors
    ///
    /// Returns `PdfChatError::Validation` with a user-facing message.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfchat::auth::Credentials;
    ///
    /// assert!(Credentials::new("ada@example.com", "hunter22").is_ok());
    /// assert!(Credentials::new("ada@example", "hunter22").is_err());
    /// assert!(Credentials::new("ada@example.com", "short").is_err());
    /// ```
    pub fn new(email: &str, password: &str) -> Result<Self> {
        let email = email.trim();
        let password = password.trim();

        if email.is_empty() || password.is_empty() {
            return Err(PdfChatError::Validation(
                "Please enter both email and password.".to_string(),
            )
            .into());
        }

        if !email_regex().is_match(email) {
            return Err(PdfChatError::Validation("Invalid email format.".to_string()).into());
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PdfChatError::Validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            ))
            .into());
        }

        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
