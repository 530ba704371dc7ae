//! PdfChat - terminal client for a PDF question-answering service
//!
//! This library provides the client side of a document chat service: sign
//! in against the identity provider, upload a PDF to the backend, and ask
//! questions about it.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Credentials validation, identity gateway, and session notifications
//! - `api`: Backend client for document upload and chat
//! - `upload`: Upload controller and its status line
//! - `session`: Chat state machine and transcript
//! - `app`: Wiring of the gateway, API, and controllers for one run
//! - `commands`: Command handlers used by the binary
//! - `config`: Configuration management and validation
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use pdfchat::api::ApiClient;
//! use pdfchat::auth::{AuthGateway, SupabaseAuth};
//! use pdfchat::ChatApp;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = pdfchat::Config::default();
//!     let auth: Arc<dyn AuthGateway> =
//!         Arc::new(SupabaseAuth::new(&config.auth, Duration::from_secs(30))?);
//!     let api = Arc::new(ApiClient::new(&config.api, auth.clone())?);
//!
//!     let mut app = ChatApp::new(auth, api, "Thinking...");
//!     app.login("ada@example.com", "hunter22").await?;
//!     app.upload(Some(std::path::Path::new("paper.pdf"))).await?;
//!     app.ask("What is the main result?").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use app::ChatApp;
pub use config::Config;
pub use error::{PdfChatError, Result};
pub use session::{ChatController, Phase};
pub use upload::UploadController;
