//! Command-line interface definition for PdfChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions,
//! registration, and a backend health check.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PdfChat - ask questions about your PDF documents
///
/// Sign in, upload a PDF to the document service, and chat with it.
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for PdfChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Sign in, upload one PDF, ask one question, print the answer
    Ask {
        /// PDF file to upload
        #[arg(short, long)]
        file: PathBuf,

        /// Question to ask about the document
        #[arg(short, long)]
        question: String,

        /// Account email
        #[arg(long, env = "PDFCHAT_EMAIL")]
        email: String,

        /// Account password
        #[arg(long, env = "PDFCHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Register a new account
    Signup {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (at least 6 characters)
        #[arg(long)]
        password: String,
    },

    /// Check that the document backend is reachable
    Health,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
