//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` control the session instead of being sent as
//! questions:
//! - Sign in, sign up, and sign out
//! - Upload a PDF
//! - View session status
//! - Display help information
//! - Exit the session
//!
//! Command names are case-insensitive; arguments (emails, paths) keep
//! their case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Sign in; the email is prompted for when not given
    Login(Option<String>),

    /// Register a new account; the email is prompted for when not given
    Signup(Option<String>),

    /// Sign out and reset the chat
    Logout,

    /// Upload a PDF; `None` means no file was given
    Upload(Option<PathBuf>),

    /// Display session status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; the input is a question
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is
/// not a known command, and `CommandError::UnsupportedArgument` when a
/// command that takes no argument is given one.
///
/// # Examples
///
/// ```
/// use pdfchat::commands::special_commands::{parse_special_command, SpecialCommand};
/// use std::path::PathBuf;
///
/// let cmd = parse_special_command("/upload ~/Papers/Attention.pdf").unwrap();
/// assert_eq!(cmd, SpecialCommand::Upload(Some(PathBuf::from("~/Papers/Attention.pdf"))));
///
/// let cmd = parse_special_command("What is the abstract about?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), non_empty(rest)),
        None => (lower.clone(), None),
    };

    let no_arg = |command: SpecialCommand| match &arg {
        Some(extra) => Err(CommandError::UnsupportedArgument {
            command: name.clone(),
            arg: extra.clone(),
        }),
        None => Ok(command),
    };

    match name.as_str() {
        "/login" | "/signin" => Ok(SpecialCommand::Login(arg.clone())),
        "/signup" | "/register" => Ok(SpecialCommand::Signup(arg.clone())),
        "/logout" | "/signout" => no_arg(SpecialCommand::Logout),
        "/upload" => Ok(SpecialCommand::Upload(arg.clone().map(PathBuf::from))),
        "/status" => no_arg(SpecialCommand::ShowStatus),
        "/help" | "/?" => no_arg(SpecialCommand::Help),
        "/exit" | "/quit" => no_arg(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(name.clone())),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

ACCOUNT:
  /login [email]    - Sign in (prompts for anything not given)
  /signup [email]   - Register a new account
  /logout           - Sign out and clear the chat

DOCUMENTS:
  /upload <path>    - Upload a PDF; questions are answered from it

SESSION INFORMATION:
  /status           - Show who is signed in and which document is loaded
  /help             - Show this help message
  /?                - Same as /help

SESSION CONTROL:
  exit              - Exit interactive mode
  quit              - Same as exit

NOTES:
  - Command names are case-insensitive
  - Any other line is sent as a question about the loaded document
  - Uploading a new PDF clears the conversation
"#
    );
}
