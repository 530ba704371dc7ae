/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`: Interactive chat session
- `ask`: One-shot sign in, upload, and question
- `signup`: Account registration
- `health`: Backend reachability check

Handlers are thin: they build the gateway and API client from
configuration, drive a [`ChatApp`], and print what it reports.
*/

use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::app::{auth_failure_message, ChatApp};
use crate::auth::{AuthGateway, SupabaseAuth};
use crate::config::Config;
use crate::error::{user_message, PdfChatError, Result};
use crate::session::{ChatMessage, MessageStatus, Sender};
use crate::upload::{StatusKind, UploadStatus};

// Special commands parser for the interactive session
pub mod special_commands;

/// Build the identity gateway and backend client from configuration
fn connect(config: &Config) -> Result<(Arc<dyn AuthGateway>, Arc<ApiClient>)> {
    let timeout = Duration::from_secs(config.api.timeout_seconds);
    let auth: Arc<dyn AuthGateway> = Arc::new(SupabaseAuth::new(&config.auth, timeout)?);
    let api = Arc::new(ApiClient::new(&config.api, auth.clone())?);
    Ok((auth, api))
}

/// Format a transcript entry for the terminal
pub fn render_message(message: &ChatMessage) -> String {
    let text = match message.status {
        MessageStatus::Normal => message.text.normal(),
        MessageStatus::Thinking => message.text.dimmed().italic(),
        MessageStatus::Error => message.text.red(),
    };
    match message.sender {
        Sender::User => format!("{} {}", "you>".bold().blue(), text),
        Sender::Bot => format!("{} {}", "bot>".bold().magenta(), text),
    }
}

/// Format an upload status line for the terminal
pub fn render_upload_status(status: &UploadStatus) -> String {
    match status.kind {
        StatusKind::Loading => status.text.yellow().to_string(),
        StatusKind::Success => status.text.green().to_string(),
        StatusKind::Error => status.text.red().to_string(),
    }
}

// Interactive chat handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop over a [`ChatApp`]. Slash commands manage the
    //! account and document; any other line is a question.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::session::Phase;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::path::PathBuf;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let (auth, api) = connect(&config)?;
        let mut app = ChatApp::new(auth, api, config.chat.thinking_text.clone());
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&app);

        loop {
            let prompt = format!("{} >> ", app.chat().phase().colored_tag());
            let line = match rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted. Type 'exit' to quit.");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let command = match parse_special_command(trimmed) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}\n", e.to_string().red());
                    continue;
                }
            };

            match command {
                SpecialCommand::Login(email) => {
                    let Some((email, password)) = prompt_credentials(&mut rl, email)? else {
                        continue;
                    };
                    match app.login(&email, &password).await {
                        Ok(greeting) => println!("{}\n", greeting.green()),
                        Err(e) => println!("{}\n", auth_failure_message("Login", &e).red()),
                    }
                    print_phase_hint(&app);
                }
                SpecialCommand::Signup(email) => {
                    let Some((email, password)) = prompt_credentials(&mut rl, email)? else {
                        continue;
                    };
                    match app.signup(&email, &password).await {
                        Ok(message) => println!("{}\n", message.green()),
                        Err(e) => println!("{}\n", auth_failure_message("Signup", &e).red()),
                    }
                }
                SpecialCommand::Logout => {
                    if let Err(e) = app.logout().await {
                        println!("{}\n", user_message(&e).red());
                    }
                    print_transcript(&app);
                }
                SpecialCommand::Upload(path) => {
                    let path = path.map(expand_home);
                    if let Some(path) = &path {
                        let notice = format!("Uploading and processing: {}...", path.display());
                        println!("{}", notice.yellow());
                    }
                    let result = app.upload(path.as_deref()).await;
                    if let Some(status) = app.uploader().status() {
                        println!("{}", render_upload_status(status));
                    }
                    if result.is_ok() {
                        print_transcript(&app);
                    } else {
                        println!();
                    }
                }
                SpecialCommand::ShowStatus => print_status_display(&app),
                SpecialCommand::Help => print_help(),
                SpecialCommand::Exit => break,
                SpecialCommand::None => {
                    rl.add_history_entry(trimmed)?;
                    let before = app.chat().phase();
                    let shown = app.chat().messages().len();
                    let outcome = app
                        .ask_with(trimmed, |thinking| println!("{}", render_message(thinking)))
                        .await;
                    match outcome {
                        Ok(_) => {
                            if let Some(last) = app.chat().messages().last() {
                                println!("{}\n", render_message(last));
                            }
                        }
                        // Rejected locally; the controller may have posted an inline error.
                        Err(e) if app.chat().messages().len() > shown => {
                            tracing::debug!(error = %e, "Question rejected");
                            if let Some(last) = app.chat().messages().last() {
                                println!("{}\n", render_message(last));
                            }
                        }
                        Err(e) => println!("{}\n", user_message(&e).red()),
                    }
                    // The session may have expired while the question was out.
                    if app.sync_session().is_some() && app.chat().phase() != before {
                        println!("{}\n", "Your session has ended. Please /login again.".yellow());
                    }
                }
            }
        }

        println!("Goodbye!");
        app.shutdown();
        Ok(())
    }

    /// Ask for whatever part of the credentials was not given inline
    ///
    /// Returns `None` when the user aborts a prompt (Ctrl-C / Ctrl-D) or
    /// leaves it empty.
    fn prompt_credentials(
        rl: &mut DefaultEditor,
        email: Option<String>,
    ) -> Result<Option<(String, String)>> {
        let email = match email {
            Some(email) => email,
            None => match read_field(rl, "Email: ")? {
                Some(email) => email,
                None => return Ok(None),
            },
        };
        // Password prompts are not added to history.
        let Some(password) = read_field(rl, "Password: ")? else {
            return Ok(None);
        };
        Ok(Some((email, password)))
    }

    fn read_field(rl: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
        match rl.readline(prompt) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn expand_home(path: PathBuf) -> PathBuf {
        match (path.strip_prefix("~"), std::env::var_os("HOME")) {
            (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => path,
        }
    }

    fn print_transcript(app: &ChatApp) {
        for message in app.chat().messages() {
            println!("{}", render_message(message));
        }
        println!();
    }

    fn print_phase_hint(app: &ChatApp) {
        if app.chat().phase() != Phase::Unauthenticated {
            print_transcript(app);
        }
    }

    /// Display welcome banner
    fn print_welcome_banner(app: &ChatApp) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            PdfChat Interactive Session - Welcome!            ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "State: {} ({})\n",
            app.chat().phase().colored_tag(),
            app.chat().phase().description()
        );
        println!("Type '/help' for available commands, 'exit' to quit\n");
        print_transcript(app);
    }

    /// Display detailed status information about the current session
    fn print_status_display(app: &ChatApp) {
        let chat = app.chat();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     PdfChat Session Status                   ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "State:        {} ({})",
            chat.phase().colored_tag(),
            chat.phase().description()
        );
        println!("User:         {}", chat.user_email().unwrap_or("-"));
        println!(
            "Document:     {}",
            chat.document_id().map(|d| d.as_str()).unwrap_or("-")
        );
        println!(
            "Chat input:   {}",
            if chat.chat_enabled() {
                "enabled".green()
            } else {
                "disabled".red()
            }
        );
        println!("Transcript:   {} messages", chat.messages().len());
        if let Some(status) = app.uploader().status() {
            println!("Last upload:  {}", render_upload_status(status));
        }
        println!();
    }
}

// One-shot question handler
pub mod ask {
    //! Non-interactive flow: sign in, upload one PDF, ask one question.

    use super::*;
    use crate::session::AskOutcome;
    use std::path::Path;

    /// Run the one-shot flow and print the answer on stdout
    ///
    /// # Errors
    ///
    /// Any failure along the way, including a backend error for the
    /// question itself.
    pub async fn run_ask(
        config: Config,
        file: &Path,
        question: &str,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let (auth, api) = connect(&config)?;
        let app = ChatApp::new(auth, api, config.chat.thinking_text.clone());
        let answer = ask_once(app, email, password, file, question).await?;
        println!("{}", answer);
        Ok(())
    }

    /// Sign in, upload `file`, ask `question`, and return the answer
    ///
    /// Once sign-in has succeeded the session is signed out again on every
    /// path, including failed uploads and failed questions.
    pub async fn ask_once(
        mut app: ChatApp,
        email: &str,
        password: &str,
        file: &Path,
        question: &str,
    ) -> Result<String> {
        app.login(email, password)
            .await
            .map_err(|e| PdfChatError::Auth(auth_failure_message("Login", &e)))?;

        let result = upload_and_ask(&mut app, file, question).await;
        if let Err(e) = app.logout().await {
            tracing::warn!(error = %e, "Sign-out after one-shot question failed");
        }
        app.shutdown();
        result
    }

    async fn upload_and_ask(app: &mut ChatApp, file: &Path, question: &str) -> Result<String> {
        let document_id = app.upload(Some(file)).await?;
        tracing::info!(document_id = %document_id, "Document ready");

        let outcome = app.ask(question).await?;
        let last = app.chat().messages().last().map(|m| m.text.clone());

        match (outcome, last) {
            (AskOutcome::Answered, Some(answer)) => Ok(answer),
            (AskOutcome::Ignored, _) => Err(PdfChatError::Validation(
                "Question cannot be empty.".to_string(),
            )
            .into()),
            (_, last) => {
                let message = last
                    .as_deref()
                    .map(|text| text.strip_prefix("Error: ").unwrap_or(text).to_string())
                    .unwrap_or_else(|| "No answer received".to_string());
                Err(PdfChatError::Chat { message }.into())
            }
        }
    }
}

// Registration handler
pub mod signup {
    //! Account registration from the command line.

    use super::*;

    pub async fn run_signup(config: Config, email: &str, password: &str) -> Result<()> {
        let (auth, api) = connect(&config)?;
        let mut app = ChatApp::new(auth, api, config.chat.thinking_text.clone());
        let message = app
            .signup(email, password)
            .await
            .map_err(|e| PdfChatError::Auth(auth_failure_message("Signup", &e)))?;
        println!("{}", message);
        app.shutdown();
        Ok(())
    }
}

// Health check handler
pub mod health {
    //! Backend reachability check.

    use super::*;
    use crate::api::check_health;

    /// Check `GET /` on the configured backend
    ///
    /// Needs no account; the identity provider is not contacted.
    pub async fn run_health(config: Config) -> Result<()> {
        check_health(&config.api).await?;
        println!("Backend at {} is healthy", config.api.base_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message_includes_sender_and_text() {
        colored::control::set_override(false);
        let message = ChatMessage {
            sender: Sender::Bot,
            text: "Error: boom".to_string(),
            status: MessageStatus::Error,
        };
        assert_eq!(render_message(&message), "bot> Error: boom");
    }

    #[test]
    fn test_render_upload_status_plain() {
        colored::control::set_override(false);
        let status = UploadStatus {
            kind: StatusKind::Success,
            text: "File processed successfully! You can now ask questions.".to_string(),
        };
        assert_eq!(
            render_upload_status(&status),
            "File processed successfully! You can now ask questions."
        );
    }

    mod one_shot {
        use super::super::ask::ask_once;
        use crate::api::FakeDocumentApi;
        use crate::auth::FakeAuthGateway;
        use crate::error::error_kind;
        use crate::PdfChatError;
        use crate::ChatApp;
        use std::path::Path;
        use std::sync::Arc;

        fn app(auth: &Arc<FakeAuthGateway>, api: &Arc<FakeDocumentApi>) -> ChatApp {
            ChatApp::new(auth.clone(), api.clone(), "Thinking...")
        }

        #[tokio::test]
        async fn test_ask_once_returns_answer_and_signs_out() {
            let auth = Arc::new(FakeAuthGateway::with_account("ada@example.com", "hunter22"));
            let api = Arc::new(FakeDocumentApi::new());
            let dir = tempfile::tempdir().unwrap();
            let pdf = dir.path().join("paper.pdf");
            std::fs::write(&pdf, b"%PDF-1.4").unwrap();

            let answer = ask_once(app(&auth, &api), "ada@example.com", "hunter22", &pdf, "why?")
                .await
                .unwrap();
            assert_eq!(answer, "answer: why?");
            assert_eq!(auth.sign_out_calls(), 1);
        }

        #[tokio::test]
        async fn test_ask_once_signs_out_after_failed_upload() {
            let auth = Arc::new(FakeAuthGateway::with_account("ada@example.com", "hunter22"));
            let api = Arc::new(FakeDocumentApi::new());

            let err = ask_once(
                app(&auth, &api),
                "ada@example.com",
                "hunter22",
                Path::new("/nonexistent/paper.pdf"),
                "why?",
            )
            .await
            .unwrap_err();
            assert!(matches!(error_kind(&err), Some(PdfChatError::Validation(_))));
            assert_eq!(auth.sign_out_calls(), 1);
        }

        #[tokio::test]
        async fn test_ask_once_signs_out_after_failed_question() {
            let auth = Arc::new(FakeAuthGateway::with_account("ada@example.com", "hunter22"));
            let api = Arc::new(FakeDocumentApi::new());
            api.push_answer(Err(PdfChatError::Chat {
                message: "Document not found".to_string(),
            }
            .into()));
            let dir = tempfile::tempdir().unwrap();
            let pdf = dir.path().join("paper.pdf");
            std::fs::write(&pdf, b"%PDF-1.4").unwrap();

            let err = ask_once(app(&auth, &api), "ada@example.com", "hunter22", &pdf, "why?")
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Document not found");
            assert_eq!(auth.sign_out_calls(), 1);
        }

        #[tokio::test]
        async fn test_ask_once_failed_login_skips_sign_out() {
            let auth = Arc::new(FakeAuthGateway::with_account("ada@example.com", "hunter22"));
            let api = Arc::new(FakeDocumentApi::new());

            let err = ask_once(
                app(&auth, &api),
                "ada@example.com",
                "wrongpass",
                Path::new("paper.pdf"),
                "why?",
            )
            .await
            .unwrap_err();
            assert_eq!(err.to_string(), "Login failed: Invalid login credentials");
            assert_eq!(auth.sign_out_calls(), 0);
            assert_eq!(api.call_count(), 0);
        }
    }

    #[test]
    fn test_connect_requires_anon_key() {
        let config = Config::default();
        assert!(connect(&config).is_err());
    }
}
