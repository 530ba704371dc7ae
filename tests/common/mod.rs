use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use pdfchat::auth::{AuthGateway, Credentials, FakeAuthGateway};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn temp_pdf(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let pdf_path = temp_dir.path().join(name);
    fs::write(&pdf_path, b"%PDF-1.4\n%test document\n").expect("failed to write pdf");
    (temp_dir, pdf_path)
}

/// Gateway that already holds a session whose access token is `fake-token-1`
#[allow(dead_code)]
pub async fn signed_in_gateway() -> Arc<FakeAuthGateway> {
    let auth = Arc::new(FakeAuthGateway::with_account("ada@example.com", "hunter22"));
    auth.sign_in(&Credentials::new("ada@example.com", "hunter22").expect("valid credentials"))
        .await
        .expect("sign in should succeed");
    auth
}
