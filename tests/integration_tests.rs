//! Integration tests for the NoteVault backend.
//!
//! These tests require a running backend HTTP server.
//! Set the TEST_BASE_URL environment variable to specify the server URL.
//!
//! Example:
//! ```sh
//! export TEST_BASE_URL="http://127.0.0.1:8080"
//! cargo test --test integration_tests -- --ignored
//! ```
//!
//! Note: These tests are marked with #[ignore] because they require
//! a running HTTP server. In CI, run them separately with a service container.

#![allow(dead_code)]

use std::env;

use reqwest::Client;
use serde_json::{json, Value};

use notevault_backend::services::payment_service::compute_signature;

/// Test server configuration
struct TestServer {
    base_url: String,
    access_token: String,
    client: Client,
}

impl TestServer {
    fn new() -> Self {
        let base_url = env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".into());
        Self {
            base_url,
            access_token: String::new(),
            client: Client::new(),
        }
    }

    /// Register a throwaway account and keep its access token.
    async fn register(&mut self, email: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}/api/v1/auth/register", self.base_url))
            .json(&json!({
                "email": email,
                "name": "Test User",
                "password": password
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(format!("Registration failed: {} - {}", status, text).into());
        }

        let body: Value = resp.json().await?;
        self.access_token = body["access_token"]
            .as_str()
            .ok_or("No access token")?
            .to_string();
        Ok(())
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<(), Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(format!("Login failed: {} - {}", status, text).into());
        }

        let body: Value = resp.json().await?;
        self.access_token = body["access_token"]
            .as_str()
            .ok_or("No access token")?
            .to_string();
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Pick the id of the first subject in the catalog, walking
    /// courses -> semesters -> subjects.
    async fn first_subject_id(&self) -> Result<String, Box<dyn std::error::Error>> {
        let courses: Value = self
            .client
            .get(format!("{}/api/v1/courses", self.base_url))
            .send()
            .await?
            .json()
            .await?;
        let course_id = courses[0]["id"].as_str().ok_or("No courses seeded")?;

        let semesters: Value = self
            .client
            .get(format!(
                "{}/api/v1/courses/{}/semesters",
                self.base_url, course_id
            ))
            .send()
            .await?
            .json()
            .await?;
        let semester_id = semesters[0]["id"].as_str().ok_or("No semesters seeded")?;

        let subjects: Value = self
            .client
            .get(format!(
                "{}/api/v1/semesters/{}/subjects",
                self.base_url, semester_id
            ))
            .send()
            .await?
            .json()
            .await?;
        let subject_id = subjects[0]["id"].as_str().ok_or("No subjects seeded")?;

        Ok(subject_id.to_string())
    }

    async fn upload_note(
        &self,
        subject_id: &str,
        title: &str,
        content: &[u8],
        premium: bool,
    ) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
        let resp = self
            .client
            .post(format!(
                "{}/api/v1/notes?subject_id={}&title={}&premium={}",
                self.base_url, subject_id, title, premium
            ))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/pdf")
            .body(content.to_vec())
            .send()
            .await?;
        Ok(resp)
    }
}

fn unique_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn unique_email(prefix: &str) -> String {
    format!("{}+{}@example.com", prefix, unique_suffix())
}

#[tokio::test]
#[ignore]
async fn test_health_endpoint() {
    let server = TestServer::new();
    let resp = server
        .client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("Failed to reach server");

    assert!(resp.status().is_success());
    let body: Value = resp.json().await.expect("Invalid health body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let mut server = TestServer::new();
    let email = unique_email("register");

    server
        .register(&email, "s3cret-password")
        .await
        .expect("Registration failed");
    assert!(!server.access_token.is_empty());

    // A fresh account holds the FREE role
    let resp = server
        .client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .header("Authorization", server.auth_header())
        .send()
        .await
        .expect("Failed to fetch /me");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.expect("Invalid /me body");
    assert_eq!(body["email"], email);
    assert_eq!(body["role"], "free");

    // Login again with the same credentials
    server
        .login(&email, "s3cret-password")
        .await
        .expect("Login failed");
}

#[tokio::test]
#[ignore]
async fn test_login_rejects_bad_password() {
    let mut server = TestServer::new();
    let email = unique_email("badpass");

    server
        .register(&email, "correct-password")
        .await
        .expect("Registration failed");

    let resp = server
        .client
        .post(format!("{}/api/v1/auth/login", server.base_url))
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_upload_conflicts() {
    let mut server = TestServer::new();
    server
        .register(&unique_email("dup"), "s3cret-password")
        .await
        .expect("Registration failed");

    let subject_id = server.first_subject_id().await.expect("No catalog data");

    // Unique per run so re-running the suite does not trip on old rows
    let content = format!("dup-test-{}", unique_email("payload")).into_bytes();

    let first = server
        .upload_note(&subject_id, "dup-a", &content, false)
        .await
        .expect("Upload failed");
    assert_eq!(first.status(), 201);

    // Identical bytes under a different title still conflict
    let second = server
        .upload_note(&subject_id, "dup-b", &content, false)
        .await
        .expect("Upload failed");
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.expect("Invalid conflict body");
    assert_eq!(body["is_duplicate"], true);
    assert!(body["existing_note_id"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_upload_requires_auth() {
    let server = TestServer::new();
    let subject_id = server.first_subject_id().await.expect("No catalog data");

    let resp = server
        .client
        .post(format!(
            "{}/api/v1/notes?subject_id={}&title=anon",
            server.base_url, subject_id
        ))
        .body(b"anonymous upload".to_vec())
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unknown_note_download_is_404() {
    let server = TestServer::new();
    let resp = server
        .client
        .get(format!(
            "{}/api/v1/notes/{}/download",
            server.base_url,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_catalog_is_public() {
    let server = TestServer::new();
    let resp = server
        .client
        .get(format!("{}/api/v1/courses", server.base_url))
        .send()
        .await
        .expect("Request failed");
    assert!(resp.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_payment_order_requires_auth() {
    let server = TestServer::new();
    let resp = server
        .client
        .post(format!("{}/api/v1/payments/orders", server.base_url))
        .json(&json!({ "amount": 199 }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_verify_unknown_order_is_404() {
    let server = TestServer::new();
    let resp = server
        .client
        .post(format!("{}/api/v1/payments/verify", server.base_url))
        .json(&json!({
            "order_id": "order_does_not_exist",
            "payment_id": "pay_x",
            "signature": "00"
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 404);
}

/// Re-verifying an already-verified order must succeed without re-running
/// the promotion. Needs `TEST_GATEWAY_KEY_SECRET` set to the same value as
/// the server's `GATEWAY_KEY_SECRET` so a valid signature can be computed.
#[tokio::test]
#[ignore]
async fn test_payment_verification_is_idempotent() {
    let secret = env::var("TEST_GATEWAY_KEY_SECRET")
        .expect("TEST_GATEWAY_KEY_SECRET must match the server's GATEWAY_KEY_SECRET");

    let mut server = TestServer::new();
    server
        .register(&unique_email("idem"), "s3cret-password")
        .await
        .expect("Registration failed");

    // UPI orders go straight into the ledger without a gateway call
    let order_id = format!("order_idem_{}", unique_suffix());
    let resp = server
        .client
        .post(format!("{}/api/v1/payments/upi/orders", server.base_url))
        .header("Authorization", server.auth_header())
        .json(&json!({
            "order_id": order_id,
            "amount": 199,
            "phone": "9999999999"
        }))
        .send()
        .await
        .expect("Order creation failed");
    assert_eq!(resp.status(), 201);

    let signature = compute_signature(&order_id, "pay_idem_1", &secret);

    for pass in 1..=2 {
        let resp = server
            .client
            .post(format!("{}/api/v1/payments/verify", server.base_url))
            .json(&json!({
                "order_id": order_id,
                "payment_id": "pay_idem_1",
                "signature": signature
            }))
            .send()
            .await
            .expect("Verify request failed");
        assert!(resp.status().is_success(), "verify pass {} failed", pass);
        let body: Value = resp.json().await.expect("Invalid verify body");
        assert_eq!(body["status"], "success", "verify pass {}", pass);
    }

    // Promoted exactly once; still PRO after the second pass
    let me: Value = server
        .client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .header("Authorization", server.auth_header())
        .send()
        .await
        .expect("Failed to fetch /me")
        .json()
        .await
        .expect("Invalid /me body");
    assert_eq!(me["role"], "pro");
}

#[tokio::test]
#[ignore]
async fn test_download_records_bookkeeping() {
    let mut server = TestServer::new();
    server
        .register(&unique_email("dl"), "s3cret-password")
        .await
        .expect("Registration failed");

    let subject_id = server.first_subject_id().await.expect("No catalog data");
    let content = format!("dl-test-{}", unique_suffix()).into_bytes();

    let upload = server
        .upload_note(&subject_id, "dl-note", &content, false)
        .await
        .expect("Upload failed");
    assert_eq!(upload.status(), 201);
    let note: Value = upload.json().await.expect("Invalid upload body");
    let note_id = note["id"].as_str().expect("No note id").to_string();

    // The uploader can download their own pending note
    let dl = server
        .client
        .get(format!(
            "{}/api/v1/notes/{}/download",
            server.base_url, note_id
        ))
        .header("Authorization", server.auth_header())
        .send()
        .await
        .expect("Download failed");
    assert_eq!(dl.status(), 200);
    assert!(dl.headers()["content-disposition"]
        .to_str()
        .expect("Bad header")
        .contains("attachment"));
    let bytes = dl.bytes().await.expect("No body");
    assert_eq!(bytes.as_ref(), content.as_slice());

    // The download was recorded against the note
    let meta: Value = server
        .client
        .get(format!("{}/api/v1/notes/{}", server.base_url, note_id))
        .header("Authorization", server.auth_header())
        .send()
        .await
        .expect("Metadata fetch failed")
        .json()
        .await
        .expect("Invalid metadata body");
    assert_eq!(meta["download_count"], 1);
}

#[tokio::test]
#[ignore]
async fn test_user_admin_requires_admin_role() {
    let mut server = TestServer::new();
    server
        .register(&unique_email("nonadmin"), "s3cret-password")
        .await
        .expect("Registration failed");

    let resp = server
        .client
        .get(format!("{}/api/v1/users", server.base_url))
        .header("Authorization", server.auth_header())
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_security_headers_present() {
    let server = TestServer::new();
    let resp = server
        .client
        .get(format!("{}/api/v1/courses", server.base_url))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
}
