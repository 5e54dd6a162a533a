//! Test helpers for Web API integration tests.
//!
//! Builds the real router over an in-memory database, with a notification sink
//! that records issued codes and a scripted text generator.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use serde_json::{json, Value};

use prepboard::assistant::{Assistant, AssistantError, TextGenerator};
use prepboard::db::CodePurpose;
use prepboard::notify::{NotificationSink, NotifyError};
use prepboard::{Config, Database, WebServer};

/// Administrator address configured for tests.
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Password used for every test account.
pub const PASSWORD: &str = "password123";

/// Sink that keeps every issued code in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, CodePurpose)>>,
}

impl RecordingNotifier {
    /// Most recent code sent to an address.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _, _)| to.eq_ignore_ascii_case(email))
            .map(|(_, code, _)| code.clone())
    }

    /// Number of codes sent so far.
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send_code(
        &self,
        email: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string(), purpose));
        Ok(())
    }
}

/// Generator that replays canned answers and fails once they run out.
#[derive(Default)]
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<Result<String, AssistantError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(answers: Vec<Result<String, AssistantError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AssistantError::Status(503)))
    }
}

/// Configuration used by every test app.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.auth_rate_limit = 1000;
    config.server.api_rate_limit = 1000;
    config.auth.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.auth.admin_email = ADMIN_EMAIL.to_string();
    config.assistant.question_count = 3;
    config
}

/// Router under test plus handles on its collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub notifier: Arc<RecordingNotifier>,
    pub generator: Arc<ScriptedGenerator>,
}

impl TestApp {
    /// App with a generator that always fails.
    pub async fn new() -> Self {
        Self::with_config_and_answers(test_config(), vec![]).await
    }

    /// App whose generator replays `answers`.
    pub async fn with_answers(answers: Vec<Result<String, AssistantError>>) -> Self {
        Self::with_config_and_answers(test_config(), answers).await
    }

    pub async fn with_config_and_answers(
        config: Config,
        answers: Vec<Result<String, AssistantError>>,
    ) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let notifier = Arc::new(RecordingNotifier::default());
        let generator = Arc::new(ScriptedGenerator::new(answers));
        let assistant = Assistant::new(
            generator.clone(),
            Duration::from_secs(5),
            config.assistant.question_count,
        );

        let web = WebServer::new(config, db.clone(), notifier.clone(), assistant)
            .expect("Failed to create web server");
        let server = TestServer::new(web.router()).expect("Failed to create test server");

        Self {
            server,
            db,
            notifier,
            generator,
        }
    }

    /// Run the full signup flow.
    pub async fn signup(&self, name: &str, email: &str) {
        self.server
            .post("/api/auth/signup/request-code")
            .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
            .await
            .assert_status_ok();

        let code = self
            .notifier
            .last_code_for(email)
            .expect("no code was sent");

        self.server
            .post("/api/auth/signup/confirm-code")
            .json(&json!({ "email": email, "code": code }))
            .await
            .assert_status_ok();
    }

    /// Log in and return the session token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token missing")
            .to_string()
    }

    /// Sign up and log in, returning the session token.
    pub async fn member(&self, name: &str, email: &str) -> String {
        self.signup(name, email).await;
        self.login(email).await
    }

    /// Sign up and log in as the configured admin.
    pub async fn admin(&self) -> String {
        self.member("Admin", ADMIN_EMAIL).await
    }

    /// Create a submission as `token` and return its id.
    pub async fn create_submission(&self, token: &str, name: &str) -> i64 {
        let response = self
            .server
            .post("/api/submissions")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({
                "name": name,
                "rounds": [{ "title": "R1", "notes": "x", "result": "pending" }]
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["submission"]["id"]
            .as_i64()
            .expect("id missing")
    }
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
