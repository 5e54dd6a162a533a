//! Concurrency tests for prepboard.
//!
//! Confirmations racing for the same one-time code must not both succeed:
//! consumption and the dependent write share one transaction. These run on a
//! file-backed database so the pool hands out several connections at once.

use std::sync::Arc;

use tempfile::TempDir;

use prepboard::auth::{hash_password, VerificationError, VerificationService};
use prepboard::config::AuthConfig;
use prepboard::db::{
    unix_now, CodePayload, NewOneTimeCode, NewUser, OneTimeCodeRepository, UserRepository,
};
use prepboard::{Database, LogNotifier};

const ROUNDS: usize = 10;
const RACERS: usize = 3;

/// Open a file-backed database; the TempDir must outlive it.
async fn setup_test_db() -> (TempDir, Arc<Database>) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("race.db")).await.unwrap();
    (dir, Arc::new(db))
}

async fn seed_code(db: &Database, email: &str, code: &str, payload: CodePayload) {
    OneTimeCodeRepository::new(db.pool())
        .create(&NewOneTimeCode {
            email: email.to_string(),
            code: code.to_string(),
            payload,
            expires_at: unix_now() + 600,
        })
        .await
        .unwrap();
}

fn auth_config() -> Arc<AuthConfig> {
    Arc::new(AuthConfig {
        jwt_secret: "test-secret".to_string(),
        ..AuthConfig::default()
    })
}

/// Concurrent password resets with one code: exactly one wins per round.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reset_consumes_code_once() {
    let (_dir, db) = setup_test_db().await;
    let config = auth_config();
    let notifier = Arc::new(LogNotifier);
    let hash = hash_password("password123").unwrap();

    for round in 0..ROUNDS {
        let email = format!("racer{round}@example.com");
        let code = format!("{}", 400000 + round);
        UserRepository::new(db.pool())
            .create(&NewUser::new("Racer", email.as_str(), hash.as_str()))
            .await
            .unwrap();
        seed_code(&db, &email, &code, CodePayload::Reset).await;

        let mut handles = Vec::new();
        for racer in 0..RACERS {
            let db = Arc::clone(&db);
            let config = Arc::clone(&config);
            let notifier = Arc::clone(&notifier);
            let email = email.clone();
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                VerificationService::new(&db, &config, notifier.as_ref())
                    .confirm_password_reset(&email, &code, &format!("newpass{racer}x"))
                    .await
            }));
        }

        let mut successes = 0;
        let mut invalid = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(VerificationError::InvalidCode) => invalid += 1,
                Err(e) => panic!("round {round}: unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 1, "round {round}");
        assert_eq!(invalid, RACERS - 1, "round {round}");
        assert_eq!(
            OneTimeCodeRepository::new(db.pool())
                .count_for_email(&email)
                .await
                .unwrap(),
            0
        );
    }
}

/// Concurrent signup confirmations with one code create one identity per round.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signup_creates_one_user() {
    let (_dir, db) = setup_test_db().await;
    let config = auth_config();
    let notifier = Arc::new(LogNotifier);
    let hash = hash_password("password123").unwrap();

    for round in 0..ROUNDS {
        let email = format!("signup{round}@example.com");
        let code = format!("{}", 500000 + round);
        seed_code(
            &db,
            &email,
            &code,
            CodePayload::Signup {
                name: "Racer".to_string(),
                password_hash: hash.clone(),
            },
        )
        .await;

        let mut handles = Vec::new();
        for _ in 0..RACERS {
            let db = Arc::clone(&db);
            let config = Arc::clone(&config);
            let notifier = Arc::clone(&notifier);
            let email = email.clone();
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                VerificationService::new(&db, &config, notifier.as_ref())
                    .confirm_signup(&email, &code)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(user) => {
                    assert_eq!(user.email, email);
                    successes += 1;
                }
                Err(VerificationError::InvalidCode) => {}
                Err(e) => panic!("round {round}: unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 1, "round {round}");
    }

    assert_eq!(
        UserRepository::new(db.pool()).count().await.unwrap(),
        ROUNDS as i64
    );
}
