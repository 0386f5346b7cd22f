//! End-to-end flows through the engine with in-memory collaborators.

use anyhow::Result;
use chrono::{Duration, Utc};
use secrecy::SecretString;
use std::sync::Arc;

use gardisto::{
    AccountSecurityEngine, AuthError, BcryptHasher, Credentials, InMemoryRepository, ManualClock,
    Notification, RecordingTransport, Repository, SecurityConfig,
};

struct Harness {
    engine: AccountSecurityEngine,
    clock: Arc<ManualClock>,
    transport: Arc<RecordingTransport>,
    repository: Arc<InMemoryRepository>,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let repository = Arc::new(InMemoryRepository::new());
    let transport = Arc::new(RecordingTransport::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = AccountSecurityEngine::new(
        repository.clone(),
        transport.clone(),
        clock.clone(),
        Arc::new(BcryptHasher::new().with_cost(4)),
        SecurityConfig::new(),
    );
    Harness {
        engine,
        clock,
        transport,
        repository,
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn register_confirm_authenticate_scenario() -> Result<()> {
    let harness = harness();

    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account
        .confirmation
        .token
        .clone()
        .expect("confirmation token")
        .value;

    // Authentication is gated until the email is confirmed.
    let blocked = harness
        .engine
        .authenticate(&Credentials::new("a@b.com", "p1"))
        .await;
    assert!(matches!(blocked, Err(AuthError::AccountNotConfirmed)));

    let confirmed = harness.engine.confirm(&token).await?;
    assert!(confirmed.confirmed());

    let authenticated = harness
        .engine
        .authenticate(&Credentials::new("a@b.com", "p1"))
        .await?;
    assert_eq!(authenticated.id, account.id);
    // Tracking is a separate explicit step; login alone does not bump it.
    assert_eq!(authenticated.tracking.sign_in_count, 0);
    Ok(())
}

#[tokio::test]
async fn lock_threshold_and_unlock_scenario() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    // Four wrong attempts leave the account authenticatable.
    let wrong = Credentials::new("a@b.com", "wrong");
    for _ in 0..4 {
        assert!(matches!(
            harness.engine.authenticate(&wrong).await,
            Err(AuthError::IncorrectCredentials)
        ));
    }
    harness
        .engine
        .authenticate(&Credentials::new("a@b.com", "p1"))
        .await?;

    // Five consecutive wrong attempts lock; the fifth reports the lock.
    for _ in 0..4 {
        let _ = harness.engine.authenticate(&wrong).await;
    }
    assert!(matches!(
        harness.engine.authenticate(&wrong).await,
        Err(AuthError::AccountLocked { resent: true })
    ));

    // Even the correct password is refused while locked.
    assert!(matches!(
        harness
            .engine
            .authenticate(&Credentials::new("a@b.com", "p1"))
            .await,
        Err(AuthError::AccountLocked { resent: false })
    ));

    let locked = harness
        .repository
        .find_by_email("a@b.com")
        .await?
        .expect("account exists");
    let unlock_token = locked.lock.unlock_token.expect("unlock token").value;
    harness.engine.unlock(&unlock_token).await?;
    harness
        .engine
        .authenticate(&Credentials::new("a@b.com", "p1"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn expired_unlock_token_is_resent_on_next_attempt() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    let wrong = Credentials::new("a@b.com", "wrong");
    for _ in 0..5 {
        let _ = harness.engine.authenticate(&wrong).await;
    }

    harness.clock.advance(Duration::days(4));
    assert!(matches!(
        harness
            .engine
            .authenticate(&Credentials::new("a@b.com", "p1"))
            .await,
        Err(AuthError::AccountLocked { resent: true })
    ));
    assert_eq!(
        harness.transport.sent().last(),
        Some(&(
            Notification::UnlockConfirmationResend,
            "a@b.com".to_string()
        ))
    );

    // The resent token is live and redeemable.
    let locked = harness
        .repository
        .find_by_email("a@b.com")
        .await?
        .expect("account exists");
    let unlock_token = locked.lock.unlock_token.expect("unlock token").value;
    harness.engine.unlock(&unlock_token).await?;
    Ok(())
}

#[tokio::test]
async fn recovery_replaces_password() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("oldPW")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    let requested = harness.engine.forgot_password("a@b.com").await?;
    let recovery_token = requested.recovery.token.expect("recovery token").value;
    assert_eq!(
        harness.transport.sent().last(),
        Some(&(
            Notification::PasswordRecoveryConfirmation,
            "a@b.com".to_string()
        ))
    );

    harness
        .engine
        .recover(&recovery_token, &secret("newPW"))
        .await?;

    harness
        .engine
        .authenticate(&Credentials::new("a@b.com", "newPW"))
        .await?;
    assert!(matches!(
        harness
            .engine
            .authenticate(&Credentials::new("a@b.com", "oldPW"))
            .await,
        Err(AuthError::IncorrectCredentials)
    ));
    Ok(())
}

#[tokio::test]
async fn repeat_forgot_password_sends_resend_variant() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    harness.engine.forgot_password("a@b.com").await?;
    harness.engine.forgot_password("a@b.com").await?;
    assert_eq!(
        harness.transport.sent().last(),
        Some(&(
            Notification::PasswordRecoveryConfirmationResend,
            "a@b.com".to_string()
        ))
    );
    Ok(())
}

#[tokio::test]
async fn expired_recovery_token_is_rejected() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    let requested = harness.engine.forgot_password("a@b.com").await?;
    let recovery_token = requested.recovery.token.expect("recovery token").value;

    harness.clock.advance(Duration::days(4));
    assert!(matches!(
        harness.engine.recover(&recovery_token, &secret("new")).await,
        Err(AuthError::TokenExpired)
    ));
    Ok(())
}

#[tokio::test]
async fn tracking_rolls_current_into_last() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    harness.engine.track("a@b.com", Some("1.2.3.4")).await?;
    harness.clock.advance(Duration::minutes(1));
    let tracked = harness.engine.track("a@b.com", Some("5.6.7.8")).await?;

    assert_eq!(tracked.tracking.sign_in_count, 2);
    assert_eq!(
        tracked.tracking.current_sign_in_ip_address.as_deref(),
        Some("5.6.7.8")
    );
    assert_eq!(
        tracked.tracking.last_sign_in_ip_address.as_deref(),
        Some("1.2.3.4")
    );
    Ok(())
}

#[tokio::test]
async fn remember_me_round_trip() -> Result<()> {
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;
    harness.engine.confirm(&token).await?;

    let cookie = harness.engine.issue_remember_token("a@b.com").await?;
    let identified = harness.engine.consume_remember_token(&cookie).await?;
    assert_eq!(identified.email, "a@b.com");

    // No rotation on use; the same cookie keeps working.
    harness.engine.consume_remember_token(&cookie).await?;

    assert!(matches!(
        harness.engine.consume_remember_token("bogus").await,
        Err(AuthError::TokenInvalid)
    ));
    Ok(())
}

#[tokio::test]
async fn confirm_token_survives_reuse() -> Result<()> {
    // Tokens are not invalidated after redemption; asserting the current
    // behavior so a change here is a conscious one.
    let harness = harness();
    let account = harness.engine.register("a@b.com", &secret("p1")).await?;
    let token = account.confirmation.token.expect("token").value;

    harness.engine.confirm(&token).await?;
    let again = harness.engine.confirm(&token).await?;
    assert!(again.confirmed());
    Ok(())
}
