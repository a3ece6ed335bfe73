//! Session lifecycle through a full context.

mod common;

use std::sync::Arc;

use chrono::TimeDelta;
use tempfile::TempDir;

use common::TestHarness;
use layoff_client::config::ClientConfig;
use layoff_client::gateway::{endpoints, Method, NETWORK_STATUS};
use layoff_client::session::{Credentials, SessionStatus};
use layoff_client::storage::{
    FileStorage, ACCESS_TOKEN_KEY, CREDENTIAL_KEYS, SESSION_EXPIRY_KEY, USER_KEY,
};
use layoff_client::testing::{job_page_json, ManualClock, MockTransport};
use layoff_client::{AppContext, ClientError, StoreEvent};

fn demo_credentials() -> Credentials {
    Credentials::new("demo@layoffapp.com", "password123")
}

#[tokio::test]
async fn test_login_authenticates_and_persists_token() {
    let harness = TestHarness::anonymous();
    harness.script_login("T1");

    harness.ctx.session().login(demo_credentials()).await.unwrap();

    assert_eq!(harness.ctx.session().status(), SessionStatus::Authenticated);
    assert_eq!(harness.stored(ACCESS_TOKEN_KEY).as_deref(), Some("T1"));
    assert!(harness.stored(USER_KEY).is_some());
    assert!(harness.stored(SESSION_EXPIRY_KEY).is_some());
}

#[tokio::test]
async fn test_login_round_trip_matches_response() {
    let harness = TestHarness::anonymous();
    harness.script_login("T1");

    let user = harness.ctx.session().login(demo_credentials()).await.unwrap();
    let session = harness.ctx.session().snapshot();

    assert_eq!(session.principal.as_ref(), Some(&user));
    assert_eq!(user.id, "u1");
    assert_eq!(session.access_token.unwrap().expose(), "T1");
    assert!(!harness.ctx.session().is_expired());
    assert_eq!(
        session.expires_at,
        Some(harness.clock.now() + ClientConfig::default().session_expiry())
    );

    let sent = harness
        .transport
        .last_request(Method::Post, endpoints::AUTH_LOGIN)
        .unwrap();
    let body = sent.body.unwrap();
    assert_eq!(body["email"], "demo@layoffapp.com");
    assert_eq!(body["password"], "password123");
    assert!(sent.bearer.is_none());
}

#[tokio::test]
async fn test_logout_twice_leaves_fields_absent() {
    let harness = TestHarness::anonymous();

    harness.ctx.session().logout().await;
    let first = harness.ctx.session().snapshot();
    harness.ctx.session().logout().await;
    let second = harness.ctx.session().snapshot();

    for snapshot in [&first, &second] {
        assert!(snapshot.principal.is_none());
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.refresh_token.is_none());
        assert!(snapshot.expires_at.is_none());
        assert_eq!(snapshot.status, SessionStatus::Idle);
    }
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn test_unauthorized_clears_session_and_every_key() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        401,
        r#"{"message":"Token revoked"}"#,
    );
    let mut events = harness.ctx.events().subscribe();

    let err = harness.ctx.jobs().search().await.unwrap_err();

    assert_eq!(err.as_api_failure().unwrap().status_code, 401);
    let session = harness.ctx.session().snapshot();
    assert!(session.principal.is_none());
    assert!(session.access_token.is_none());
    for key in CREDENTIAL_KEYS {
        assert!(harness.stored(key).is_none(), "{} survived the 401", key);
    }
    assert!(harness.ctx.jobs().error().is_some());

    let mut saw_session_change = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StoreEvent::SessionChanged { .. }) {
            saw_session_change = true;
        }
    }
    assert!(saw_session_change);
}

#[tokio::test]
async fn test_expired_clock_refuses_stale_session() {
    let harness = TestHarness::authenticated();
    assert_eq!(harness.ctx.session().status(), SessionStatus::Authenticated);

    harness.clock.advance_seconds(TimeDelta::hours(2).num_seconds());

    assert!(harness.ctx.session().is_expired());
    assert_eq!(harness.ctx.session().status(), SessionStatus::Idle);
    assert!(harness.ctx.session().expire_if_needed());
    assert!(harness.storage.is_empty());
}

#[tokio::test]
async fn test_validation_errors_skip_network() {
    let harness = TestHarness::anonymous();

    let err = harness
        .ctx
        .session()
        .login(Credentials::new("not-an-email", "password123"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(harness.transport.requests().is_empty());
    assert!(harness.ctx.session().error().is_none());
}

#[tokio::test]
async fn test_unreachable_server_on_login_reports_sentinel() {
    let harness = TestHarness::anonymous();
    harness.transport.fail(
        Method::Post,
        endpoints::AUTH_LOGIN,
        layoff_client::gateway::TransportError::Timeout,
    );

    let err = harness.ctx.session().login(demo_credentials()).await.unwrap_err();

    assert_eq!(err.as_api_failure().unwrap().status_code, NETWORK_STATUS);
    assert_eq!(harness.ctx.session().status(), SessionStatus::Failed);
}

#[tokio::test]
async fn test_session_survives_restart_with_file_storage() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("session.json");
    let clock = Arc::new(ManualClock::default());

    let transport = Arc::new(MockTransport::new());
    transport.respond(
        Method::Post,
        endpoints::AUTH_LOGIN,
        200,
        format!(
            r#"{{"user":{},"token":"T1","refreshToken":"R1"}}"#,
            layoff_client::testing::user_json("u1")
        ),
    );
    let first = AppContext::new(
        ClientConfig::default(),
        Arc::new(FileStorage::open(&path).unwrap()),
        transport,
        clock.clone(),
    );
    first.session().login(demo_credentials()).await.unwrap();
    drop(first);

    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::Get, endpoints::JOBS, 200, job_page_json(&[], 1, 0));
    let second = AppContext::new(
        ClientConfig::default(),
        Arc::new(FileStorage::open(&path).unwrap()),
        transport.clone(),
        clock,
    );

    assert_eq!(second.session().status(), SessionStatus::Authenticated);
    assert_eq!(second.session().principal().unwrap().id, "u1");
    second.jobs().search().await.unwrap();
    let sent = transport.last_request(Method::Get, endpoints::JOBS).unwrap();
    assert_eq!(sent.bearer.unwrap().expose(), "T1");
}
