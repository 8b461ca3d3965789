use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadcal_core::SyncError;
use leadcal_core::remote::protocol::{Function, SyncEvents};
use leadcal_core::remote::{AuthSession, Backend, SupabaseBackend, call};
use leadcal_core::settings::SettingsPatch;

const ANON_KEY: &str = "anon-key";

struct Fixture {
    server: MockServer,
    backend: SupabaseBackend,
    dir: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let backend = SupabaseBackend::new(
            Url::parse(&server.uri()).unwrap(),
            ANON_KEY.to_string(),
            dir.path().join("session.toml"),
        );
        Fixture {
            server,
            backend,
            dir,
        }
    }

    /// Fixture with a stored, unexpired session.
    async fn signed_in() -> Self {
        let fixture = Self::new().await;
        session("stored-token", Utc::now() + Duration::hours(1))
            .save(&fixture.session_path())
            .unwrap();
        fixture
    }

    fn session_path(&self) -> std::path::PathBuf {
        self.dir.path().join("session.toml")
    }
}

fn session(access_token: &str, expires_at: chrono::DateTime<Utc>) -> AuthSession {
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at,
        user_id: "user-1".to_string(),
        email: Some("ana@example.com".to_string()),
    }
}

fn grant(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh-2",
        "expires_in": 3600,
        "token_type": "bearer",
        "user": {"id": "user-1", "email": "ana@example.com"},
    })
}

#[tokio::test]
async fn login_persists_session() {
    let f = Fixture::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .and(body_json(json!({"email": "ana@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant("fresh-token")))
        .expect(1)
        .mount(&f.server)
        .await;

    let session = f.backend.login("ana@example.com", "hunter2").await.unwrap();

    assert_eq!(session.access_token, "fresh-token");
    let stored = AuthSession::load(&f.session_path()).unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh-token");
    assert_eq!(stored.email.as_deref(), Some("ana@example.com"));
}

#[tokio::test]
async fn rejected_login_is_session_error() {
    let f = Fixture::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid login credentials"))
        .mount(&f.server)
        .await;

    let err = f.backend.login("ana@example.com", "wrong").await.unwrap_err();

    assert!(matches!(err, SyncError::SessionInvalid(_)));
    assert!(!f.session_path().exists());
}

#[tokio::test]
async fn missing_session_is_reported() {
    let f = Fixture::new().await;

    let err = f.backend.access_token().await.unwrap_err();

    assert!(matches!(err, SyncError::SessionInvalid(_)));
}

#[tokio::test]
async fn expired_session_is_refreshed_and_saved() {
    let f = Fixture::new().await;
    session("old-token", Utc::now() - Duration::minutes(5))
        .save(&f.session_path())
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant("new-token")))
        .expect(1)
        .mount(&f.server)
        .await;

    assert_eq!(f.backend.access_token().await.unwrap(), "new-token");
    // Cached after the first refresh.
    assert_eq!(f.backend.access_token().await.unwrap(), "new-token");

    let stored = AuthSession::load(&f.session_path()).unwrap().unwrap();
    assert_eq!(stored.refresh_token, "refresh-2");
}

#[tokio::test]
async fn logout_removes_session_even_if_remote_fails() {
    let f = Fixture::signed_in().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&f.server)
        .await;

    f.backend.logout().await.unwrap();

    assert!(!f.session_path().exists());
}

#[tokio::test]
async fn current_user_comes_from_auth_endpoint() {
    let f = Fixture::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user-1"})))
        .mount(&f.server)
        .await;

    assert_eq!(f.backend.current_user_id().await.unwrap(), "user-1");
}

#[tokio::test]
async fn function_call_posts_path_and_arguments() {
    let f = Fixture::signed_in().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/google-calendar-manage"))
        .and(header("authorization", "Bearer stored-token"))
        .and(body_json(json!({
            "path": "sync-events",
            "calendars": ["primary"],
            "syncToken": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"id": "e1", "summary": "Demo"}],
            "nextSyncToken": "cursor-1",
        })))
        .expect(1)
        .mount(&f.server)
        .await;

    let response = call(
        &f.backend,
        "stored-token",
        SyncEvents {
            calendars: ["primary".to_string()].into(),
            sync_token: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.next_sync_token.as_deref(), Some("cursor-1"));
    assert_eq!(response.events[0].id, "e1");
}

#[tokio::test]
async fn function_error_body_becomes_remote_error() {
    let f = Fixture::signed_in().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/google-calendar-auth"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&f.server)
        .await;

    let err = f
        .backend
        .invoke(
            Function::GoogleCalendarAuth,
            json!({"path": "callback", "code": "c"}),
            "stored-token",
        )
        .await
        .unwrap_err();

    match err {
        SyncError::RemoteCallFailed { path, message, .. } => {
            assert_eq!(path, "callback");
            assert_eq!(message, "invalid_grant");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_function_response_is_null() {
    let f = Fixture::signed_in().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/google-calendar-manage"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&f.server)
        .await;

    let value = f
        .backend
        .invoke(
            Function::GoogleCalendarManage,
            json!({"path": "revoke-access"}),
            "stored-token",
        )
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn settings_rows_are_filtered_by_user() {
    let f = Fixture::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_calendar_settings"))
        .and(query_param("user_id", "eq.user-1"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user_id": "user-1",
            "google_account_email": "ana@example.com",
            "selected_calendars": null,
            "sync_token": null,
        }])))
        .mount(&f.server)
        .await;

    let settings = f.backend.load_settings("user-1").await.unwrap().unwrap();

    assert!(settings.is_connected());
    assert!(settings.selected_calendars.is_empty());
}

#[tokio::test]
async fn missing_settings_row_is_none() {
    let f = Fixture::signed_in().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_calendar_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&f.server)
        .await;

    assert_eq!(f.backend.load_settings("user-1").await.unwrap(), None);
}

#[tokio::test]
async fn selecting_calendars_patches_null_cursor() {
    let f = Fixture::signed_in().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/user_calendar_settings"))
        .and(query_param("user_id", "eq.user-1"))
        .and(body_partial_json(json!({
            "selected_calendars": ["team"],
            "sync_token": null,
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&f.server)
        .await;

    f.backend
        .update_settings("user-1", &SettingsPatch::select_calendars(["team".to_string()]))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_delete_is_store_error() {
    let f = Fixture::signed_in().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/user_calendar_settings"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&f.server)
        .await;

    let err = f.backend.delete_settings("user-1").await.unwrap_err();

    assert!(matches!(err, SyncError::Store(ref m) if m.contains("permission denied")));
}
