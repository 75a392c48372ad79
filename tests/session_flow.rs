//! End-to-end login → callback → profile → logout against a mock provider.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webauth_session::{
    AuthClient, FixedClock, MemoryStore, Navigation, OAuthConfig, SessionConfig, SessionManager,
    SessionStore,
};

const START: i64 = 1_000_000;

fn id_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

fn manager(
    provider: &MockServer,
) -> (SessionManager<MemoryStore, FixedClock>, MemoryStore, FixedClock) {
    let oauth = OAuthConfig::new(
        provider.uri(),
        "crm-client",
        "https://app.example.com/callback".parse().unwrap(),
    )
    .unwrap()
    .with_audience("https://app.example.com/private/api")
    .with_scopes(vec!["email".into(), "read:all".into(), "write:all".into()]);
    let config = SessionConfig::new(AuthClient::new(oauth))
        .with_login_redirect("/crm")
        .with_logout_redirect("/crm/")
        .with_error_redirect("/crm");
    let store = MemoryStore::new();
    let clock = FixedClock::new(START);
    let manager = SessionManager::new(config, store.clone()).with_clock(clock.clone());
    (manager, store, clock)
}

#[tokio::test]
async fn full_session_lifecycle() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "auth0|7",
            "email": "a@b.com",
            "nickname": "ab"
        })))
        .expect(1)
        .mount(&provider)
        .await;

    let (manager, store, clock) = manager(&provider);

    // Login leaves the app for the hosted page
    let Navigation::External(authorize) = manager.login().unwrap() else {
        panic!("expected external navigation");
    };
    assert_eq!(authorize.path(), "/authorize");
    let query: HashMap<String, String> = authorize.query_pairs().into_owned().collect();
    assert_eq!(query["response_type"], "token id_token");
    assert_eq!(query["client_id"], "crm-client");
    assert_eq!(query["scope"], "email read:all write:all");

    // Provider redirects back with the tokens
    let token = id_token(&json!({ "email": "a@b.com", "nonce": query["nonce"] }));
    let fragment = format!(
        "#access_token=access-1&id_token={token}&expires_in=3600&token_type=Bearer&state={}",
        query["state"]
    );
    assert_eq!(
        manager.handle_authentication(&fragment),
        Navigation::Route("/crm".into())
    );

    assert!(manager.is_authenticated());
    assert_eq!(manager.get_user_email().unwrap(), "a@b.com");
    assert_eq!(manager.get_access_token().unwrap(), "access-1");

    let profile = manager.get_profile().await.unwrap();
    assert_eq!(profile.nickname.as_deref(), Some("ab"));
    assert_eq!(manager.profile(), Some(profile));

    manager.set_roles_and_groups_token("xyz").unwrap();

    // Expiry is exclusive
    clock.set(START + 3_600_000 - 1);
    assert!(manager.is_authenticated());
    clock.set(START + 3_600_000);
    assert!(!manager.is_authenticated());

    assert_eq!(manager.logout(), Navigation::Route("/crm/".into()));
    for key in ["access_token", "id_token", "expires_at", "roles_groups_token"] {
        assert_eq!(store.get(key).unwrap(), None, "{key} should be cleared");
    }
    assert!(manager.profile().is_none());
    assert!(manager.get_user_email().is_err());
}

#[tokio::test]
async fn failed_callback_leaves_no_session() {
    let provider = MockServer::start().await;
    let (manager, store, _) = manager(&provider);
    manager.login().unwrap();

    let next = manager.handle_authentication("#error=login_required&error_description=Login%20required");

    assert_eq!(next, Navigation::Route("/crm?error=login_required".into()));
    assert!(store.is_empty());
    assert!(!manager.is_authenticated());
}
