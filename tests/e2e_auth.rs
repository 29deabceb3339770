//! E2E tests for credentials sign-in and session endpoints

mod common;

use common::{SESSION_COOKIE, TestServer, session_cookie_from};
use serde_json::{Value, json};

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

#[tokio::test]
async fn test_signin_page_renders() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/signin?error=CredentialsSignin"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("Sign in with Credentials"));
    assert!(body.contains("/auth/callback/credentials"));
    assert!(body.contains("Sign in failed"));
}

#[tokio::test]
async fn test_sign_in_sets_cookie_and_session_returns_user() {
    let server = TestServer::new().await;

    let response = server.sign_in("password").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/protected-ssr");

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header")
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let cookie = session_cookie_from(&response).expect("session cookie");
    let body: Value = server
        .client
        .get(server.url("/auth/session"))
        .header("Cookie", cookie)
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(
        body["user"],
        json!({ "id": "test", "name": "Test User", "email": "test@example.com" })
    );
    assert!(body["expires"].is_string());
}

#[tokio::test]
async fn test_wrong_password_redirects_without_cookie() {
    let server = TestServer::new().await;

    for password in ["wrong", ""] {
        let response = server.sign_in(password).await;

        assert!(response.status().is_redirection());
        let location = location(&response);
        assert!(location.starts_with("/auth/signin?error=CredentialsSignin"));
        assert!(location.contains("callbackUrl=%2Fprotected-ssr"));
        assert!(session_cookie_from(&response).is_none());
    }
}

#[tokio::test]
async fn test_session_without_cookie_is_empty_object() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/session"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_session_with_tampered_cookie_is_empty_object() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie().await;

    let token = cookie
        .strip_prefix(&format!("{SESSION_COOKIE}="))
        .expect("session cookie pair");
    let (payload, _) = token.split_once('.').expect("signed token");
    let forged = format!("{SESSION_COOKIE}={payload}.AAAA");

    for value in [forged, format!("{SESSION_COOKIE}=not-a-token")] {
        let body: Value = server
            .client
            .get(server.url("/auth/session"))
            .header("Cookie", value)
            .send()
            .await
            .expect("request succeeds")
            .json()
            .await
            .expect("json body");
        assert_eq!(body, json!({}));
    }
}

#[tokio::test]
async fn test_update_session_reissues_with_new_name() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie().await;

    let response = server
        .client
        .post(server.url("/auth/session"))
        .header("Cookie", &cookie)
        .json(&json!({ "user": { "name": "Alice" } }))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let updated_cookie = session_cookie_from(&response).expect("reissued cookie");
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["id"], "test");
    assert_eq!(body["user"]["email"], "test@example.com");

    let body: Value = server
        .client
        .get(server.url("/auth/session"))
        .header("Cookie", updated_cookie)
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["user"]["name"], "Alice");
}

#[tokio::test]
async fn test_update_session_without_trigger_keeps_name() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie().await;

    let response = server
        .client
        .post(server.url("/auth/session"))
        .header("Cookie", &cookie)
        .json(&json!({}))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["user"]["name"], "Test User");
}

#[tokio::test]
async fn test_update_session_requires_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/auth/session"))
        .json(&json!({ "user": { "name": "Alice" } }))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_signout_clears_session_cookie() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie().await;

    let response = server
        .client
        .post(server.url("/auth/signout"))
        .header("Cookie", cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
    let set_cookie_values: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(
        set_cookie_values
            .iter()
            .any(|v| v.starts_with(&format!("{SESSION_COOKIE}=;"))
                || v.starts_with(&format!("{SESSION_COOKIE}=\"\""))),
        "expected cookie removal header, got: {set_cookie_values:?}"
    );
}

#[tokio::test]
async fn test_providers_lists_credentials() {
    let server = TestServer::new().await;

    let body: Value = server
        .client
        .get(server.url("/auth/providers"))
        .send()
        .await
        .expect("request succeeds")
        .json()
        .await
        .expect("json body");

    assert_eq!(body["credentials"]["id"], "credentials");
    assert_eq!(body["credentials"]["type"], "credentials");
    assert_eq!(
        body["credentials"]["callbackUrl"],
        server.url("/auth/callback/credentials")
    );
}

#[tokio::test]
async fn test_unknown_provider_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/auth/callback/github"))
        .form(&[("password", "password")])
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 400);
}
