use std::sync::Arc;

use chrono::{Duration, Utc};
use cleanops_api::config::ApiConfig;
use cleanops_auth::{
    ClaimsRecord, InMemoryUserDirectory, Role, SignedClaims, TokenCodec, TokenConfig, UserRecord,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;

const JWT_SECRET: &str = "black-box-signing-secret";
const PAYLOAD_KEY: &str = "0123456789abcdef0123456789abcdef";

struct TestServer {
    base_url: String,
    codec: TokenCodec,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ApiConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "PAYLOAD_ENCRYPTION_KEY" => Some(PAYLOAD_KEY.to_string()),
            "JWT_TTL_SECS" => Some("3600".to_string()),
            _ => None,
        })
        .expect("valid test config");

        let directory = Arc::new(InMemoryUserDirectory::with_users([
            user("abc123", "alice", Role::Admin),
            user("sup001", "sam", Role::Supervisor),
            user("cus001", "carol", Role::Customer),
            user("cus002", "dave", Role::Customer),
        ]));

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = cleanops_api::app::build_app(&config, directory).expect("router builds");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            codec: TokenCodec::new(&config.token).unwrap(),
            handle,
        }
    }

    fn token_for(&self, id: &str, username: &str, role: Role) -> String {
        self.codec
            .issue(&claims(id, username, role), Utc::now())
            .expect("token issues")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn user(id: &str, username: &str, role: Role) -> UserRecord {
    UserRecord {
        id: id.parse().unwrap(),
        username: username.to_string(),
        email: format!("{username}@x.com"),
        role,
        is_active: true,
    }
}

fn claims(id: &str, username: &str, role: Role) -> ClaimsRecord {
    ClaimsRecord {
        user_id: id.parse().unwrap(),
        email: format!("{username}@x.com"),
        role,
        username: username.to_string(),
    }
}

async fn assert_uniform_401(res: reqwest::Response) {
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
    assert_eq!(body["message"], "authentication required");
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/users/me", "/users", "/users/abc123", "/supervisors"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_uniform_401(res).await;
    }
}

#[tokio::test]
async fn every_token_failure_looks_the_same_to_the_client() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Wrong signing secret.
    let foreign = TokenCodec::new(&TokenConfig {
        signing_secret: b"not-the-server-secret".to_vec(),
        payload_key: PAYLOAD_KEY.as_bytes().to_vec(),
        ttl: Duration::seconds(3600),
    })
    .unwrap()
    .issue(&claims("abc123", "alice", Role::Admin), Utc::now())
    .unwrap();

    // Expired.
    let expired = srv
        .codec
        .issue(&claims("abc123", "alice", Role::Admin), Utc::now() - Duration::hours(2))
        .unwrap();

    // Valid signature, cleartext body.
    let cleartext = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &SignedClaims {
            data: "00:00:00".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 600,
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    for token in [foreign, expired, cleartext, "garbage".to_string()] {
        let res = client
            .get(srv.url("/users/me"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_uniform_401(res).await;
    }
}

#[tokio::test]
async fn identity_is_derived_from_encrypted_token() {
    let srv = TestServer::spawn().await;
    let token = srv.token_for("abc123", "alice", Role::Admin);

    let res = reqwest::Client::new()
        .get(srv.url("/users/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["userId"], "abc123");
    assert_eq!(body["email"], "alice@x.com");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn token_cookie_is_accepted() {
    let srv = TestServer::spawn().await;
    let token = srv.token_for("cus001", "carol", Role::Customer);

    let res = reqwest::Client::new()
        .get(srv.url("/users/me"))
        .header(reqwest::header::COOKIE, format!("theme=dark; token={token}"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "carol");
}

#[tokio::test]
async fn role_policies_distinguish_forbidden_from_unauthenticated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let customer = srv.token_for("cus001", "carol", Role::Customer);
    let res = client.get(srv.url("/users")).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["message"], "insufficient role");

    let admin = srv.token_for("abc123", "alice", Role::Admin);
    let res = client.get(srv.url("/users")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["users"].as_array().unwrap().len(), 4);

    let res = client
        .get(srv.url("/users?role=customer"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn supervisors_route_allows_admin_and_supervisor_only() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (token, expected) in [
        (srv.token_for("abc123", "alice", Role::Admin), StatusCode::OK),
        (srv.token_for("sup001", "sam", Role::Supervisor), StatusCode::OK),
        (srv.token_for("cus001", "carol", Role::Customer), StatusCode::FORBIDDEN),
    ] {
        let res = client.get(srv.url("/supervisors")).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), expected);
    }

    let admin = srv.token_for("abc123", "alice", Role::Admin);
    let res = client.get(srv.url("/supervisors")).bearer_auth(&admin).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], "sup001");
}

#[tokio::test]
async fn users_can_read_themselves_but_not_others() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let carol = srv.token_for("cus001", "carol", Role::Customer);

    let res = client.get(srv.url("/users/cus001")).bearer_auth(&carol).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "carol");
    assert!(body.get("password").is_none());

    let res = client.get(srv.url("/users/cus002")).bearer_auth(&carol).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = srv.token_for("abc123", "alice", Role::Admin);
    let res = client.get(srv.url("/users/cus002")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/users/nobody")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/users/not-an-id")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_is_admin_only_and_never_self() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.token_for("abc123", "alice", Role::Admin);
    let supervisor = srv.token_for("sup001", "sam", Role::Supervisor);

    let res = client.delete(srv.url("/users/cus002")).bearer_auth(&supervisor).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.delete(srv.url("/users/abc123")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.delete(srv.url("/users/cus002")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.delete(srv.url("/users/cus002")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tokens_stay_valid_after_directory_changes() {
    // Verification is offline: removing a user does not revoke an issued token.
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.token_for("abc123", "alice", Role::Admin);
    let dave = srv.token_for("cus002", "dave", Role::Customer);

    let res = client.delete(srv.url("/users/cus002")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/users/me")).bearer_auth(&dave).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
