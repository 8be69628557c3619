use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use madrasah_cms::{
    AppConfig, AppState, MemoryRepository, MockStorageService, create_router,
    error::ErrorBody,
    models::{Article, Document},
    repository::Repository,
    session::Claims,
};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

// --- Test Harness ---

struct TestApp {
    router: Router,
    repo: Arc<MemoryRepository>,
    config: AppConfig,
}

fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let config = AppConfig::default();
    let state = AppState::new(
        repo.clone(),
        Arc::new(MockStorageService::new()),
        config.clone(),
    );
    TestApp {
        router: create_router(state),
        repo,
        config,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    /// Signs in with the configured admin pair and returns the `Cookie` header value.
    async fn admin_cookie(&self) -> String {
        let response = self
            .login(
                self.config.admin_email.as_deref().unwrap(),
                self.config.admin_password.as_deref().unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        cookie_pair(&response).expect("login should set the session cookie")
    }
}

/// `token=...` part of the response's `Set-Cookie` header.
fn cookie_pair(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn article_json() -> serde_json::Value {
    json!({ "title": "Ramadan timetable", "body": "Classes move to the evening." })
}

fn expired_cookie(secret: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        email: email.to_string(),
        iat: (now - 2 * 86400) as usize,
        exp: (now - 86400) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();
    format!("token={token}")
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app();
    let response = app.send(empty_request("GET", "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_create_article_then_listed() {
    let app = spawn_app();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(json_request("POST", "/api/articles", Some(&cookie), article_json()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Document<Article> = body_json(response).await;
    assert_eq!(created.body.title, "Ramadan timetable");

    // Reads are public: no cookie needed.
    let response = app.send(empty_request("GET", "/api/articles", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Vec<Document<Article>> = body_json(response).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn test_create_article_without_cookie_is_unauthorized() {
    let app = spawn_app();

    let response = app
        .send(json_request("POST", "/api/articles", None, article_json()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "unauthorized");

    assert_eq!(app.repo.count("articles").await, 0);
    let response = app.send(empty_request("GET", "/api/articles", None)).await;
    let listed: Vec<Document<Article>> = body_json(response).await;
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_invalid_body_without_cookie_is_still_unauthorized() {
    let app = spawn_app();

    // The guard runs before the payload is parsed.
    let response = app
        .send(json_request("POST", "/api/news", None, json!({ "nonsense": true })))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_sets_no_cookie() {
    let app = spawn_app();

    let response = app
        .login(app.config.admin_email.as_deref().unwrap(), "wrong-password")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "invalid_credentials");
}

#[tokio::test]
async fn test_wrong_email_is_indistinguishable_from_wrong_password() {
    let app = spawn_app();

    let response = app
        .login("someone@else.test", app.config.admin_password.as_deref().unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "invalid_credentials");
}

#[tokio::test]
async fn test_login_without_secret_is_misconfigured() {
    let repo = Arc::new(MemoryRepository::new());
    let config = AppConfig {
        jwt_secret: None,
        ..AppConfig::default()
    };
    let app = TestApp {
        router: create_router(AppState::new(
            repo.clone(),
            Arc::new(MockStorageService::new()),
            config.clone(),
        )),
        repo,
        config,
    };

    let response = app.login("admin@madrasah.test", "test-password").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "server_misconfigured");
}

#[tokio::test]
async fn test_expired_cookie_is_unauthorized() {
    let app = spawn_app();
    let cookie = expired_cookie(
        app.config.jwt_secret.as_deref().unwrap(),
        app.config.admin_email.as_deref().unwrap(),
    );

    let response = app
        .send(json_request("POST", "/api/articles", Some(&cookie), article_json()))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.repo.count("articles").await, 0);
}

#[tokio::test]
async fn test_foreign_secret_cookie_is_unauthorized() {
    let app = spawn_app();
    let now = Utc::now().timestamp();
    let claims = Claims {
        email: "admin@madrasah.test".to_string(),
        iat: now as usize,
        exp: (now + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let response = app
        .send(json_request(
            "POST",
            "/api/videos",
            Some(&format!("token={token}")),
            json!({ "title": "Graduation", "url": "https://youtu.be/x" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.repo.count("videos").await, 0);
}

#[tokio::test]
async fn test_update_and_delete_require_session() {
    let app = spawn_app();
    let existing = app
        .repo
        .insert("banners", json!({ "title": "Welcome", "image_url": "https://cdn/x.png" }))
        .await
        .unwrap();
    let uri = format!("/api/banners/{}", existing.id);

    let response = app
        .send(json_request(
            "PUT",
            &uri,
            None,
            json!({ "title": "Hacked", "image_url": "https://evil/x.png" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.send(empty_request("DELETE", &uri, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stored = app.repo.get("banners", existing.id).await.unwrap().unwrap();
    assert_eq!(stored.body["title"], "Welcome");
}

#[tokio::test]
async fn test_update_and_delete_with_session() {
    let app = spawn_app();
    let cookie = app.admin_cookie().await;
    let existing = app
        .repo
        .insert("committees", json!({ "name": "Ustadh Ali", "role": "Principal" }))
        .await
        .unwrap();
    let uri = format!("/api/committees/{}", existing.id);

    let response = app
        .send(json_request(
            "PUT",
            &uri,
            Some(&cookie),
            json!({ "name": "Ustadh Ali", "role": "Director", "position": 1 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: serde_json::Value = body_json(response).await;
    assert_eq!(updated["role"], "Director");

    let response = app.send(empty_request("DELETE", &uri, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.send(empty_request("GET", &uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "not_found");
}

#[tokio::test]
async fn test_missing_required_field_is_validation_error() {
    let app = spawn_app();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/articles",
            Some(&cookie),
            json!({ "title": "No body" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "validation_error");
    assert!(error.message.contains("body"));
    assert_eq!(app.repo.count("articles").await, 0);
}

#[tokio::test]
async fn test_contact_form_is_public_but_inbox_is_protected() {
    let app = spawn_app();

    let response = app
        .send(json_request(
            "POST",
            "/api/contacts",
            None,
            json!({ "name": "Aisha", "email": "aisha@example.com", "message": "Admissions?" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.send(empty_request("GET", "/api/contacts", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = app.admin_cookie().await;
    let response = app
        .send(empty_request("GET", "/api/contacts", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let inbox: Vec<serde_json::Value> = body_json(response).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["name"], "Aisha");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = spawn_app();

    let response = app.send(empty_request("POST", "/api/logout", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_session_endpoint_reports_signed_in_admin() {
    let app = spawn_app();

    let response = app.send(empty_request("GET", "/api/session", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = app.admin_cookie().await;
    let response = app
        .send(empty_request("GET", "/api/session", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let info: serde_json::Value = body_json(response).await;
    assert_eq!(info["email"], "admin@madrasah.test");
}

// --- Admin Page Filter ---

#[tokio::test]
async fn test_admin_page_redirects_without_session() {
    let app = spawn_app();

    for path in ["/admin", "/admin/", "/admin/articles"] {
        let response = app.send(empty_request("GET", path, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/login",
            "{path}"
        );
    }
}

#[tokio::test]
async fn test_admin_login_page_is_not_redirected() {
    let app = spawn_app();

    let response = app.send(empty_request("GET", "/admin/login", None)).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_admin_page_passes_with_session() {
    let app = spawn_app();
    let cookie = app.admin_cookie().await;

    let response = app
        .send(empty_request("GET", "/admin/", Some(&cookie)))
        .await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_admin_page_redirects_with_expired_session() {
    let app = spawn_app();
    let cookie = expired_cookie(
        app.config.jwt_secret.as_deref().unwrap(),
        app.config.admin_email.as_deref().unwrap(),
    );

    let response = app.send(empty_request("GET", "/admin/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_similar_prefix_is_not_gated() {
    let app = spawn_app();

    // `/administration` is not under the admin prefix.
    let response = app
        .send(empty_request("GET", "/administration", None))
        .await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_malformed_id_is_validation_error() {
    let app = spawn_app();

    let response = app
        .send(empty_request("GET", "/api/articles/not-a-uuid", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "validation_error");

    let cookie = app.admin_cookie().await;
    let response = app
        .send(json_request(
            "PUT",
            "/api/articles/not-a-uuid",
            Some(&cookie),
            article_json(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = body_json(response).await;
    assert_eq!(error.error, "validation_error");
}

#[tokio::test]
async fn test_every_protected_route_rejects_invalid_cookie() {
    let app = spawn_app();
    let cookie = "token=not.a.valid-token";

    // One stored document per collection, with a payload each write would accept.
    let collections = [
        ("articles", json!({ "title": "Stored", "body": "Original" })),
        ("banners", json!({ "title": "Stored", "image_url": "https://cdn/x.png" })),
        ("committees", json!({ "name": "Stored", "role": "Original" })),
        ("contents", json!({ "section": "about", "title": "Stored" })),
        ("news", json!({ "title": "Stored", "body": "Original" })),
        ("videos", json!({ "title": "Stored", "url": "https://youtu.be/x" })),
        ("gallery", json!({ "image_url": "https://cdn/stored.png" })),
        (
            "contacts",
            json!({ "name": "Stored", "email": "a@b.test", "message": "Original" }),
        ),
    ];

    let mut seeded = Vec::new();
    for (collection, body) in &collections {
        let doc = app.repo.insert(collection, body.clone()).await.unwrap();
        seeded.push((*collection, doc.id, body.clone()));
    }

    let mut requests = Vec::new();
    for (collection, id, body) in &seeded {
        let base = format!("/api/{collection}");
        let item = format!("{base}/{id}");
        if *collection == "contacts" {
            requests.push(("GET", base, None));
            requests.push(("GET", item.clone(), None));
        } else {
            requests.push(("POST", base, Some(body.clone())));
            requests.push(("PUT", item.clone(), Some(body.clone())));
        }
        requests.push(("DELETE", item, None));
    }
    requests.push(("GET", "/api/session".to_string(), None));
    requests.push(("POST", "/api/upload".to_string(), Some(json!({}))));

    for (method, uri, body) in requests {
        let request = match body {
            Some(body) => json_request(method, &uri, Some(cookie), body),
            None => empty_request(method, &uri, Some(cookie)),
        };
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        let error: ErrorBody = body_json(response).await;
        assert_eq!(error.error, "unauthorized", "{method} {uri}");
    }

    for (collection, id, body) in seeded {
        assert_eq!(app.repo.count(collection).await, 1, "{collection}");
        let stored = app.repo.get(collection, id).await.unwrap().unwrap();
        assert_eq!(stored.body, body, "{collection}");
    }
}
