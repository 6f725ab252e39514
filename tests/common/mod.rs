#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pasetors::claims::Claims;
use pasetors::keys::{AsymmetricKeyPair, Generate};
use pasetors::version4::V4;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use spotlight::app::identity::IdentityVerifier;
use spotlight::app::webhook::WebhookVerifier;
use spotlight::infra::db::Db;
use spotlight::infra::storage::AssetStore;
use spotlight::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
const IDENTITY_ISSUER: &str = "spotlight-identity-test";

// ---------------------------------------------------------------------------
// In-memory asset storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAssets {
    objects: Mutex<HashSet<String>>,
    fail_deletes: AtomicBool,
}

impl MemoryAssets {
    pub fn put(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[axum::async_trait]
impl AssetStore for MemoryAssets {
    async fn upload_url(&self, key: &str, expires_in: Duration) -> anyhow::Result<String> {
        Ok(format!(
            "https://uploads.test/{}?expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    async fn public_url(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .contains(key)
            .then(|| format!("https://cdn.test/{}", key)))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("storage offline");
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TestApp: one fresh in-memory store per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub assets: Arc<MemoryAssets>,
    keys: AsymmetricKeyPair<V4>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub external_id: String,
    pub username: String,
    pub token: String,
}

pub async fn app() -> TestApp {
    TestApp::setup(Some(WEBHOOK_SECRET)).await
}

impl TestApp {
    pub async fn setup(webhook_secret: Option<&str>) -> Self {
        let db = Db::connect_url("sqlite::memory:", Duration::from_secs(5))
            .await
            .expect("failed to open in-memory store");

        let keys = AsymmetricKeyPair::<V4>::generate().expect("keypair generation failed");
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(keys.public.as_bytes());

        let assets = Arc::new(MemoryAssets::default());

        let state = AppState {
            db,
            storage: assets.clone(),
            identity: IdentityVerifier::new(public_key, IDENTITY_ISSUER),
            webhook_secret: webhook_secret.map(str::to_string),
            upload_url_ttl_seconds: 900,
        };

        let router = spotlight::http::router(state.clone());

        TestApp {
            router,
            state,
            assets,
            keys,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .iter()
            .map(|value| ("Authorization", value.as_str()))
            .collect();
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .iter()
            .map(|value| ("Authorization", value.as_str()))
            .collect();
        let body = serde_json::to_vec(&body).unwrap();
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .iter()
            .map(|value| ("Authorization", value.as_str()))
            .collect();
        let body = serde_json::to_vec(&body).unwrap();
        self.request(Method::PATCH, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let auth = token.map(|t| format!("Bearer {}", t));
        let headers: Vec<(&str, &str)> = auth
            .iter()
            .map(|value| ("Authorization", value.as_str()))
            .collect();
        self.request(Method::DELETE, path, None, &headers).await
    }

    // ------------------------------------------------------------------
    // Identity provider stand-ins
    // ------------------------------------------------------------------

    /// A session token the identity provider would hand to `external_id`.
    pub fn token_for(&self, external_id: &str) -> String {
        let mut claims = Claims::new().unwrap();
        claims.issuer(IDENTITY_ISSUER).unwrap();
        claims.subject(external_id).unwrap();
        pasetors::public::sign(&self.keys.secret, &claims, None, None).unwrap()
    }

    /// POST a webhook delivery signed with [`WEBHOOK_SECRET`].
    pub async fn deliver_webhook(&self, msg_id: &str, event: Value) -> TestResponse {
        let body = serde_json::to_vec(&event).unwrap();
        let timestamp = time::OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = WebhookVerifier::new(WEBHOOK_SECRET)
            .unwrap()
            .sign(msg_id, &timestamp, &body)
            .unwrap();
        let signature = format!("v1,{}", signature);

        self.request(
            Method::POST,
            "/clerk-webhook",
            Some(body),
            &[
                ("svix-id", msg_id),
                ("svix-timestamp", timestamp.as_str()),
                ("svix-signature", signature.as_str()),
            ],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Provision a user the way production does: through a signed `user.created`.
    pub async fn create_user(&self, name: &str) -> TestUser {
        let external_id = format!("user_{}", name);
        let resp = self
            .deliver_webhook(&format!("msg_{}", name), user_created_event(&external_id, name))
            .await;
        assert_eq!(resp.status, StatusCode::OK, "provisioning {} failed", name);

        let token = self.token_for(&external_id);
        let resp = self.get("/me", Some(&token)).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();

        TestUser {
            id: Uuid::parse_str(body["id"].as_str().unwrap()).unwrap(),
            external_id,
            username: body["username"].as_str().unwrap().to_string(),
            token,
        }
    }

    /// Store an image for `user` and publish it as a post.
    pub async fn create_post(&self, user: &TestUser, caption: Option<&str>) -> Value {
        let storage_key = format!("uploads/{}/{}", user.id, Uuid::new_v4());
        self.assets.put(&storage_key);

        let resp = self
            .post_json(
                "/posts",
                json!({ "storage_key": storage_key, "caption": caption }),
                Some(&user.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
        resp.json()
    }

    pub async fn user(&self, user_id: Uuid) -> Value {
        let resp = self.get(&format!("/users/{}", user_id), None).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()
    }

    /// Rows in `table` whose `column` equals `id`.
    pub async fn count_where(&self, table: &str, column: &str, id: Uuid) -> i64 {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table, column
        ))
        .bind(id)
        .fetch_one(self.state.db.pool())
        .await
        .expect("count query failed")
    }

    pub async fn count_all(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.state.db.pool())
            .await
            .expect("count query failed")
    }
}

pub fn user_created_event(external_id: &str, name: &str) -> Value {
    json!({
        "type": "user.created",
        "object": "event",
        "data": {
            "id": external_id,
            "email_addresses": [{ "email_address": format!("{}@example.com", name) }],
            "first_name": name,
            "last_name": "Tester",
            "image_url": format!("https://img.example.com/{}.png", name)
        }
    })
}

pub fn post_id(post: &Value) -> Uuid {
    Uuid::parse_str(post["id"].as_str().unwrap()).unwrap()
}
