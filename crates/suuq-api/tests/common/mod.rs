#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use suuq_api::storage::Storage;
use suuq_api::{AppState, AppStateInner};
use suuq_db::Database;
use suuq_gateway::Dispatcher;
use suuq_types::pricing::Pricing;

pub const ADMIN_EMAIL: &str = "admin@suuq.so";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _storage_dir: TempDir,
}

pub async fn app() -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db: Arc::new(Database::open_in_memory().unwrap()),
        dispatcher: Dispatcher::default(),
        jwt_secret: "test-secret".into(),
        pricing: Pricing::default(),
        storage: Storage::new(storage_dir.path().to_path_buf()).await.unwrap(),
        public_url: "http://localhost:3000".into(),
        admin_emails: HashSet::from([ADMIN_EMAIL.to_string()]),
    });
    TestApp {
        router: suuq_api::router(state.clone()),
        state,
        _storage_dir: storage_dir,
    }
}

pub struct Call<'a> {
    method: &'a str,
    uri: String,
    token: Option<&'a str>,
    body: Option<Value>,
    headers: Vec<(&'static str, String)>,
    raw: Option<Vec<u8>>,
}

impl<'a> Call<'a> {
    pub fn new(method: &'a str, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            token: None,
            body: None,
            headers: Vec::new(),
            raw: None,
        }
    }

    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn bytes(mut self, content_type: &str, data: &[u8]) -> Self {
        self.headers.push(("content-type", content_type.to_string()));
        self.raw = Some(data.to_vec());
        self
    }
}

impl TestApp {
    pub async fn send(&self, call: Call<'_>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(call.method).uri(call.uri);
        if let Some(token) = call.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in &call.headers {
            builder = builder.header(*name, value);
        }

        let body = match (call.body, call.raw) {
            (Some(json), _) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            (None, Some(raw)) => Body::from(raw),
            (None, None) => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Register an account and return its (user id, token).
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(Call::new("POST", "/auth/register").json(json!({
                "email": email,
                "password": "secret123",
            })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", email, body);
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Post an ad and return the response body.
    pub async fn post_ad(&self, token: &str, ad: Value) -> (StatusCode, Value) {
        self.send(Call::new("POST", "/ads").token(token).json(ad)).await
    }

    /// Titles of the public listing, in listing order.
    pub async fn listing_titles(&self) -> Vec<String> {
        let (status, body) = self.send(Call::new("GET", "/ads")).await;
        assert_eq!(status, StatusCode::OK);
        titles(&body)
    }
}

pub fn titles(ads: &Value) -> Vec<String> {
    ads.as_array()
        .unwrap()
        .iter()
        .map(|ad| ad["title"].as_str().unwrap().to_string())
        .collect()
}

/// A valid phone ad; extra fields are merged over the defaults.
pub fn ad(title: &str, extra: Value) -> Value {
    let mut ad = json!({
        "title": title,
        "description": "Si fiican u shaqeeya",
        "price": 120.0,
        "category": "phones",
        "region": "Banaadir",
        "phone": "+252615000000",
        "shop_name": "Hodan Electronics",
    });
    if let (Some(base), Some(extra)) = (ad.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    ad
}
