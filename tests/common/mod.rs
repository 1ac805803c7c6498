//! Common test utilities for E2E tests
//!
//! `MockFeedService` stands in for the feed service: it records every
//! request it receives and answers with queued responses (200 `{}` when the
//! queue is empty).

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use stream_feeds::{Client, ClientConfig};
use tokio::net::TcpListener;

pub const API_KEY: &str = "my_key";
pub const API_SECRET: &str = "my_secret";

/// A request as seen by the mock service
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Claims of the scoped JWT in `Authorization`
    pub fn jwt_claims(&self) -> Value {
        assert_eq!(self.header("stream-auth-type"), Some("jwt"));
        let token = self.header("authorization").expect("authorization header");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        jsonwebtoken::decode::<Value>(
            token,
            &DecodingKey::from_secret(API_SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims
    }
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    responses: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
}

/// In-process feed service
pub struct MockFeedService {
    pub addr: String,
    state: MockState,
}

impl MockFeedService {
    /// Start a mock service on a random local port
    pub async fn new() -> Self {
        let state = MockState::default();

        let app = Router::new().fallback(capture).with_state(state.clone());

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Client pointed at this service
    pub fn client(&self) -> Client {
        Client::new(ClientConfig::new(API_KEY, API_SECRET).with_location(self.addr.as_str()))
            .unwrap()
    }

    /// Queue a JSON response for the next request
    pub fn respond(&self, status: u16, body: Value) {
        self.respond_raw(status, body.to_string());
    }

    pub fn respond_raw(&self, status: u16, body: impl Into<String>) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back((StatusCode::from_u16(status).unwrap(), body.into()));
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The only request received so far
    pub fn single_request(&self) -> CapturedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

async fn capture(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let query = uri
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    state.requests.lock().unwrap().push(CapturedRequest {
        method,
        path: uri.path().to_string(),
        query,
        headers,
        body: body.to_vec(),
    });

    let (status, body) = state
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::OK, "{}".to_string()));

    (status, [("content-type", "application/json")], body)
}
