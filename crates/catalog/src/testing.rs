//! Canned-response transport for tests.
//!
//! Routes match on method and exact URL (query parameters are recorded but
//! not matched). POST routes may additionally require a substring of the
//! serialized JSON body, which is how AniList queries are told apart.
//! Unmatched requests answer 404.

use crate::api::{RawResponse, Transport};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

struct Route {
    method: Method,
    url: String,
    body_contains: Option<String>,
    response: RawResponse,
}

/// Transport answering from a fixed routing table
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET `url` with `status` and `body`
    pub fn on_get(mut self, url: &str, status: u16, body: Value) -> Self {
        self.routes.push(Route {
            method: Method::Get,
            url: url.to_string(),
            body_contains: None,
            response: RawResponse::new(status, body.to_string()),
        });
        self
    }

    /// Answer POST `url` whose JSON body contains `needle`
    pub fn on_post(mut self, url: &str, needle: &str, status: u16, body: Value) -> Self {
        self.routes.push(Route {
            method: Method::Post,
            url: url.to_string(),
            body_contains: Some(needle.to_string()),
            response: RawResponse::new(status, body.to_string()),
        });
        self
    }

    /// Answer GET `url` with a raw (possibly non-JSON) body
    pub fn on_get_raw(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method: Method::Get,
            url: url.to_string(),
            body_contains: None,
            response: RawResponse::new(status, body),
        });
        self
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn answer(&self, call: RecordedCall) -> RawResponse {
        let serialized = call.body.as_ref().map(Value::to_string).unwrap_or_default();
        let response = self
            .routes
            .iter()
            .find(|route| {
                route.method == call.method
                    && route.url == call.url
                    && route
                        .body_contains
                        .as_ref()
                        .map_or(true, |needle| serialized.contains(needle.as_str()))
            })
            .map(|route| route.response.clone())
            .unwrap_or_else(|| RawResponse::new(404, r#"{"error":"not stubbed"}"#));

        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
        response
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse> {
        Ok(self.answer(RecordedCall {
            method: Method::Get,
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse> {
        Ok(self.answer(RecordedCall {
            method: Method::Post,
            url: url.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        }))
    }
}
