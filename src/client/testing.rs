//! Scripted transport for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use super::transport::{HttpRequest, HttpResponse, Transport};
use super::{ApiClient, Credentials, Error};

/// Replay canned responses in order and record every request
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, Error>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn push(&self, status: StatusCode, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body.as_bytes())));
    }

    pub fn push_json(&self, status: StatusCode, body: serde_json::Value) {
        self.push(status, &body.to_string());
    }

    pub fn push_error(&self, err: Error) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path?query` of every request, in order
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| match request.url.query() {
                Some(query) => format!("{} {}?{}", request.method, request.url.path(), query),
                None => format!("{} {}", request.method, request.url.path()),
            })
            .collect()
    }

    pub fn body(&self, index: usize) -> serde_json::Value {
        let requests = self.requests();
        serde_json::from_slice(requests[index].body.as_deref().unwrap_or(b"null")).unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn client(self: &Arc<Self>) -> ApiClient {
        ApiClient::new(
            "https://api.confluent.cloud".parse().unwrap(),
            Some(Credentials::new("CLOUD_KEY", "CLOUD_SECRET")),
            self.clone(),
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Configuration(format!("unexpected request {description}"))))
    }
}
