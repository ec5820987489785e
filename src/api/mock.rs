//! Scripted transport for unit tests.
//!
//! Responses are served front-to-back; every request is recorded so tests can
//! assert on what was sent and how many calls reached the network.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<ApiResponse, String>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(ApiResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn ok(self, body: &str) -> Self {
        self.respond(200, body)
    }

    pub fn created(self, body: &str) -> Self {
        self.respond(201, body)
    }

    pub fn fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        // Yield so concurrent callers interleave the way real I/O would.
        tokio::task::yield_now().await;
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Network(message)),
            None => Err(TransportError::Network("no scripted response".to_string())),
        }
    }
}
