//! HTTP client with credential injection and response classification.
//!
//! Before every call the stored credential is read fresh; if one exists it is
//! sent as `Authorization: Bearer <token>`, otherwise the request goes out
//! unauthenticated. Non-2xx responses are mapped onto [`ApiError`]. Nothing
//! here retries.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::transport::{
    ApiRequest, ApiResponse, HttpMethod, MultipartForm, RequestBody, Transport, TransportError,
};
use crate::error::ApiError;
use crate::session::{CurrentSession, Session, SessionToken};

/// HTTP client wrapper for the recipe backend.
pub struct ApiClient<T: Transport> {
    transport: T,
    base_url: String,
    session: Session,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: &str, transport: T, session: Session) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(HttpMethod::Get, path, RequestBody::Empty).await
    }

    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Precondition(format!("request body not serializable: {}", e)))?;
        self.send(HttpMethod::Post, path, RequestBody::Json(value)).await
    }

    pub async fn post_multipart(&self, path: &str, form: MultipartForm) -> Result<ApiResponse, ApiError> {
        self.send(HttpMethod::Post, path, RequestBody::Multipart(form)).await
    }

    /// GET and decode a JSON payload.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        decode(&self.get(path).await?)
    }

    async fn send(&self, method: HttpMethod, path: &str, body: RequestBody) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let bearer = self.bearer();
        let sent_token = bearer.clone();

        log::debug!(
            "{:?} {} ({})",
            method,
            url,
            if bearer.is_some() { "authenticated" } else { "anonymous" }
        );

        let request = ApiRequest {
            method,
            url,
            bearer,
            body,
        };

        let response = self.transport.execute(request).await.map_err(|e| match e {
            TransportError::Network(msg) => ApiError::Network(msg),
            TransportError::LocalFile { path, reason } => {
                ApiError::Precondition(format!("image {} is not readable: {}", path, reason))
            }
        })?;

        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_status(response.status, &response.body);
        if let ApiError::Auth(ref message) = err {
            if let Some(rejected) = sent_token {
                log::info!("Credential rejected ({})", message);
                // A newer credential stored while the request was in flight stays.
                match self.session.end_if_current(&rejected) {
                    Some(outcome) => log::debug!("Session cleanup after 401: {:?}", outcome),
                    None => log::info!("Stored credential changed since the request, keeping it"),
                }
            }
        } else {
            log::debug!("{} failed with {}", path, response.status);
        }
        Err(err)
    }

    fn bearer(&self) -> Option<SessionToken> {
        match self.session.current() {
            Ok(CurrentSession::Authenticated(token)) => Some(token),
            Ok(CurrentSession::Anonymous) => None,
            Err(e) => {
                log::warn!("Credential unreadable, sending request without it: {}", e);
                None
            }
        }
    }
}

/// Decode a successful response body.
pub fn decode<R: DeserializeOwned>(response: &ApiResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}
