//! The HTTP seam between `ApiClient` and the network.
//!
//! `ApiClient` describes every call as an [`ApiRequest`] and hands it to a
//! [`Transport`]. Production uses [`ReqwestTransport`]; tests substitute a
//! scripted transport and count the calls that reach it.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{multipart, Client, Method};
use serde_json::Value;
use thiserror::Error;

use crate::images::has_scheme;
use crate::session::SessionToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request described as plain data.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Bearer credential to attach, if any. Exposed only when the request
    /// is written to the wire.
    pub bearer: Option<SessionToken>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// Scalar fields (repeated keys allowed, order kept) plus at most one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn repeated<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.fields.push((name.to_string(), value.into()));
        }
        self
    }

    pub fn file(mut self, field: &str, local: LocalImage) -> Self {
        self.file = Some(FilePart {
            field: field.to_string(),
            local,
        });
        self
    }

    /// All values sent under `name`, in order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub local: LocalImage,
}

/// An on-device image about to be uploaded.
///
/// Built from the raw picker reference, never from a resolved display URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
}

impl LocalImage {
    /// `None` for empty references and for remote URLs, which cannot be
    /// uploaded as a file part.
    pub fn from_reference(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let path = match raw.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("file://") => &raw[7..],
            _ if has_scheme(raw) => return None,
            _ => raw,
        };
        if path.is_empty() {
            return None;
        }
        let file_name = path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("image")
            .to_string();
        let mime = mime_for(&file_name).to_string();
        Some(Self {
            path: PathBuf::from(path),
            file_name,
            mime,
        })
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// A response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response.
    #[error("{0}")]
    Network(String),
    /// A local file part could not be read; nothing was sent.
    #[error("cannot read {path}: {reason}")]
    LocalFile { path: String, reason: String },
}

/// Executes requests. No retries happen at this level.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self { client }
    }

    async fn build_form(&self, form: MultipartForm) -> Result<multipart::Form, TransportError> {
        let mut out = multipart::Form::new();
        for (name, value) in form.fields {
            out = out.text(name, value);
        }
        if let Some(file) = form.file {
            let display_path = file.local.path.display().to_string();
            let bytes = tokio::fs::read(&file.local.path)
                .await
                .map_err(|e| TransportError::LocalFile {
                    path: display_path.clone(),
                    reason: e.to_string(),
                })?;
            let part = multipart::Part::bytes(bytes)
                .file_name(file.local.file_name)
                .mime_str(&file.local.mime)
                .map_err(|e| TransportError::LocalFile {
                    path: display_path,
                    reason: e.to_string(),
                })?;
            out = out.part(file.field, part);
        }
        Ok(out)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(120), Duration::from_secs(10))
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);

        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token.expose());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(self.build_form(form).await?),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read response: {}", e)))?;

        Ok(ApiResponse { status, body })
    }
}
