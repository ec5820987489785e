//! Sign-up and sign-in against the backend.
//!
//! Both calls store the returned credential before returning, so a caller
//! that sees `Ok` also has a session, unless `persistence` says the keychain
//! write failed.

use super::client::{decode, ApiClient};
use super::credentials::StoreOutcome;
use super::transport::{LocalImage, MultipartForm, Transport};
use super::types::{AuthResponse, Profile, SignInRequest, SignUpForm};
use crate::error::ApiError;

/// Result of a successful authentication call.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEstablished {
    /// Profile fields returned alongside the token, if any.
    pub profile: Option<Profile>,
    /// Whether the credential reached secure storage. `NotPersisted` means
    /// the server accepted the user but the session will not survive.
    pub persistence: StoreOutcome,
}

/// POST /auth/signup as multipart (username, email, password, image).
pub async fn sign_up<T: Transport>(
    client: &ApiClient<T>,
    form: &SignUpForm,
) -> Result<SessionEstablished, ApiError> {
    let username = require("username", &form.username)?;
    let email = require("email", &form.email)?;
    if form.password.is_empty() {
        return Err(ApiError::Precondition("password is required".to_string()));
    }

    let mut multipart = MultipartForm::new()
        .text("username", username)
        .text("email", email)
        .text("password", form.password.as_str());

    if let Some(raw) = form.image.as_deref().filter(|raw| !raw.trim().is_empty()) {
        let local = LocalImage::from_reference(raw).ok_or_else(|| {
            ApiError::Precondition(format!("avatar '{}' is not a local file", raw))
        })?;
        multipart = multipart.file("image", local);
    }

    log::info!("Signing up {}", username);
    let resp = client.post_multipart("/auth/signup", multipart).await?;
    establish(client, decode(&resp)?)
}

/// POST /auth/signin with a JSON body.
pub async fn sign_in<T: Transport>(
    client: &ApiClient<T>,
    request: &SignInRequest,
) -> Result<SessionEstablished, ApiError> {
    let has_identifier = [&request.email, &request.username]
        .iter()
        .any(|id| id.as_deref().is_some_and(|s| !s.trim().is_empty()));
    if !has_identifier || request.password.is_empty() {
        return Err(ApiError::Precondition(
            "email or username and password are required".to_string(),
        ));
    }

    log::info!("Signing in");
    let resp = client.post_json("/auth/signin", request).await?;
    establish(client, decode(&resp)?)
}

fn establish<T: Transport>(
    client: &ApiClient<T>,
    body: serde_json::Value,
) -> Result<SessionEstablished, ApiError> {
    let auth = AuthResponse::from_value(body).map_err(ApiError::Decode)?;
    let persistence = client.session().establish(&auth.token);
    Ok(SessionEstablished {
        profile: auth.profile,
        persistence,
    })
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Precondition(format!("{} is required", field)));
    }
    Ok(trimmed)
}
