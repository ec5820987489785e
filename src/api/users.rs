//! Profile of the signed-in user.

use super::client::ApiClient;
use super::transport::Transport;
use super::types::Profile;
use crate::error::ApiError;
use crate::session::CurrentSession;

/// Outcome of a profile lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileResult {
    Profile(Profile),
    /// No credential is stored; nothing was sent.
    Unauthenticated,
}

/// GET /user, only when a credential is stored.
///
/// A credential the server rejects still surfaces as `ApiError::Auth` (and is
/// cleared by the client).
pub async fn get_profile<T: Transport>(client: &ApiClient<T>) -> Result<ProfileResult, ApiError> {
    match client.session().current()? {
        CurrentSession::Anonymous => {
            log::debug!("No stored credential, skipping profile fetch");
            Ok(ProfileResult::Unauthenticated)
        }
        CurrentSession::Authenticated(_) => {
            let profile = client.get_json("/user").await?;
            Ok(ProfileResult::Profile(profile))
        }
    }
}
