//! Session and resource-synchronization layer of the RecipeBox client.
//!
//! Persists the session credential and attaches it to backend calls, turns
//! stored image references into displayable URIs, and performs
//! create-or-reuse mutations (categories) and multipart recipe submission.
//! Views sit on top of [`mutator::ResourceMutator`] and never talk HTTP
//! themselves.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod images;
pub mod mutator;
pub mod session;

use std::sync::Arc;

use api::client::ApiClient;
use api::credentials::KeychainStore;
use api::transport::ReqwestTransport;

pub use error::ApiError;
pub use images::{DisplayImage, ImageResolver, ImageSource};
pub use mutator::{CategoryResolution, ResourceMutator};
pub use session::{CurrentSession, LogoutOutcome, Session};

/// Wire the production stack: keychain credential store and reqwest transport.
pub fn connect(config: &config::ClientConfig) -> ResourceMutator<ReqwestTransport> {
    let store = KeychainStore::with_key(&config.keyring_service, &config.credential_key);
    let session = Session::new(Arc::new(store));
    let transport = ReqwestTransport::new(config.request_timeout, config.connect_timeout);
    log::info!("RecipeBox client targeting {}", config.base_url);
    ResourceMutator::new(ApiClient::new(&config.base_url, transport, session))
}
