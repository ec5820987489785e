//! Backend API layer.
//!
//! Provides the HTTP client with bearer injection, keychain credential
//! storage, the transport seam, wire types, and one module of endpoint calls
//! per backend resource.

pub mod auth;
pub mod categories;
pub mod client;
pub mod credentials;
#[cfg(test)]
pub(crate) mod mock;
pub mod recipes;
pub mod transport;
pub mod types;
pub mod users;
