//! Category endpoints.
//!
//! These are the raw calls. Create-or-reuse and conflict recovery live in
//! `ResourceMutator`, which owns the known-category list.

use super::client::{decode, ApiClient};
use super::transport::Transport;
use super::types::{Category, CreateCategoryRequest};
use crate::error::ApiError;

/// GET /category
pub async fn list_categories<T: Transport>(client: &ApiClient<T>) -> Result<Vec<Category>, ApiError> {
    client.get_json("/category").await
}

/// POST /category. A duplicate name comes back as `ApiError::Conflict`.
pub async fn create_category<T: Transport>(
    client: &ApiClient<T>,
    name: &str,
) -> Result<Category, ApiError> {
    let resp = client
        .post_json("/category", &CreateCategoryRequest { name })
        .await?;
    decode(&resp)
}

/// First category whose name matches case-insensitively.
pub fn find_by_name<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.matches_name(name))
}
