//! Recipe endpoints.
//!
//! Creation is a multipart POST carrying the scalar fields, one repeated field
//! per list, and the picked image as the single file part. Every local check
//! runs before anything is sent.

use super::client::{decode, ApiClient};
use super::transport::{LocalImage, MultipartForm, Transport};
use super::types::{NewRecipe, Recipe};
use crate::error::ApiError;

/// GET /recipe
pub async fn list_recipes<T: Transport>(client: &ApiClient<T>) -> Result<Vec<Recipe>, ApiError> {
    client.get_json("/recipe").await
}

/// GET /recipe/{id}, falling back to the legacy /recipes/{id} route when the
/// canonical one reports 404.
pub async fn get_recipe<T: Transport>(client: &ApiClient<T>, id: &str) -> Result<Recipe, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::Precondition("recipe id is required".to_string()));
    }
    let encoded = urlencoding::encode(id);
    match client.get_json(&format!("/recipe/{}", encoded)).await {
        Err(ApiError::NotFound(_)) => {
            log::debug!("Recipe {} not on /recipe, trying /recipes", id);
            client.get_json(&format!("/recipes/{}", encoded)).await
        }
        other => other,
    }
}

/// POST /recipe as multipart.
pub async fn create_recipe<T: Transport>(
    client: &ApiClient<T>,
    recipe: &NewRecipe,
) -> Result<Recipe, ApiError> {
    let form = recipe_form(recipe)?;
    log::info!("Creating recipe '{}'", recipe.name.trim());
    let resp = client.post_multipart("/recipe", form).await?;
    decode(&resp)
}

/// Validate a recipe and build its multipart body.
pub fn recipe_form(recipe: &NewRecipe) -> Result<MultipartForm, ApiError> {
    let name = recipe.name.trim();
    if name.is_empty() {
        return Err(ApiError::Precondition("recipe name is required".to_string()));
    }
    let steps = non_blank(&recipe.steps);
    if steps.is_empty() {
        return Err(ApiError::Precondition("at least one step is required".to_string()));
    }
    let ingredients = non_blank(&recipe.ingredients);
    if ingredients.is_empty() {
        return Err(ApiError::Precondition(
            "at least one ingredient is required".to_string(),
        ));
    }
    if recipe.image.trim().is_empty() {
        return Err(ApiError::Precondition("an image is required".to_string()));
    }
    let image = LocalImage::from_reference(&recipe.image).ok_or_else(|| {
        ApiError::Precondition(format!(
            "image '{}' is not a local file reference",
            recipe.image.trim()
        ))
    })?;

    let mut form = MultipartForm::new()
        .text("name", name)
        .text("description", recipe.description.trim())
        .text("time", recipe.time.to_string())
        .text("difficulty", recipe.difficulty.as_str());
    if let Some(calories) = recipe.calories {
        form = form.text("calories", calories.to_string());
    }
    Ok(form
        .repeated("steps", steps)
        .repeated("ingredients", ingredients)
        .repeated("categories", non_blank(&recipe.category_ids))
        .file("image", image))
}

fn non_blank(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}
