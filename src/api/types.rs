//! Request and response types for the recipe backend.
//!
//! The backend is document-oriented: identifiers arrive as `_id`, and
//! references (categories, owners) may come back either as bare ids or as
//! embedded documents depending on whether the endpoint populates them.

use serde::{Deserialize, Serialize};

use crate::images::{DisplayImage, ImageResolver};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
}

impl Category {
    /// Case-insensitive, whitespace-trimmed name comparison.
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

/// Canonical form used to compare category names.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Body of POST /category.
#[derive(Debug, Serialize)]
pub struct CreateCategoryRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Difficulty {
    #[serde(alias = "easy", alias = "EASY")]
    Easy,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "hard", alias = "HARD")]
    Hard,
}

impl Difficulty {
    /// Map the 1..=3 slider level used by the recipe form.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(Difficulty::Easy),
            "medium" | "2" => Ok(Difficulty::Medium),
            "hard" | "3" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A category as referenced from a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(String),
    Embedded(Category),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Embedded(category) => &category.id,
        }
    }
}

/// Minimal user document embedded in other payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(String),
    Embedded(UserSummary),
}

impl OwnerRef {
    pub fn id(&self) -> &str {
        match self {
            OwnerRef::Id(id) => id,
            OwnerRef::Embedded(user) => &user.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub time: u32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub calories: Option<u32>,
    /// Raw stored reference; resolve with [`Recipe::image_uri`].
    #[serde(default)]
    pub image: String,
    #[serde(default, alias = "user")]
    pub owner: Option<OwnerRef>,
}

impl Recipe {
    pub fn image_uri(&self, resolver: &ImageResolver) -> DisplayImage {
        resolver.resolve_str(Some(&self.image))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

impl Profile {
    pub fn image_uri(&self, resolver: &ImageResolver) -> DisplayImage {
        resolver.resolve_str(Some(&self.image))
    }
}

/// Body of POST /auth/signin. Exactly one identifier is sent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignInRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

impl SignInRequest {
    pub fn with_email(email: &str, password: &str) -> Self {
        Self {
            email: Some(email.trim().to_string()),
            username: None,
            password: password.to_string(),
        }
    }

    pub fn with_username(username: &str, password: &str) -> Self {
        Self {
            email: None,
            username: Some(username.trim().to_string()),
            password: password.to_string(),
        }
    }

    /// Treat logins containing `@` as email addresses.
    pub fn from_login(login: &str, password: &str) -> Self {
        if login.contains('@') {
            Self::with_email(login, password)
        } else {
            Self::with_username(login, password)
        }
    }
}

/// Fields of the multipart POST /auth/signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Raw on-device reference of the avatar, if one was picked.
    pub image: Option<String>,
}

/// Input to recipe creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    pub ingredients: Vec<String>,
    pub category_ids: Vec<String>,
    pub time: u32,
    pub difficulty: Difficulty,
    pub calories: Option<u32>,
    /// Raw on-device reference of the picked image.
    pub image: String,
}

/// Token plus whatever profile fields the auth endpoint returned.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Option<Profile>,
}

impl AuthResponse {
    /// Accepts `{token}`, `{token, ...profile}` and `{token, user: {...}}`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let token = value
            .get("token")
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "response missing 'token'".to_string())?
            .to_string();

        let profile = value
            .get("user")
            .cloned()
            .and_then(|user| serde_json::from_value::<Profile>(user).ok())
            .or_else(|| serde_json::from_value::<Profile>(value).ok());

        Ok(Self { token, profile })
    }
}
