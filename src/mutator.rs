//! Domain mutations on top of `ApiClient`.
//!
//! `ResourceMutator` is what the UI calls. It establishes and ends sessions,
//! creates categories without producing duplicates, submits recipes, and
//! tells the UI-side cache which queries each mutation made stale.
//!
//! Category creation is create-or-reuse:
//! 1. Trim the name and refuse it if empty
//! 2. Wait behind any in-flight creation of the same name on this device
//! 3. Reuse a known category with a case-insensitively equal name
//! 4. Otherwise create it remotely
//! 5. On a conflict (someone else created it first), re-fetch and reuse
//!
//! Step 2 only collapses local double taps. Two devices can still race, so
//! correctness rests on the server rejecting the duplicate and on step 5.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::api::auth::{self, SessionEstablished};
use crate::api::categories;
use crate::api::client::ApiClient;
use crate::api::recipes;
use crate::api::transport::Transport;
use crate::api::types::{normalize_name, Category, NewRecipe, Recipe, SignInRequest, SignUpForm};
use crate::api::users::{self, ProfileResult};
use crate::cache::{Mutation, QueryKey};
use crate::error::ApiError;
use crate::session::{LogoutOutcome, Session};

/// Called with the stale query keys after each successful mutation.
pub type InvalidationHook = Box<dyn Fn(&[QueryKey]) + Send + Sync>;

/// How `create_category` produced its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryResolution {
    /// An existing category matched; nothing was sent.
    Reused(Category),
    Created(Category),
    /// The server reported a duplicate and the existing one was looked up.
    RecoveredFromConflict(Category),
}

impl CategoryResolution {
    pub fn category(&self) -> &Category {
        match self {
            CategoryResolution::Reused(c)
            | CategoryResolution::Created(c)
            | CategoryResolution::RecoveredFromConflict(c) => c,
        }
    }

    pub fn into_category(self) -> Category {
        match self {
            CategoryResolution::Reused(c)
            | CategoryResolution::Created(c)
            | CategoryResolution::RecoveredFromConflict(c) => c,
        }
    }
}

pub struct ResourceMutator<T: Transport> {
    api: ApiClient<T>,
    /// Last category list seen from the server. `None` until first fetched.
    known_categories: RwLock<Option<Vec<Category>>>,
    /// One gate per normalized category name with a creation in flight.
    category_gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    on_invalidate: Option<InvalidationHook>,
}

impl<T: Transport> ResourceMutator<T> {
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            known_categories: RwLock::new(None),
            category_gates: Mutex::new(HashMap::new()),
            on_invalidate: None,
        }
    }

    /// Register the UI cache's invalidation callback.
    pub fn with_invalidation_hook(mut self, hook: InvalidationHook) -> Self {
        self.on_invalidate = Some(hook);
        self
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SessionEstablished, ApiError> {
        let out = auth::sign_up(&self.api, form).await?;
        self.invalidate(Mutation::SignUp);
        Ok(out)
    }

    pub async fn sign_in(&self, request: &SignInRequest) -> Result<SessionEstablished, ApiError> {
        let out = auth::sign_in(&self.api, request).await?;
        self.invalidate(Mutation::SignIn);
        Ok(out)
    }

    /// End the session. Only `LogoutOutcome::LoggedOut` means the credential
    /// is confirmed gone.
    pub async fn logout(&self) -> LogoutOutcome {
        let outcome = self.session().end();
        *self.known_categories.write().await = None;
        self.invalidate(Mutation::Logout);
        outcome
    }

    /// Fetch the category list and remember it for reuse checks.
    pub async fn refresh_categories(&self) -> Result<Vec<Category>, ApiError> {
        let list = categories::list_categories(&self.api).await?;
        *self.known_categories.write().await = Some(list.clone());
        Ok(list)
    }

    /// Snapshot of the remembered category list.
    pub async fn known_categories(&self) -> Vec<Category> {
        self.known_categories
            .read()
            .await
            .clone()
            .unwrap_or_default()
    }

    pub async fn create_category(&self, name: &str) -> Result<CategoryResolution, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Precondition("category name is required".to_string()));
        }
        let key = normalize_name(name);

        let gate = self.category_gate(&key);
        let result = {
            let _held = gate.lock().await;
            self.create_or_reuse(name).await
        };
        self.release_category_gate(&key, &gate);

        if let Ok(CategoryResolution::Created(_) | CategoryResolution::RecoveredFromConflict(_)) =
            &result
        {
            self.invalidate(Mutation::CreateCategory);
        }
        result
    }

    async fn create_or_reuse(&self, name: &str) -> Result<CategoryResolution, ApiError> {
        if self.known_categories.read().await.is_none() {
            if let Err(e) = self.refresh_categories().await {
                log::warn!("Could not load categories before create: {}", e);
            }
        }

        if let Some(existing) = self.lookup(name).await {
            log::debug!("Reusing category '{}' for '{}'", existing.name, name);
            return Ok(CategoryResolution::Reused(existing));
        }

        match categories::create_category(&self.api, name).await {
            Ok(created) => {
                log::info!("Created category '{}' ({})", created.name, created.id);
                self.remember(created.clone()).await;
                Ok(CategoryResolution::Created(created))
            }
            Err(ApiError::Conflict(message)) => {
                log::warn!("Category '{}' already exists remotely ({}), looking it up", name, message);
                let list = self.refresh_categories().await?;
                match categories::find_by_name(&list, name) {
                    Some(existing) => Ok(CategoryResolution::RecoveredFromConflict(existing.clone())),
                    None => Err(ApiError::Conflict(message)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup(&self, name: &str) -> Option<Category> {
        let known = self.known_categories.read().await;
        known
            .as_deref()
            .and_then(|list| categories::find_by_name(list, name))
            .cloned()
    }

    async fn remember(&self, category: Category) {
        let mut known = self.known_categories.write().await;
        let list = known.get_or_insert_with(Vec::new);
        if !list.iter().any(|c| c.id == category.id) {
            list.push(category);
        }
    }

    fn category_gate(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self
            .category_gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn release_category_gate(&self, key: &str, gate: &Arc<AsyncMutex<()>>) {
        let mut gates = self
            .category_gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Map entry plus our handle: nobody else is waiting.
        if Arc::strong_count(gate) <= 2 {
            gates.remove(key);
        }
    }

    /// Validate and submit a recipe. Local checks run before any request.
    pub async fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, ApiError> {
        let created = recipes::create_recipe(&self.api, recipe).await?;
        self.invalidate(Mutation::CreateRecipe {
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub async fn list_recipes(&self) -> Result<Vec<Recipe>, ApiError> {
        recipes::list_recipes(&self.api).await
    }

    pub async fn get_recipe(&self, id: &str) -> Result<Recipe, ApiError> {
        recipes::get_recipe(&self.api, id).await
    }

    /// The signed-in user's profile, or `Unauthenticated` without a request
    /// when no credential is stored.
    pub async fn get_profile(&self) -> Result<ProfileResult, ApiError> {
        users::get_profile(&self.api).await
    }

    fn invalidate(&self, mutation: Mutation) {
        let keys = mutation.invalidates();
        log::debug!("{:?} invalidates {:?}", mutation, keys);
        if let Some(hook) = &self.on_invalidate {
            hook(&keys);
        }
    }
}
