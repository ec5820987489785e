//! Cache keys shared with the UI-side query cache.
//!
//! The client layer does not cache responses itself. It only promises that
//! every successful mutation names the queries it made stale, using the same
//! keys the views fetch under.

/// A cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Categories,
    Recipes,
    Recipe(String),
    Profile,
}

impl QueryKey {
    /// Key segments as the view layer spells them.
    pub fn parts(&self) -> Vec<String> {
        match self {
            QueryKey::Categories => vec!["Category".to_string()],
            QueryKey::Recipes => vec!["Recipes".to_string()],
            QueryKey::Recipe(id) => vec!["Recipe".to_string(), id.clone()],
            QueryKey::Profile => vec!["Profile".to_string()],
        }
    }
}

/// Mutations performed through `ResourceMutator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SignIn,
    SignUp,
    Logout,
    CreateCategory,
    CreateRecipe { id: String },
}

impl Mutation {
    pub fn invalidates(&self) -> Vec<QueryKey> {
        match self {
            Mutation::SignIn | Mutation::SignUp => vec![QueryKey::Profile],
            Mutation::Logout => vec![
                QueryKey::Profile,
                QueryKey::Categories,
                QueryKey::Recipes,
            ],
            Mutation::CreateCategory => vec![QueryKey::Categories],
            Mutation::CreateRecipe { id } => vec![
                QueryKey::Recipes,
                QueryKey::Recipe(id.clone()),
                QueryKey::Profile,
            ],
        }
    }
}
