//! End-to-end tests over real HTTP.
//!
//! Starts an in-process recipe backend (axum) on a random port, then drives
//! the client through `ReqwestTransport`: JSON sign-in, bearer injection,
//! category conflicts, multipart uploads and the profile gate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use recipebox_session::api::client::ApiClient;
use recipebox_session::api::credentials::MemoryStore;
use recipebox_session::api::transport::ReqwestTransport;
use recipebox_session::api::types::{Difficulty, NewRecipe, SignInRequest, SignUpForm};
use recipebox_session::api::users::ProfileResult;
use recipebox_session::{ApiError, CategoryResolution, ResourceMutator, Session};

// ── In-process backend ───────────────────────────────────────────────

#[derive(Default)]
struct Backend {
    categories: Vec<Value>,
    recipes: Vec<Value>,
    /// token -> username
    tokens: HashMap<String, String>,
    /// (file name, byte count) of every uploaded image
    uploads: Vec<(String, usize)>,
    category_posts: usize,
}

type Db = Arc<Mutex<Backend>>;

fn app(db: Db) -> Router {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/category", get(list_categories).post(create_category))
        .route("/api/recipe", get(list_recipes).post(create_recipe))
        .route("/api/recipe/{id}", get(get_recipe))
        .route("/api/user", get(profile))
        .with_state(db)
}

fn bearer_user(db: &Backend, headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    db.tokens.get(token).cloned()
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})))
}

async fn sign_in(State(db): State<Db>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let user = body["username"]
        .as_str()
        .or_else(|| body["email"].as_str())
        .unwrap_or_default()
        .to_string();
    if body["password"] != "pw" {
        return unauthorized();
    }
    let token = format!("tok-{}", user);
    db.lock().unwrap().tokens.insert(token.clone(), user);
    (StatusCode::OK, Json(json!({ "token": token })))
}

async fn read_form(mut multipart: Multipart) -> (HashMap<String, Vec<String>>, Option<(String, usize)>) {
    let mut fields: HashMap<String, Vec<String>> = HashMap::new();
    let mut file = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await.unwrap();
                file = Some((file_name, bytes.len()));
            }
            None => {
                let text = field.text().await.unwrap();
                fields.entry(name).or_default().push(text);
            }
        }
    }
    (fields, file)
}

async fn sign_up(State(db): State<Db>, multipart: Multipart) -> (StatusCode, Json<Value>) {
    let (fields, file) = read_form(multipart).await;
    let username = fields["username"][0].clone();
    let token = format!("tok-{}", username);
    let mut db = db.lock().unwrap();
    db.tokens.insert(token.clone(), username.clone());
    if let Some(upload) = file.clone() {
        db.uploads.push(upload);
    }
    let image = file.map(|(name, _)| format!("uploads/{}", name)).unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "_id": format!("u-{}", username),
            "username": username,
            "email": fields["email"][0],
            "image": image,
        })),
    )
}

async fn list_categories(State(db): State<Db>) -> Json<Value> {
    Json(Value::Array(db.lock().unwrap().categories.clone()))
}

async fn create_category(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut db = db.lock().unwrap();
    if bearer_user(&db, &headers).is_none() {
        return unauthorized();
    }
    db.category_posts += 1;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let taken = db
        .categories
        .iter()
        .any(|c| c["name"].as_str().unwrap_or_default().eq_ignore_ascii_case(&name));
    if taken {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Category already exists"})),
        );
    }
    let category = json!({"_id": format!("c{}", db.categories.len() + 1), "name": name});
    db.categories.push(category.clone());
    (StatusCode::CREATED, Json(category))
}

async fn list_recipes(State(db): State<Db>) -> Json<Value> {
    Json(Value::Array(db.lock().unwrap().recipes.clone()))
}

async fn get_recipe(State(db): State<Db>, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    let db = db.lock().unwrap();
    match db.recipes.iter().find(|r| r["_id"] == id.as_str()) {
        Some(recipe) => (StatusCode::OK, Json(recipe.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Recipe not found"}))),
    }
}

async fn create_recipe(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let authorized = bearer_user(&db.lock().unwrap(), &headers).is_some();
    if !authorized {
        return unauthorized();
    }
    let (fields, file) = read_form(multipart).await;
    let Some((file_name, size)) = file else {
        return (StatusCode::BAD_REQUEST, Json(json!({"errors": {"image": "is required"}})));
    };
    let mut db = db.lock().unwrap();
    let owner = bearer_user(&db, &headers).unwrap_or_default();
    db.uploads.push((file_name.clone(), size));
    let recipe = json!({
        "_id": format!("r{}", db.recipes.len() + 1),
        "name": fields["name"][0],
        "description": fields.get("description").map(|d| d[0].clone()).unwrap_or_default(),
        "steps": fields.get("steps").cloned().unwrap_or_default(),
        "ingredients": fields.get("ingredients").cloned().unwrap_or_default(),
        "categories": fields.get("categories").cloned().unwrap_or_default(),
        "time": fields["time"][0].parse::<u32>().unwrap_or(1),
        "difficulty": fields["difficulty"][0],
        "calories": fields.get("calories").and_then(|c| c[0].parse::<u32>().ok()),
        "image": format!("uploads/{}", file_name),
        "user": owner,
    });
    db.recipes.push(recipe.clone());
    (StatusCode::CREATED, Json(recipe))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let db = db.lock().unwrap();
    let Some(user) = bearer_user(&db, &headers) else {
        return unauthorized();
    };
    let recipes: Vec<Value> = db
        .recipes
        .iter()
        .filter(|r| r["user"] == user.as_str())
        .cloned()
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "_id": format!("u-{}", user),
            "username": user,
            "email": format!("{}@example.com", user),
            "image": "uploads/avatar one.png",
            "recipes": recipes,
        })),
    )
}

// ── Helpers ──────────────────────────────────────────────────────────

async fn start() -> (String, Db) {
    let db: Db = Arc::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(Arc::clone(&db));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}/api", addr), db)
}

fn client(base_url: &str) -> ResourceMutator<ReqwestTransport> {
    let session = Session::new(Arc::new(MemoryStore::new()));
    ResourceMutator::new(ApiClient::new(base_url, ReqwestTransport::default(), session))
}

fn write_image(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("recipebox-{}-{}", std::process::id(), name));
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).unwrap();
    path
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_then_profile_over_http() {
    let (base, _db) = start().await;
    let m = client(&base);

    assert_eq!(m.get_profile().await.unwrap(), ProfileResult::Unauthenticated);

    m.sign_in(&SignInRequest::with_username("chef", "pw")).await.unwrap();
    let ProfileResult::Profile(profile) = m.get_profile().await.unwrap() else {
        panic!("expected profile after sign-in");
    };
    assert_eq!(profile.username, "chef");

    let resolver = recipebox_session::ImageResolver::new(&base);
    let avatar = profile.image_uri(&resolver);
    assert_eq!(
        avatar.uri().unwrap(),
        format!("{}/uploads/avatar%20one.png", base.trim_end_matches("/api"))
    );
}

#[tokio::test]
async fn test_wrong_password_is_auth_error() {
    let (base, _db) = start().await;
    let m = client(&base);
    let err = m
        .sign_in(&SignInRequest::with_username("chef", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
    assert!(!m.session().current().unwrap().is_authenticated());
}

#[tokio::test]
async fn test_category_conflict_between_two_clients() {
    let (base, db) = start().await;
    let alice = client(&base);
    let bob = client(&base);
    alice.sign_in(&SignInRequest::with_username("alice", "pw")).await.unwrap();
    bob.sign_in(&SignInRequest::with_username("bob", "pw")).await.unwrap();

    // Both load the (empty) list before either creates.
    alice.refresh_categories().await.unwrap();
    bob.refresh_categories().await.unwrap();

    let a = alice.create_category("Spicy").await.unwrap();
    let b = bob.create_category("spicy").await.unwrap();

    assert!(matches!(a, CategoryResolution::Created(_)));
    assert!(matches!(b, CategoryResolution::RecoveredFromConflict(_)));
    assert_eq!(a.category(), b.category());
    assert_eq!(b.category().name, "Spicy");

    let db = db.lock().unwrap();
    assert_eq!(db.categories.len(), 1);
    assert_eq!(db.category_posts, 2);
}

#[tokio::test]
async fn test_create_category_requires_credential() {
    let (base, _db) = start().await;
    let m = client(&base);
    let err = m.create_category("Soup").await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
}

#[tokio::test]
async fn test_multipart_recipe_upload() {
    let (base, db) = start().await;
    let m = client(&base);
    m.sign_in(&SignInRequest::with_email("chef@example.com", "pw")).await.unwrap();
    let category = m.create_category("Soup").await.unwrap().into_category();

    let image = write_image("pho bowl.jpg");
    let recipe = NewRecipe {
        name: "Pho".into(),
        description: "Broth and noodles".into(),
        steps: vec!["simmer bones".into(), "assemble".into()],
        ingredients: vec!["beef bones".into(), "rice noodles".into()],
        category_ids: vec![category.id.clone()],
        time: 6,
        difficulty: Difficulty::Hard,
        calories: Some(650),
        image: image.display().to_string(),
    };
    let created = m.create_recipe(&recipe).await.unwrap();
    std::fs::remove_file(&image).ok();

    assert_eq!(created.steps, vec!["simmer bones", "assemble"]);
    assert_eq!(created.ingredients, vec!["beef bones", "rice noodles"]);
    assert_eq!(created.categories.len(), 1);
    assert_eq!(created.categories[0].id(), category.id);
    assert_eq!(created.difficulty, Difficulty::Hard);
    assert_eq!(created.calories, Some(650));

    {
        let db = db.lock().unwrap();
        assert_eq!(db.uploads.len(), 1);
        assert!(db.uploads[0].0.ends_with("pho bowl.jpg"));
        assert_eq!(db.uploads[0].1, 6);
    }

    let fetched = m.get_recipe(&created.id).await.unwrap();
    assert_eq!(fetched.name, "Pho");
    assert_eq!(m.list_recipes().await.unwrap().len(), 1);

    let ProfileResult::Profile(profile) = m.get_profile().await.unwrap() else {
        panic!("expected profile");
    };
    assert_eq!(profile.recipes.len(), 1);
}

#[tokio::test]
async fn test_unreadable_image_is_precondition_and_nothing_uploaded() {
    let (base, db) = start().await;
    let m = client(&base);
    m.sign_in(&SignInRequest::with_username("chef", "pw")).await.unwrap();

    let recipe = NewRecipe {
        name: "Ghost".into(),
        description: String::new(),
        steps: vec!["boo".into()],
        ingredients: vec!["ectoplasm".into()],
        category_ids: vec![],
        time: 1,
        difficulty: Difficulty::Easy,
        calories: None,
        image: "/nonexistent/recipebox/ghost.jpg".into(),
    };
    let err = m.create_recipe(&recipe).await.unwrap_err();
    assert!(matches!(err, ApiError::Precondition(_)));
    assert!(db.lock().unwrap().recipes.is_empty());
}

#[tokio::test]
async fn test_sign_up_with_avatar_then_logout() {
    let (base, db) = start().await;
    let m = client(&base);
    let avatar = write_image("me.png");

    let out = m
        .sign_up(&SignUpForm {
            username: "newcook".into(),
            email: "new@example.com".into(),
            password: "pw".into(),
            image: Some(format!("file://{}", avatar.display())),
        })
        .await
        .unwrap();
    std::fs::remove_file(&avatar).ok();

    assert!(out.persistence.is_persisted());
    assert_eq!(out.profile.unwrap().username, "newcook");
    assert_eq!(db.lock().unwrap().uploads.len(), 1);

    assert_eq!(m.logout().await, recipebox_session::LogoutOutcome::LoggedOut);
    assert_eq!(m.get_profile().await.unwrap(), ProfileResult::Unauthenticated);
}

#[tokio::test]
async fn test_missing_recipe_is_not_found() {
    let (base, _db) = start().await;
    let m = client(&base);
    let err = m.get_recipe("nope").await.unwrap_err();
    // Both the canonical and legacy routes report 404.
    assert!(matches!(err, ApiError::NotFound(_)));
}
