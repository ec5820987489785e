//! `recipebox`: drive the client layer from a terminal against a live backend.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use recipebox_session::api::transport::ReqwestTransport;
use recipebox_session::api::types::{Difficulty, NewRecipe, SignInRequest, SignUpForm};
use recipebox_session::api::users::ProfileResult;
use recipebox_session::config::ClientConfig;
use recipebox_session::{ApiError, ImageResolver, LogoutOutcome, ResourceMutator};

#[derive(Parser, Debug)]
#[command(name = "recipebox", about = "RecipeBox session and sync client")]
struct Args {
    /// Override the API base URL from the environment
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with an email address or username
    SignIn {
        login: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Local path of an avatar image
        #[arg(long)]
        image: Option<String>,
    },
    /// Forget the stored credential
    Logout,
    /// Show the signed-in profile
    Whoami,
    /// List categories
    Categories,
    /// Create a category, reusing an existing one with the same name
    AddCategory { name: String },
    /// List recipes
    Recipes,
    /// Show one recipe
    Recipe { id: String },
    /// Submit a recipe with an image
    CreateRecipe {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
        #[arg(long = "ingredient", required = true)]
        ingredients: Vec<String>,
        /// Category id (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Preparation time in hours
        #[arg(long, default_value_t = 1)]
        time: u32,
        #[arg(long, default_value = "Easy")]
        difficulty: Difficulty,
        #[arg(long)]
        calories: Option<u32>,
        /// Local path of the recipe image
        #[arg(long)]
        image: String,
    },
    /// Print the display URI for a stored image reference
    ResolveImage { raw: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.base_url = url;
    }

    let resolver = ImageResolver::new(&config.base_url);
    let mutator = recipebox_session::connect(&config);

    match run(args.command, &mutator, &resolver).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let ApiError::Validation { fields, .. } = &e {
                for (field, messages) in fields {
                    eprintln!("  {}: {}", field, messages.join(", "));
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    mutator: &ResourceMutator<ReqwestTransport>,
    resolver: &ImageResolver,
) -> Result<(), ApiError> {
    match command {
        Command::SignIn { login, password } => {
            let out = mutator
                .sign_in(&SignInRequest::from_login(&login, &password))
                .await?;
            if !out.persistence.is_persisted() {
                eprintln!("warning: signed in, but the credential could not be saved");
            }
            println!("signed in");
        }
        Command::SignUp {
            username,
            email,
            password,
            image,
        } => {
            let form = SignUpForm {
                username,
                email,
                password,
                image,
            };
            let out = mutator.sign_up(&form).await?;
            if !out.persistence.is_persisted() {
                eprintln!("warning: account created, but the credential could not be saved");
            }
            println!("signed up");
        }
        Command::Logout => match mutator.logout().await {
            LogoutOutcome::LoggedOut => println!("logged out"),
            other => {
                eprintln!("logout not confirmed: {:?}", other);
                return Err(ApiError::Precondition(
                    "stored credential could not be removed".to_string(),
                ));
            }
        },
        Command::Whoami => match mutator.get_profile().await? {
            ProfileResult::Profile(profile) => {
                println!("{} <{}>", profile.username, profile.email);
                if let Some(uri) = profile.image_uri(resolver).uri() {
                    println!("avatar: {}", uri);
                }
                for recipe in &profile.recipes {
                    println!("  {}  {}", recipe.id, recipe.name);
                }
            }
            ProfileResult::Unauthenticated => println!("not signed in"),
        },
        Command::Categories => {
            for category in mutator.refresh_categories().await? {
                println!("{}  {}", category.id, category.name);
            }
        }
        Command::AddCategory { name } => {
            let resolution = mutator.create_category(&name).await?;
            let category = resolution.category();
            println!("{}  {}  ({:?})", category.id, category.name, resolution);
        }
        Command::Recipes => {
            for recipe in mutator.list_recipes().await? {
                println!(
                    "{}  {}  [{}]",
                    recipe.id,
                    recipe.name,
                    recipe.difficulty.as_str()
                );
            }
        }
        Command::Recipe { id } => {
            let recipe = mutator.get_recipe(&id).await?;
            println!("{} ({}, {}h)", recipe.name, recipe.difficulty.as_str(), recipe.time);
            if !recipe.description.is_empty() {
                println!("{}", recipe.description);
            }
            for (i, step) in recipe.steps.iter().enumerate() {
                println!("  {}. {}", i + 1, step);
            }
            for ingredient in &recipe.ingredients {
                println!("  - {}", ingredient);
            }
            if let Some(uri) = recipe.image_uri(resolver).uri() {
                println!("image: {}", uri);
            }
        }
        Command::CreateRecipe {
            name,
            description,
            steps,
            ingredients,
            categories,
            time,
            difficulty,
            calories,
            image,
        } => {
            let recipe = NewRecipe {
                name,
                description,
                steps,
                ingredients,
                category_ids: categories,
                time,
                difficulty,
                calories,
                image,
            };
            let created = mutator.create_recipe(&recipe).await?;
            println!("created {}  {}", created.id, created.name);
        }
        Command::ResolveImage { raw } => match resolver.resolve_str(Some(&raw)).uri() {
            Some(uri) => println!("{}", uri),
            None => println!("(no image)"),
        },
    }
    Ok(())
}
