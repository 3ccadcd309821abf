use anyhow::Context;
use clap::Parser;
use secrecy::Secret;

use api_gateway::{
    config::DatabaseConfig,
    db,
    models::{AccountType, NewUser, UserStatus},
    services::{CredentialStore, Database, StoreError},
    utils::{hash_password, validation::validate_password_shape, Password},
};
use service_core::observability::logging::init_tracing;

/// Accounts of type `admin` can only sign in on the admin platform, and
/// registration never creates one. This is how the first one is made.
#[derive(Parser, Debug)]
#[command(name = "create-admin", about = "Provision an active administrator account")]
struct Args {
    #[arg(long)]
    username: String,

    /// Stored lower-cased.
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    #[arg(long, default_value = "")]
    full_name: String,

    /// Role evaluated by the policy table.
    #[arg(long, default_value = "admin")]
    role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("create-admin", "info", None);

    let args = Args::parse();
    let email = args.email.trim().to_lowercase();
    if !email.contains('@') {
        anyhow::bail!("email must contain '@'");
    }
    validate_password_shape(&args.password)
        .map_err(|_| anyhow::anyhow!("password must be 5-128 characters with a letter and a digit"))?;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let pool = db::create_pool(&DatabaseConfig {
        url: Secret::new(database_url),
        max_connections: 2,
        min_connections: 1,
    })
    .await?;
    db::run_migrations(&pool).await?;

    let password_hash = hash_password(&Password::new(args.password))?;

    let store = Database::new(pool);
    let user = match store
        .create_user(NewUser {
            full_name: args.full_name.trim().to_string(),
            username: args.username.trim().to_string(),
            email,
            password_hash,
            gender: None,
            user_type: AccountType::Admin,
            user_role: args.role.trim().to_string(),
            status: UserStatus::Active,
        })
        .await
    {
        Ok(user) => user,
        Err(StoreError::Duplicate(what)) => anyhow::bail!("{} already exists", what),
        Err(StoreError::Backend(e)) => return Err(e.context("failed to create admin")),
    };

    tracing::info!(user_id = %user.id, role = %user.user_role, "Admin account created");
    println!("Created admin '{}' with id {}", user.username, user.id);
    Ok(())
}
