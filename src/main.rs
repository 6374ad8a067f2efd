//! bookshelf-rs server entry point.

use bookshelf_rs::{
    auth::Accounts,
    config::{Cli, Command, Config, UserCommand},
    db::Database,
    server,
};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up PORT, DATABASE_PATH, JWT_SECRET from a local .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Config file plus --database, DATABASE_PATH and friends
    let config = cli.load_config()?;

    // Handle command
    match cli.command {
        Some(Command::Init { force }) => cmd_init(force, &config).await,
        Some(Command::User { action }) => cmd_user(action, &config).await,
        Some(Command::Serve(_)) | None => cmd_serve(config).await,
    }
}

/// Initialize config and database.
async fn cmd_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    // Write default config
    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    // Initialize database
    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nSet auth.jwt_secret in config.toml (or JWT_SECRET) before serving.");
    println!("Then run: bookshelf-rs serve");

    Ok(())
}

/// User management commands.
async fn cmd_user(action: UserCommand, config: &Config) -> anyhow::Result<()> {
    let accounts = Accounts::new(Database::open(&config.database.path)?);

    match action {
        UserCommand::Add {
            name,
            email,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };

            let user = accounts.create_user(&name, &email, &password)?;
            println!(
                "Created user: {} <{}> (id: {})",
                user.name, user.email, user.id
            );
        }

        UserCommand::Del { email } => {
            if accounts.delete_user(&email)? {
                println!("Deleted user: {}", email);
            } else {
                println!("User not found: {}", email);
            }
        }

        UserCommand::List => {
            let users = accounts.list_users()?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<32} {:<20} {:<36} CREATED", "EMAIL", "NAME", "ID");
                println!("{}", "-".repeat(100));
                for user in users {
                    let created = chrono::DateTime::from_timestamp(user.created_at, 0)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!(
                        "{:<32} {:<20} {:<36} {}",
                        user.email, user.name, user.id, created
                    );
                }
            }
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf_rs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Open database
    let db = Database::open(&config.database.path)?;

    tracing::info!(
        bind = %config.server.bind,
        database = %config.database.path.display(),
        token_hours = config.auth.token_hours,
        "Starting bookshelf-rs server"
    );

    // Create application state; fails on a missing signing secret
    let state = server::AppState::new(&config.auth, db)?;

    // Create router
    let app = server::create_router(state);

    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!(address = %config.server.bind, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Prompt for password input.
fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;

    Ok(password.trim().to_string())
}
