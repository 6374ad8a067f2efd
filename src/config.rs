use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Book catalog and review service.
#[derive(Parser, Debug, Clone)]
#[command(name = "bookshelf-rs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "BOOKSHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Overrides applied to every command.
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve(ServeArgs),

    /// User management commands.
    User {
        /// User subcommand action.
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Load the config file, then apply flag and environment overrides.
    pub fn load_config(&self) -> crate::error::Result<Config> {
        let path = self.config.clone().or_else(Config::find_config_file);

        let mut config = match path {
            Some(ref path) => Config::load(path)?,
            None => Config::default(),
        };

        config.apply(self.serve.clone());
        if let Some(Command::Serve(args)) = &self.command {
            config.apply(args.clone());
        }

        Ok(config)
    }
}

/// Server overrides from flags or environment.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind the server to.
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Port to listen on, keeping the configured host.
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to the SQLite database.
    #[arg(short, long, env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// Secret used to sign identity tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

/// User management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        /// Display name.
        name: String,
        /// Login email.
        #[arg(short, long)]
        email: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete a user and their reviews.
    Del {
        /// Email of the user to delete.
        email: String,
    },

    /// List all users.
    List,
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        3000,
    )
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/bookshelf.db")
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret. Required to serve.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in hours.
    #[serde(default = "default_token_hours")]
    pub token_hours: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_hours: default_token_hours(),
        }
    }
}

fn default_token_hours() -> u32 {
    24
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Apply command-line and environment overrides.
    pub fn apply(&mut self, args: ServeArgs) {
        if let Some(addr) = args.bind {
            self.server.bind = addr;
        }
        if let Some(port) = args.port {
            self.server.bind.set_port(port);
        }
        if let Some(path) = args.database {
            self.database.path = path;
        }
        if let Some(secret) = args.jwt_secret {
            self.auth.jwt_secret = secret;
        }
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("bookshelf.toml"),
            dirs::config_dir()
                .map(|p| p.join("bookshelf-rs").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/bookshelf-rs/config.toml"),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# bookshelf-rs configuration

[server]
bind = "0.0.0.0:3000"

[database]
# path = "/var/lib/bookshelf-rs/bookshelf.db"

[auth]
# Secret used to sign identity tokens (or set JWT_SECRET)
# jwt_secret = "change-me"
# Token lifetime in hours
token_hours = 24
"#
        .to_string()
    }
}
