use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use oohdesk::auth::TokenGenerator;
use oohdesk::config::{AppConfig, ServerConfig};
use oohdesk::integrations::Integrations;
use oohdesk::inventory::{LowStockMonitor, run_sweeper};
use oohdesk::server::{AppState, create_router};
use oohdesk::store::{RecordStore, SqliteStore, Store};
use oohdesk::types::{Company, Subscription, SubscriptionPlan, Token, User};

const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'oohdesk admin init' first to create the database and admin token.";

fn create_token(
    generator: &TokenGenerator,
    is_admin: bool,
    user_id: Option<String>,
) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin,
        user_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "oohdesk")]
#[command(about = "Operations server for out-of-home advertising companies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and oohdesk.toml
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://ops.example.com").
        /// Used for the proposal links emailed to clients.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and oohdesk.toml
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.data_dir.join(".admin_token");

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_token(&generator, true, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_company_prompt(&store, &generator)?;
    }

    Ok(())
}

fn not_empty(input: &str) -> Result<inquire::validator::Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(inquire::validator::Validation::Invalid(
            "Value cannot be empty".into(),
        ))
    } else {
        Ok(inquire::validator::Validation::Valid)
    }
}

fn create_company_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create = inquire::Confirm::new("Would you like to create a company and its administrator?")
        .with_default(false)
        .prompt()?;

    if !create {
        return Ok(());
    }

    let name = inquire::Text::new("Company name:")
        .with_validator(not_empty)
        .prompt()?;
    let plan = inquire::Select::new("Subscription plan:", vec!["trial", "basic", "premium", "enterprise"])
        .prompt()?;
    let plan: SubscriptionPlan = serde_json::from_value(serde_json::Value::from(plan))?;
    let email = inquire::Text::new("Administrator email:")
        .with_validator(|input: &str| {
            if input.contains('@') {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    "Enter a valid email address".into(),
                ))
            }
        })
        .prompt()?;
    let display_name = inquire::Text::new("Administrator name:")
        .with_validator(not_empty)
        .prompt()?;
    let password = inquire::Password::new("Administrator password:")
        .with_validator(|input: &str| {
            if input.chars().count() >= 8 {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    "Use at least 8 characters".into(),
                ))
            }
        })
        .prompt()?;

    let company_id = Uuid::new_v4().to_string();
    store.create_record_with_id(
        &company_id,
        &company_id,
        Company {
            name: name.trim().to_string(),
            address: None,
            contact_email: Some(email.trim().to_ascii_lowercase()),
            contact_phone: None,
        },
    )?;
    store.create_record_with_id(
        &company_id,
        &company_id,
        Subscription::new(plan, Utc::now().date_naive()),
    )?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        company_id,
        email: email.trim().to_ascii_lowercase(),
        display_name: display_name.trim().to_string(),
        roles: vec!["admin".to_string()],
        password_hash: Some(generator.hash(&password)?),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let (user_token, raw_token) = create_token(generator, false, Some(user.id.clone()))?;
    store.create_token(&user_token)?;

    println!();
    println!("========================================");
    println!("Created company '{}' with administrator {}", name.trim(), user.email);
    println!("Administrator token:");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.data_dir.join(".admin_token");
    if !token_file.exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(NOT_INITIALIZED);
    }

    info!("Admin token available at {}", token_file.display());

    let app_config = AppConfig::load(&config.config_path())?;
    let integrations = Integrations::from_config(&app_config.integrations)?;
    info!(
        weather = integrations.weather.is_some(),
        places = integrations.places.is_some(),
        search = integrations.search.is_some(),
        email = integrations.mailer.is_some(),
        "Integrations configured"
    );

    let store: Arc<dyn Store> = Arc::new(store);
    let monitor = Arc::new(LowStockMonitor::new(
        app_config.inventory.low_stock_threshold,
    ));
    tokio::spawn(run_sweeper(
        Arc::clone(&monitor),
        Arc::clone(&store),
        Duration::from_secs(app_config.inventory.sweep_interval_secs.max(1)),
    ));

    let state = Arc::new(AppState::new(
        store,
        config.data_dir.clone(),
        config.public_base_url.clone(),
        integrations,
        monitor,
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oohdesk=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            run_serve(ServerConfig {
                host,
                port,
                data_dir: PathBuf::from(data_dir),
                public_base_url,
            })
            .await?;
        }
    }

    Ok(())
}
