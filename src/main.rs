use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crud_api_rust::auth::TokenService;
use crud_api_rust::config::AppConfig;
use crud_api_rust::database;
use crud_api_rust::routes;
use crud_api_rust::state::AppState;

#[derive(Parser)]
#[command(name = "crud-api-rust", version, about = "JWT-secured CRUD API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SECRET_KEY, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("configuration error")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::InitDb => init_db(config).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_output = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let tokens = TokenService::new(&config.security)?;
    let pool = database::connect(&config.database)
        .await
        .context("failed to open database")?;
    database::init_schema(&pool)
        .await
        .context("failed to initialize database schema")?;

    let port = config.server.port;
    let state = AppState::new(config, tokens, pool);
    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("crud-api-rust listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}

async fn init_db(config: AppConfig) -> anyhow::Result<()> {
    let pool = database::connect(&config.database)
        .await
        .context("failed to open database")?;
    database::init_schema(&pool)
        .await
        .context("failed to initialize database schema")?;
    println!("database schema created for {}", config.database.url);
    Ok(())
}
