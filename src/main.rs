use campus_volunteer::{
    AppResult, AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    seed, session,
};
use clap::{Parser, Subcommand};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Campus volunteer coordination service.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
    /// Run the HTTP server (default).
    #[default]
    Serve,
    /// Apply database migrations and exit.
    InitDb,
    /// Insert the sample events and the bootstrap admin, then exit.
    Seed,
}

/// main
///
/// Loads configuration and logging, connects to Postgres, then runs the
/// selected subcommand.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Configuration (fail fast on missing variables)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: RUST_LOG wins, otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_volunteer=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to connect to Postgres"))?;

    match cli.command.unwrap_or_default() {
        Command::InitDb => Ok(migrate(&pool).await?),
        Command::Seed => {
            let repo = PostgresRepository::new(pool);
            let report = seed::run(&repo, &config).await?;
            if report.admin_created {
                tracing::info!(admin_email = %config.admin_email, "bootstrap admin created");
            }
            Ok(())
        }
        Command::Serve => serve(pool, config).await,
    }
}

/// Applies the application schema and the session table.
async fn migrate(pool: &PgPool) -> AppResult<()> {
    PostgresRepository::new(pool.clone()).migrate().await?;
    session::postgres_store(pool.clone()).await?;
    tracing::info!("migrations applied");
    Ok(())
}

async fn serve(pool: PgPool, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Sessions live in Postgres so they survive restarts; a background sweep
    // removes expired rows.
    let session_store = session::postgres_store(pool.clone()).await?;
    let cleanup = session::spawn_expired_cleanup(session_store.clone());

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, config), session_store);

    let listener = TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Listening on {}", local_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", local_addr);

    let served = axum::serve(listener, app).await;
    cleanup.abort();
    served?;
    Ok(())
}
