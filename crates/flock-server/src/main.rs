mod config;
mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use flock_api::AppStateInner;
use flock_api::remote::RemoteClient;
use flock_db::Database;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "flock")]
#[command(author, version, about = "Church management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Open the database and apply pending migrations
    Migrate,
    /// Create the admin account, default channels and donation projects
    Seed {
        #[arg(long, env = "FLOCK_ADMIN_EMAIL")]
        admin_email: String,
        #[arg(long, env = "FLOCK_ADMIN_PASSWORD")]
        admin_password: String,
        #[arg(long, default_value = "Administrator")]
        admin_name: String,
    },
    /// Print an Argon2id hash of a password
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flock=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(Config::from_env()?).await,
        Command::Migrate => {
            let db_path = std::env::var("FLOCK_DB_PATH").unwrap_or_else(|_| "flock.db".into());
            Database::open(&PathBuf::from(&db_path))?;
            info!("Migrations applied to {}", db_path);
            Ok(())
        }
        Command::Seed {
            admin_email,
            admin_password,
            admin_name,
        } => {
            let db_path = std::env::var("FLOCK_DB_PATH").unwrap_or_else(|_| "flock.db".into());
            let db = Database::open(&PathBuf::from(&db_path))?;
            seed::run(
                &db,
                &seed::AdminSeed {
                    email: &admin_email,
                    password: &admin_password,
                    name: &admin_name,
                },
            )?;
            Ok(())
        }
        Command::HashPassword { password } => {
            println!("{}", flock_api::auth::hash_password(&password)?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&PathBuf::from(&config.db_path))?;

    let remote = RemoteClient::new(config.remote_api_url.clone(), config.remote_timeout)?;
    match &config.remote_api_url {
        Some(url) => info!("Remote backend: {}", url),
        None => info!("No remote backend configured; proxy routes serve mock data"),
    }

    let state = AppStateInner::new(db, config.jwt_secret, remote, config.face_min_confidence);

    let app = flock_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Flock server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Cannot listen for SIGTERM: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["flock"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn seed_takes_admin_flags() {
        let cli = Cli::parse_from([
            "flock",
            "seed",
            "--admin-email",
            "admin@example.org",
            "--admin-password",
            "long-enough",
        ]);
        match cli.command {
            Some(Command::Seed { admin_email, admin_name, .. }) => {
                assert_eq!(admin_email, "admin@example.org");
                assert_eq!(admin_name, "Administrator");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn hash_password_takes_positional_argument() {
        let cli = Cli::parse_from(["flock", "hash-password", "hunter22"]);
        assert!(matches!(cli.command, Some(Command::HashPassword { password }) if password == "hunter22"));
    }
}
