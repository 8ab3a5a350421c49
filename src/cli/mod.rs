use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::auth::{verifier_from_config, HmacVerifier};
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::llm::OpenAiClient;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "todo-chat-api")]
#[command(about = "Todo, chat and NFT-metadata API server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Database URL (overrides DATABASE_URL)")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Create the database schema and exit")]
    Migrate,

    #[command(about = "Print an HS256 development token signed with AUTH_JWT_SECRET")]
    Token {
        #[arg(long, help = "Subject identifier to embed")]
        sub: String,

        #[arg(long, default_value_t = 60, help = "Validity in minutes")]
        ttl_minutes: i64,
    },
}

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            pool.close().await;
            Ok(())
        }
        Commands::Token { sub, ttl_minutes } => {
            let secret = config
                .auth
                .jwt_secret
                .clone()
                .context("AUTH_JWT_SECRET must be set to mint development tokens")?;
            let verifier = HmacVerifier::new(secret, config.auth.client_id.clone());
            let token = verifier.issue(&sub, chrono::Duration::minutes(ttl_minutes))?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Todo Chat API in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open database")?;
    DatabaseManager::migrate(&pool).await?;

    let verifier = verifier_from_config(&config.auth)?;

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; /api/chat and /api/nft will answer 503");
    }
    let llm = Arc::new(OpenAiClient::new(&config.llm));

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(pool.clone(), verifier, llm, config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Todo Chat API listening on http://{}", bind_addr);

    axum::serve(listener, crate::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["todo-chat-api"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from([
            "todo-chat-api",
            "--database-url",
            "sqlite::memory:",
            "serve",
            "--port",
            "9000",
        ]);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000) })));
    }

    #[test]
    fn token_subcommand_parses() {
        let cli = Cli::parse_from(["todo-chat-api", "token", "--sub", "userA"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Token { ref sub, ttl_minutes: 60 }) if sub == "userA"
        ));
    }

    #[tokio::test]
    async fn token_requires_secret() {
        let cli = Cli::parse_from(["todo-chat-api", "token", "--sub", "userA"]);
        let err = run(cli, AppConfig::development()).await.unwrap_err();
        assert!(err.to_string().contains("AUTH_JWT_SECRET"));
    }
}
