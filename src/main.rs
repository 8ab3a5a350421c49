use clap::Parser;
use todo_chat_api::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, USER_POOL_ID, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = todo_chat_api::config::config().clone();

    if let Err(e) = todo_chat_api::cli::run(cli, config).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
