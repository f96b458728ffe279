use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use paperweather::cli::{Cli, Commands, ServeArgs};
use paperweather::core::config::{AppPaths, ConfigService, Settings};
use paperweather::core::logging;
use paperweather::server;
use paperweather::setup::run_setup;
use paperweather::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // `.env` may set PAPERWEATHER_DATA_DIR
    let paths = AppPaths::new().with_env_file(|key| std::env::var(key).ok());
    let config = ConfigService::new(Arc::new(paths));
    let command = cli.into_command();

    if let Commands::Setup { .. } = command {
        let report = run_setup(config.paths()).context("Setup failed")?;
        println!("Data directories ready under {}", config.paths().data_dir.display());
        if let Some(env) = &report.env_file {
            println!("Created {}. Edit it to add your API keys.", env.display());
        }
        if let Some(sample) = &report.sample_document {
            println!("Created sample document {}", sample.display());
        }
    }

    let env_loaded = config.load_env_file();
    logging::init(config.paths());
    if env_loaded {
        tracing::info!("Loaded environment from {}", config.paths().env_file().display());
    } else {
        tracing::info!("No .env file found; API keys come from the environment");
    }

    let mut settings = config.load_settings().context("Failed to load settings")?;

    match command {
        Commands::Serve(args) => serve(config, settings, args).await,
        Commands::Setup { run } => {
            if run {
                serve(config, settings, ServeArgs::default()).await
            } else {
                println!("Setup complete. Start the app with: paperweather serve");
                Ok(())
            }
        }
        Commands::Ask { query, offline } => {
            settings.app.offline |= offline;
            let state = AppState::initialize(config, settings).await?;
            let reply = state.agent.query(&query).await?;
            println!("{}", reply.response);
            Ok(())
        }
        Commands::Ingest { offline } => {
            settings.app.offline |= offline;
            let state = AppState::initialize(config, settings).await?;
            if !state.agent.index_existing().await {
                anyhow::bail!("Indexing failed; see the log for details");
            }
            let chunks = state.agent.documents().count().await?;
            println!(
                "{} chunks stored in collection '{}'",
                chunks,
                state.agent.documents().collection()
            );
            Ok(())
        }
    }
}

async fn serve(config: ConfigService, mut settings: Settings, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    settings.app.offline |= args.offline;

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::initialize(config, settings).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("PaperWeather running at http://{}", addr);
    tracing::info!("Listening on {}", addr);

    let app = server::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutting down");
}
