use delve::cli::{Cli, Commands, ask, init, output::Output};
use delve::{AppState, ConfigManager, create_app};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(log_level: &str, log_format: &str, verbose: bool) {
    let default_filter = if verbose {
        "delve=debug,delve_server=debug,tower_http=debug".to_string()
    } else {
        format!("delve={0},delve_server={0},tower_http=info", log_level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
            search,
            host,
            port,
        }) => {
            let config = init::InitConfig {
                path,
                force,
                provider,
                search,
                host,
                port,
            };
            match init::run(config, &output) {
                init::InitResult::Error(e) => Err(anyhow::anyhow!(e)),
                _ => Ok(()),
            }
        }
        Some(Commands::Ask { query }) => {
            let config_manager = load_config(&cli.config, &output)?;
            init_tracing("warn", "pretty", cli.verbose);

            let state = AppState::from_config(config_manager).await?;
            if !ask::run(&state, query, &output).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            let config_manager = load_config(&cli.config, &output)?;
            serve(config_manager, &output, cli.verbose).await
        }
    }
}

fn load_config(path: &Path, output: &Output) -> anyhow::Result<Arc<ConfigManager>> {
    match ConfigManager::new(path) {
        Ok(manager) => Ok(Arc::new(manager)),
        Err(e) => {
            output.error(&format!("Failed to load {}: {}", path.display(), e));
            output.hint("Run 'delve-server init' to create one");
            Err(e.into())
        }
    }
}

async fn serve(
    config_manager: Arc<ConfigManager>,
    output: &Output,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = config_manager.config();
    init_tracing(&config.server.log_level, &config.server.log_format, verbose);
    output.banner();

    if let Err(e) = config_manager.start_watching() {
        tracing::warn!("Config hot reload disabled: {}", e);
    }

    let state = AppState::from_config(Arc::clone(&config_manager)).await?;
    let app = create_app(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Delve listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    config_manager.stop_watching();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
