mod api;
mod dispatch;
mod monitor;

use clap::{Parser, Subcommand};
use dispatch::DispatchGateway;
use monitor::SessionManager;
use rapport_connectors::{HttpConnector, InMemoryConnector};
use rapport_core::{config, traits::{AnalysisProvider, Connector}};
use rapport_engine::RecommendationStore;
use rapport_providers::{adapter::AnalysisAdapter, http::HttpAnalysisProvider, rule_only::RuleOnlyProvider};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "rapport",
    version,
    about = "Rapport — real-time conversation monitoring and recommendations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring service.
    Start,
    /// Check configuration and provider availability.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;

            let provider = build_provider(&cfg)?;
            if !provider.is_available().await {
                anyhow::bail!("provider '{}' is not available", provider.name());
            }
            let provider_name = provider.name().to_string();
            let adapter = Arc::new(AnalysisAdapter::new(
                provider,
                cfg.monitor.provider_timeout_secs,
            ));

            let connectors = build_connectors(&cfg)?;

            let store = Arc::new(RecommendationStore::new());
            let dispatch = Arc::new(DispatchGateway::new(Arc::clone(&store)));
            let manager = Arc::new(SessionManager::new(
                connectors,
                adapter,
                store,
                Arc::clone(&dispatch),
                cfg.monitor.clone(),
            ));

            tokio::spawn(monitor::cleanup::cleanup_loop(
                Arc::clone(&manager),
                cfg.monitor.clone(),
            ));

            println!("Rapport — monitoring service starting...");

            if !cfg.api.enabled {
                anyhow::bail!(
                    "API is disabled in config; there is no other way to create sessions. \
                     Set [api] enabled = true."
                );
            }

            // Sessions are created and stopped through the API from here on.
            let server = tokio::spawn(api::serve(
                cfg.api.clone(),
                Arc::clone(&manager),
                dispatch,
                provider_name,
            ));

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                }
                _ = server => {
                    tracing::error!("API server exited unexpectedly");
                }
            }

            manager.stop_all().await;
            tracing::info!("all sessions stopped, exiting");
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Rapport — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Default provider: {}", cfg.provider.default);
            println!();

            let provider = build_provider(&cfg)?;
            println!(
                "  {}: {}",
                provider.name(),
                if provider.is_available().await {
                    "available"
                } else {
                    "not available"
                }
            );
            println!();

            println!("Connectors:");
            for platform in &cfg.connector.manual_platforms {
                println!("  {platform}: in-memory");
            }
            match cfg.connector.http {
                Some(ref http) if http.enabled => {
                    println!("  {}: http ({})", http.platform, http.base_url);
                }
                _ => {}
            }
            println!();
            println!("API: {} on {}", if cfg.api.enabled { "enabled" } else { "disabled" }, cfg.api.bind);
        }
    }

    Ok(())
}

fn build_provider(cfg: &config::Config) -> anyhow::Result<Arc<dyn AnalysisProvider>> {
    match cfg.provider.default.as_str() {
        "http" => {
            let http = cfg.provider.http.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "provider.default is 'http' but [provider.http] is missing in config"
                )
            })?;
            if http.api_key.is_empty() {
                anyhow::bail!("HTTP provider requires an api_key in [provider.http]");
            }
            Ok(Arc::new(HttpAnalysisProvider::from_config(http)))
        }
        "rule-only" => Ok(Arc::new(RuleOnlyProvider)),
        other => anyhow::bail!("unknown provider '{other}', expected 'http' or 'rule-only'"),
    }
}

fn build_connectors(
    cfg: &config::Config,
) -> anyhow::Result<HashMap<String, Arc<dyn Connector>>> {
    let mut connectors: HashMap<String, Arc<dyn Connector>> = HashMap::new();

    for platform in &cfg.connector.manual_platforms {
        connectors.insert(platform.clone(), Arc::new(InMemoryConnector::new(platform)));
    }

    if let Some(ref http) = cfg.connector.http {
        if http.enabled {
            if http.base_url.is_empty() {
                anyhow::bail!("HTTP connector is enabled but base_url is empty");
            }
            connectors.insert(http.platform.clone(), Arc::new(HttpConnector::from_config(http)));
        }
    }

    if connectors.is_empty() {
        anyhow::bail!("No connectors configured. Add manual_platforms or an HTTP connector.");
    }

    Ok(connectors)
}
