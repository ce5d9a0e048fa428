//! Dealership sales assistant server entry point

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use dealer_assist_config::{load_settings, DealerDomainConfig, Settings};
use dealer_assist_llm::{ChatModelAdapter, LlmBackend, LlmTemplateAnalyzer, OpenAIBackend, OpenAIConfig};
use dealer_assist_persistence::PersistenceLayer;
use dealer_assist_server::{create_router, init_metrics, state::known_data_keys, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("DEALER_ASSIST_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting dealer-assist server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let domain = Arc::new(
        DealerDomainConfig::load(config.domain_config_dir.as_deref())
            .context("loading domain catalog")?,
    );
    tracing::info!(
        fields = domain.fields.len(),
        scenarios = domain.scenarios.all().len(),
        documents = domain.documents.all().len(),
        "Domain catalog ready"
    );

    if config.observability.metrics_enabled {
        init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let persistence = match dealer_assist_persistence::init(&config.persistence).await {
        Ok(layer) => layer,
        Err(e) if config.persistence.enabled => {
            tracing::error!("Failed to initialize ScyllaDB: {}. Falling back to in-memory.", e);
            PersistenceLayer::in_memory()
        }
        Err(e) => return Err(e).context("initializing template storage"),
    };

    let backend: Arc<dyn LlmBackend> = Arc::new(
        OpenAIBackend::new(OpenAIConfig::from(&config.llm)).context("creating chat backend")?,
    );
    tracing::info!(model = %backend.model_name(), endpoint = %config.llm.endpoint, "Chat backend ready");
    let chat_model = Arc::new(ChatModelAdapter::from_arc(backend.clone()));
    let analyzer = Arc::new(LlmTemplateAnalyzer::new(backend, known_data_keys(&domain)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parsing listen address")?;

    let state = AppState::new(config, domain, chat_model, analyzer, persistence);
    let cleanup = state.sessions.start_cleanup_task();
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("dealer_assist={level},tower_http=debug").into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
