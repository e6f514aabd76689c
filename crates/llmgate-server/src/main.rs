//! llmgate HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use llmgate::backend::{GenaiBackend, LlmBackend, MockBackend};
use llmgate::cache::{CacheStore, MemoryStore};
use llmgate::config::Config;
use llmgate::prompt::FilePromptLoader;
use llmgate::routing::VariantRouter;
use llmgate::telemetry::LogTracer;
use llmgate::{ResponseOrchestrator, StreamAggregator};
use llmgate_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    let config = Config::from_env()?;
    init_tracing(config.log_json);

    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        model = %config.default_model,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        cache_error_policy = ?config.cache_error_policy,
        "llmgate starting"
    );

    let store = Arc::new(MemoryStore::with_capacity(config.cache_capacity));
    let cache = CacheStore::with_default_ttl(store, config.cache_ttl);

    let backend: Arc<dyn LlmBackend> = if config.mock_provider {
        tracing::warn!("LLMGATE_MOCK_PROVIDER set, serving mock responses");
        Arc::new(MockBackend::new())
    } else {
        Arc::new(GenaiBackend::default())
    };

    let orchestrator = ResponseOrchestrator::new(cache, backend, config.default_model.clone())
        .with_cache_error_policy(config.cache_error_policy)
        .with_aggregator(StreamAggregator::default());

    let variants = VariantRouter::new(config.prompt_variants.clone())?;
    tracing::info!(variants = ?variants.variants(), prompt_dir = %config.prompt_dir.display(), "prompt variants loaded");

    let state = HandlerState::new(
        orchestrator,
        variants,
        Arc::new(FilePromptLoader::new(config.prompt_dir.clone())),
    )
    .with_summarizer_prompt(config.summarizer_prompt.clone())
    .with_tracer(Arc::new(LogTracer::new()));

    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("llmgate shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    if json {
        builder.json().with_current_span(false).init();
    } else {
        builder.init();
    }
}

async fn run_health_check() -> i32 {
    let port = std::env::var("LLMGATE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/health", port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    match client.get(&url).send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
