//! Omnyla API Gateway
//!
//! The main entry point for VCF analysis requests.
//! Handles:
//! - Multipart upload intake
//! - Pipeline execution under the request deadline
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use omnyla_analysis::AnalysisPipeline;
use omnyla_common::{
    config::{AppConfig, ObservabilityConfig},
    errors::AppError,
    metrics::{self, ANALYSIS_BUCKETS, METRICS_PREFIX},
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handlers::analysis::{ANALYZE_PATH, REPORT_PATH};
use middleware::rate_limit::{rate_limit_middleware, GlobalRateLimit};

/// Headroom above the upload ceiling for multipart framing
const BODY_LIMIT_HEADROOM: u64 = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub metrics: Option<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match std::env::var("APP_CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting Omnyla API Gateway v{}",
        omnyla_common::VERSION
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        Some(install_metrics(&config.observability.service_name)?)
    } else {
        None
    };

    let pipeline = AnalysisPipeline::from_config(&config).context("Failed to build analysis pipeline")?;
    if !pipeline.annotator_available().await {
        warn!(
            annotator = pipeline.annotator_name(),
            "Annotator not available, uploads will get the fallback recommendations"
        );
    }

    let config = Arc::new(config);

    // Create app state
    let state = AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
        metrics: metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.shutdown_timeout()))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics(service_name: &str) -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", service_name)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_analysis_duration_seconds", METRICS_PREFIX)),
            ANALYSIS_BUCKETS,
        )?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    metrics::register_metrics();
    Ok(handle)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let body_limit = (state.config.upload.max_bytes + BODY_LIMIT_HEADROOM) as usize;

    let mut router = Router::new()
        // Operational endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Analysis endpoints
        .route(ANALYZE_PATH, post(handlers::analysis::analyze_vcf))
        .route(REPORT_PATH, post(handlers::analysis::analysis_report))
        .layer(DefaultBodyLimit::max(body_limit));

    if state.config.rate_limit.enabled {
        let limit = GlobalRateLimit::from_config(&state.config.rate_limit);
        router = router.layer(axum::middleware::from_fn_with_state(limit, rate_limit_middleware));
    }

    // Compose the app
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// A panicking handler answers 500 with the generic analysis failure body
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal { message }.into_response()
}

/// Graceful shutdown signal handler. In-flight requests get `grace` to finish.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out, exiting");
        std::process::exit(1);
    });
}
