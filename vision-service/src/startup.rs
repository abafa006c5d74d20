//! Application startup and lifecycle management.

use crate::config::VisionConfig;
use crate::handlers;
use crate::services::metrics::metrics_middleware;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::openai::{OpenAiConfig, OpenAiProvider};
use crate::services::providers::{GenerationParams, ProviderSet, VisionProvider};
use crate::services::{Predictor, PredictorSettings};
use axum::{
    body::Body,
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VisionConfig>,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    /// Wire a predictor over `providers` using the generation settings in `config`.
    pub fn new(config: VisionConfig, providers: ProviderSet) -> Self {
        let settings = PredictorSettings {
            temperature: config.generation.temperature,
            timeout: config.generation.provider_timeout(),
            strict_model_selection: config.strict_model_selection,
        };

        Self {
            predictor: Arc::new(Predictor::new(providers, settings)),
            config: Arc::new(config),
        }
    }
}

/// Build the OpenAI and Gemini adapters from settings.
pub fn build_providers(config: &VisionConfig) -> Result<ProviderSet, AppError> {
    let defaults = GenerationParams {
        max_tokens: config.generation.max_tokens,
        temperature: config.generation.temperature,
    };
    let timeout = config.generation.provider_timeout();

    let openai = OpenAiProvider::new(OpenAiConfig {
        api_key: config.openai.api_key.clone(),
        model: config.openai.model.clone(),
        base_url: config.openai.base_url.clone(),
        defaults,
        timeout,
    })
    .map_err(|e| AppError::ConfigError(e.into()))?;

    let gemini = GeminiProvider::new(GeminiConfig {
        api_key: config.gemini.api_key.clone(),
        model: config.gemini.model.clone(),
        base_url: config.gemini.base_url.clone(),
        defaults,
        timeout,
    })
    .map_err(|e| AppError::ConfigError(e.into()))?;

    tracing::info!(
        openai_model = %openai.model(),
        gemini_model = %gemini.model(),
        timeout_secs = timeout.as_secs(),
        "Initialized vision providers"
    );

    Ok(ProviderSet::new(Arc::new(openai), Arc::new(gemini)))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/generate", post(handlers::generate))
        .route("/predict", post(handlers::predict))
        .route("/compare", post(handlers::compare));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .fallback(not_found)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: VisionConfig) -> Result<Self, AppError> {
        let providers = build_providers(&config)?;
        Self::build_with_providers(config, providers).await
    }

    /// Build the application around pre-built providers.
    pub async fn build_with_providers(
        config: VisionConfig,
        providers: ProviderSet,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            environment = %config.environment,
            "Vision service: HTTP on port {}",
            port
        );

        let router = build_router(AppState::new(config, providers));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal is received.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
