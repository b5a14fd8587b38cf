//! trialmatch-server library crate
//!
//! Exposes `build_app` and `config` for integration tests.
//! The actual binary entrypoint is in `main.rs`.

mod ai;
pub mod config;
mod error;
mod middleware;
mod registry;
mod routes;

use axum::{
    Extension, Router,
    http::Method,
    middleware as axum_mw,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use trialmatch_core::{IntakeError, QueryOptions};

use ai::GeminiClient;
use config::Config;
use middleware::ApiKeyAuth;
use registry::TrialRegistryClient;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// `None` when no LLM key is configured
    llm: Option<GeminiClient>,
    registry: TrialRegistryClient,
    query_options: QueryOptions,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            llm: config.gemini_api_key.as_ref().map(|key| {
                GeminiClient::new(
                    key.clone(),
                    config.gemini_model.clone(),
                    config.gemini_base_url.clone(),
                )
            }),
            registry: TrialRegistryClient::new(
                config.registry_base_url.clone(),
                config.registry_page_size,
            ),
            query_options: QueryOptions {
                age_filter: config.age_filter,
            },
        }
    }

    /// The LLM client, or a configuration error when no key is set
    fn llm(&self) -> Result<&GeminiClient, IntakeError> {
        self.llm.as_ref().ok_or(IntakeError::Configuration)
    }
}

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(config: &Config) -> Router {
    let state = AppState::new(config);

    let auth = ApiKeyAuth::new(config.api_key.clone());
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Pipeline stages (auth + rate limit)
    let api_routes = Router::new()
        .nest("/api", routes::intake_routes())
        .layer(axum_mw::from_fn(middleware::auth::auth_middleware))
        .layer(Extension(auth))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/metadata", get(routes::metadata::get))
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };
    let cors = cors
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
