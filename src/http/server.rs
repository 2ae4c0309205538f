//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every terminal endpoint
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Own the shared `AppState` (config, upstream clients, readings store)
//! - Serve until the shutdown signal fires

use axum::extract::{DefaultBodyLimit, Request};
use axum::routing::{any, get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::handlers::{geocoding, item, postal, text, weight};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::state::ScaleReadings;
use crate::upstream::{GroqClient, NominatimClient, UpstreamResult, ViaCepClient};

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub viacep: ViaCepClient,
    pub nominatim: NominatimClient,
    pub groq: GroqClient,
    pub readings: ScaleReadings,
}

impl AppState {
    /// Build every client from config; the LLM key comes from the environment.
    pub fn from_config(config: GatewayConfig) -> UpstreamResult<Self> {
        let groq = GroqClient::from_env(&config.groq)?;
        Self::with_groq(config, groq)
    }

    /// Build state around an already configured LLM client.
    pub fn with_groq(config: GatewayConfig, groq: GroqClient) -> UpstreamResult<Self> {
        Ok(Self {
            viacep: ViaCepClient::new(&config.viacep)?,
            nominatim: NominatimClient::new(&config.nominatim)?,
            groq,
            readings: ScaleReadings::new(),
            config: Arc::new(config),
        })
    }
}

/// HTTP server for the terminal gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> UpstreamResult<Self> {
        Ok(Self::from_state(AppState::from_config(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        Router::new()
            .route("/health", get(health))
            .route("/consultar-cep", post(postal::consultar_cep))
            .route("/consultar-cep/proximos", post(postal::consultar_cep_proximos))
            .route("/geocodificar-reverso", post(geocoding::geocodificar_reverso))
            .route("/corrigir-texto", post(text::corrigir_texto))
            .route("/simular-peso", post(weight::simular_peso))
            .route("/simular-peso/balanca", post(weight::simular_peso_balanca))
            .route("/simular-peso/tabela", post(weight::simular_peso_tabela))
            .route("/simular-peso/legado", any(weight::simular_peso_legado))
            .route("/simular-peso/ultimo/{balanca}", get(weight::ultimo_peso))
            .route("/validar-item", post(item::validar_item))
            .route("/validar-item/legado", any(item::validar_item_legado))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            groq_configured = self.state.groq.is_configured(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Per-request span carrying the request ID set by `SetRequestIdLayer`.
fn request_span(request: &Request) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id
    )
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}
