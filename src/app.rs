use crate::{
    config::Config,
    handler::middleware::request_log::log_requests,
    speech::SpeechHandler,
    storage::{ensure_bucket, LocalAudioStore, ObjectStorage, S3ObjectStorage},
    synthesis::{create_synthesis_client, SynthesisClient},
};
use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub storage: Arc<dyn ObjectStorage>,
    pub speech: SpeechHandler,
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateBuilder {
    pub config: Option<Config>,
    pub synthesizer: Option<Arc<dyn SynthesisClient>>,
    pub storage: Option<Arc<dyn ObjectStorage>>,
}

impl AppStateInner {
    /// Makes sure the audio bucket exists and is publicly readable.
    ///
    /// Failures are logged only: the service still starts and uploads fall
    /// back to the output directory.
    pub async fn initialize_storage(&self) {
        let bucket = self.speech.bucket();
        match ensure_bucket(self.storage.as_ref(), bucket).await {
            Ok(()) => info!(bucket, "object storage initialized"),
            Err(e) => warn!(bucket, "object storage unavailable, using local fallback: {}", e),
        }
    }
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            synthesizer: None,
            storage: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SynthesisClient>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub async fn build(self) -> Result<AppState> {
        let config = Arc::new(self.config.unwrap_or_default());
        let local = LocalAudioStore::new(&config.output_dir)?;

        let synthesizer = match self.synthesizer {
            Some(synthesizer) => synthesizer,
            None => create_synthesis_client(&config.synthesis)?,
        };
        let storage: Arc<dyn ObjectStorage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(S3ObjectStorage::new(&config.storage).await),
        };

        let speech = SpeechHandler::new(
            synthesizer,
            storage.clone(),
            local,
            config.storage.bucket.clone(),
            config.storage.public_base_url(),
        );

        Ok(Arc::new(AppStateInner {
            config,
            storage,
            speech,
        }))
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn run(state: AppState) -> Result<()> {
    state.initialize_storage().await;

    let app = create_router(state.clone());
    let addr = state.config.http_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };
    info!(
        "tts-service listening on {}, output dir {}",
        addr, state.config.output_dir
    );

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
        return Err(anyhow::anyhow!("Server error: {}", e));
    }
    info!("Server shut down gracefully");
    Ok(())
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ]);

    // Browsers refuse credentials together with a wildcard origin.
    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(AllowOrigin::any());
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let skip_paths = Arc::new(state.config.access_log_skip_paths.clone());
    let cors = cors_layer(&state.config.cors_origins);

    crate::handler::router()
        .with_state(state)
        .layer(middleware::from_fn_with_state(skip_paths, log_requests))
        .layer(cors)
}
