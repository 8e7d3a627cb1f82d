//! services/bridge/src/bin/bridge.rs

use bridge_lib::{
    adapters::ChoreBoardHttpAdapter,
    config::Config,
    coordinator::{Coordinator, CoordinatorSettings, RefreshError},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, Method};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting bridge...");

    // --- 2. Initialize the Backend Adapter ---
    let adapter = Arc::new(ChoreBoardHttpAdapter::from_config(&config)?);
    let coordinator = Coordinator::new(
        adapter,
        CoordinatorSettings {
            monitored_users: config.monitored_users.clone(),
            time_zone: config.time_zone,
            completions_limit: config.completions_limit,
            scan_interval: config.scan_interval,
        },
    );

    // --- 3. First Refresh ---
    // Bad credentials are fatal at startup; an unreachable backend is not.
    match coordinator.refresh().await {
        Ok(_) => info!("Initial snapshot fetched from {}", config.choreboard_url),
        Err(e @ RefreshError::NeedsReconfiguration) => {
            error!("Exiting: {}", e);
            return Err(e.into());
        }
        Err(e) => warn!("Initial refresh failed, will retry on the next poll: {}", e),
    }

    // --- 4. Start the Poll Loop ---
    let shutdown = CancellationToken::new();
    let poller = tokio::spawn(coordinator.clone().run(shutdown.clone()));

    // --- 5. Create the Web Router ---
    let app_state = Arc::new(AppState {
        coordinator,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = poller.await {
        error!("Poll loop ended abnormally: {}", e);
    }
    Ok(())
}
