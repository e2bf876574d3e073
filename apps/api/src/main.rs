use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_api::router::create_router;
use auth_cell::TracingNotifier;
use clinic_api::services::Services;
use shared_config::AppConfig;
use shared_utils::clock::SystemClock;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());
    let services = Services::build(&config, Arc::new(SystemClock), Arc::new(TracingNotifier::new(&config)));

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let admin = services.identity
            .ensure_admin(email, password)
            .await
            .context("failed to bootstrap admin account")?;
        info!("Admin account ready: {}", admin.id);
    }

    // Build the application router
    let app = create_router(config.clone(), services)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors_layer(&config));

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
