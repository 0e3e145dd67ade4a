use axum::{Router, middleware, routing::get};
use nutq_api::{config::ApiConfig, state::ApiState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    nutq_api::tracing::init_tracing(&config.env);

    let metrics_handle = nutq_api::metrics::init_metrics()?;
    let state = ApiState::new(&config);
    tracing::info!(
        score_threshold = state.policy.score_threshold,
        similarity_threshold = state.policy.similarity_threshold,
        language = %state.session.language,
        "acceptance policy loaded"
    );

    let cors = nutq_api::middleware::cors::create_cors_layer(config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(nutq_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = nutq_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(nutq_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            nutq_api::middleware::request_id::request_id_middleware,
        ));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, environment = ?config.env, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
