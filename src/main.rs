use axum::extract::DefaultBodyLimit;
use quiz_backend::{
    build_router, config::Config, database::create_pool, middleware::cors::api_cors, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    info!("Database ready at {}", config.database_url);

    let app_state = AppState::new(&config, pool)?;
    info!(
        model = %config.gemini_model,
        mode = ?config.quiz.generation_mode,
        target = config.quiz.target_count,
        "Quiz pipeline ready"
    );

    let app = build_router(app_state, config.quiz_rps)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
