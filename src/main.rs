use fibscan::{api, config::Config, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fibscan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Starting fibscan on {}:{} (polling {} every {}s)",
        config.host, config.port, config.default_exchange, config.poll_interval_secs
    );

    let addr = format!("{}:{}", config.host, config.port);
    let default_exchange = config.default_exchange;
    let state = AppState::new(&config);

    state.scanner.clone().start_polling(default_exchange);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("fibscan listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
