#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = bizdesk_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting BizDesk API in {:?} mode", config.environment);

    let app = bizdesk_api::app::app();

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("BizDesk API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
