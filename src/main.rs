mod app;
mod auth;
mod config;
mod convert;
mod error;
mod files;
mod state;
mod storage;
mod store;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fileingest=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    tracing::info!(
        uploads = %app_state.config.storage.upload_dir.display(),
        parquet = %app_state.config.storage.parquet_dir.display(),
        "storage ready"
    );

    app::serve(app::build_app(app_state)).await
}
