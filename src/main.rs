mod app;
mod auth;
mod config;
mod dashboard;
mod db;
mod device_tokens;
mod error;
mod extract;
mod groups;
mod jobs;
mod lessons;
mod managers;
mod materials;
mod notifications;
mod pagination;
mod payments;
mod scope;
mod serde_fmt;
mod state;
mod store;
mod students;
mod trace;
mod tz;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "jget=debug,axum=info,tower_http=info".to_string());
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
        timezone = %app_state.config.timezone,
        api_prefix = %app_state.config.api_prefix,
        "configuration loaded"
    );

    db::migrate(&app_state.db).await;

    app::serve(app::build_app(app_state)).await
}
