use tetra_community::{app, config, db, logging, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_env();
    logging::init();

    let config = config::Config::from_env()?;
    let pool = db::connect_lazy(&config.database_url, config.db_max_connections)?;
    if let Err(err) = db::check_ready(&pool).await {
        tracing::warn!(error = %err, "database not reachable at startup");
    }

    let state = AppState::new(pool, &config)?;
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
