pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod points;
pub mod referral;
pub mod trials;
pub mod username;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::trials::{TrialsClient, TrialsError};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: Arc<JwtVerifier>,
    pub trials: TrialsClient,
    pub site_url: Arc<str>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self, TrialsError> {
        let trials = TrialsClient::new(
            config.trials_api_url.clone(),
            config.trials_api_key.clone(),
            config.trials_timeout,
        )?;
        Ok(AppState {
            pool,
            jwt: Arc::new(JwtVerifier::new(&config.jwt_secret, &config.jwt_audience)),
            trials,
            site_url: Arc::from(config.public_site_url.as_str()),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::health::routes())
        .merge(api::profile::routes())
        .merge(api::supporters::routes())
        .merge(api::referrals::routes())
        .merge(api::wishes::routes())
        .merge(api::votes::routes())
        .merge(api::badges::routes())
        .merge(api::trials::routes())
        .merge(api::admin::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
