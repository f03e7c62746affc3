mod accounts;
mod catalog;
mod category;
mod config;
mod db;
mod entities;
mod error;
mod forms;
mod models;
mod routes;
mod session;
mod templates;
mod tmdb;

use std::sync::Arc;

use axum::{Router, routing::get};
use axum_extra::extract::cookie::Key;
use sea_orm::DatabaseConnection;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{accounts::Accounts, catalog::Catalog, config::Config, tmdb::TmdbClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub accounts: Accounts,
    pub tmdb: Arc<TmdbClient>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().user_agent("seasonreel/0.1").build()?;

        let tmdb = TmdbClient::new(
            http,
            config.tmdb_access_token.clone(),
            config.tmdb_base_url.clone(),
            config.tmdb_image_url.clone(),
            config.tmdb_rps,
        );
        let cookie_key = session::cookie_key(config.secret_key.as_deref());

        Ok(Self {
            config: Arc::new(config),
            catalog: Catalog::new(db.clone()),
            accounts: Accounts::new(db),
            tmdb: Arc::new(tmdb),
            cookie_key,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(routes::index))
        .route("/films", get(routes::films))
        .route("/add", get(routes::add_form).post(routes::add))
        .route("/select", get(routes::select).post(routes::select))
        .route("/edit", get(routes::edit_form).post(routes::edit))
        .route("/search", get(routes::search_form).post(routes::search))
        .route("/delete", get(routes::delete))
        .route("/result", get(routes::result).post(routes::result))
        .route("/register", get(routes::register_form).post(routes::register))
        .route("/login", get(routes::login_form).post(routes::login))
        .route("/logout", get(routes::logout))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,seasonreel=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.addr;

    let db = db::connect_and_migrate(config.database_url.as_str()).await?;
    let state = AppState::new(config, db)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
