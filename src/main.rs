use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod clock;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;

use config::Config;
use db::init_db;

use clock::{Clock, SystemClock};
use service::admin::AdminService;
use service::punch::PunchService;
use service::reports::ReportService;
use service::summary::SummaryService;
use store::Store;
use store::memory::MemoryStore;
use store::mysql::MySqlStore;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Everything the handlers need, injected once at startup.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub punch: PunchService,
    pub admin: AdminService,
    pub reports: ReportService,
}

impl AppState {
    fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let summaries = SummaryService::new(store.clone(), clock.clone());
        Self {
            punch: PunchService::new(store.clone(), clock.clone(), summaries.clone()),
            admin: AdminService::new(store.clone(), clock.clone(), summaries),
            reports: ReportService::new(store.clone()),
            store,
            clock,
        }
    }
}

#[get("/")]
async fn index() -> impl Responder {
    "punchclock"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await;
            let store = MySqlStore::new(pool);
            store
                .migrate()
                .await
                .expect("Failed to run schema migration");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Data::new(AppState::new(store, clock));

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
