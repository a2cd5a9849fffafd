use crate::config::DataPaths;
use crate::instruments::{default_instruments, load_instruments_or_default};
use crate::render::render_page;
use crate::store::{load_market_snapshot, load_rows};
use actix_web::{get, http::header::ContentType, web, HttpResponse, Responder};
use log::{error, Level};
use serde_json::json;

/// Shared, read-only handler state. Files are re-read on every request so a
/// fresh snapshot shows up without restarting the server.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub paths: DataPaths,
}

impl DashboardState {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(market)
        .service(macro_releases)
        .service(events)
        .service(health);
}

#[get("/")]
pub async fn index(state: web::Data<DashboardState>) -> impl Responder {
    let paths = &state.paths;
    let market_panel = load_market_snapshot(&paths.market_snapshot).await;
    let macro_rows = load_rows(&paths.macro_releases).await;
    let event_rows = load_rows(&paths.events).await;

    // Re-read on every request; the default fallback is logged at debug here.
    let instrument_path = paths.market_instruments.clone();
    let instruments = match web::block(move || {
        load_instruments_or_default(&instrument_path, Level::Debug)
    })
    .await
    {
        Ok(instruments) => instruments,
        Err(err) => {
            error!("Instrument config load aborted: {}", err);
            default_instruments()
        }
    };

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(render_page(&market_panel, &instruments, &macro_rows, &event_rows))
}

#[get("/api/market")]
pub async fn market(state: web::Data<DashboardState>) -> impl Responder {
    web::Json(load_market_snapshot(&state.paths.market_snapshot).await)
}

#[get("/api/macro")]
pub async fn macro_releases(state: web::Data<DashboardState>) -> impl Responder {
    web::Json(load_rows(&state.paths.macro_releases).await)
}

#[get("/api/events")]
pub async fn events(state: web::Data<DashboardState>) -> impl Responder {
    web::Json(load_rows(&state.paths.events).await)
}

#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(json!({ "status": "ok" }))
}
