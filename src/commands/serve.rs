use crate::context::AppContext;
use crate::server::{configure, DashboardState};
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use log::info;

pub async fn run(app: &AppContext) -> Result<()> {
    let settings = app.settings();
    let state = web::Data::new(DashboardState::new(app.paths()));

    info!(
        "Serving dashboard from {} on http://{}:{}",
        settings.data_dir.display(),
        settings.host,
        settings.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await
    .context("dashboard server terminated with an error")
}
