use anyhow::Result;
use log::error;
use macro_dash::{commands::update_market, context::AppContext};

/// Same as `macro-dash update-market`, configured from the environment only.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_context = AppContext::from_env()?;
    if let Err(err) = update_market::run(&app_context).await {
        error!("Market snapshot update failed: {:#}", err);
        return Err(err);
    }
    Ok(())
}
