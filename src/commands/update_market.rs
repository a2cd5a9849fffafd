use crate::context::AppContext;
use crate::instruments::load_instruments;
use crate::snapshot::{build_snapshot, write_snapshot};
use crate::yahoo::MarketDataSource;
use anyhow::Result;
use log::info;

pub async fn run(app: &AppContext) -> Result<()> {
    let client = app.market_data_client()?;
    run_with_source(app, &client).await
}

/// Fetches and writes the snapshot. On any failure the previous snapshot file
/// is left as it was.
pub async fn run_with_source<S: MarketDataSource>(app: &AppContext, source: &S) -> Result<()> {
    let paths = app.paths();
    let instruments = load_instruments(&paths.market_instruments);
    info!(
        "Refreshing market snapshot for {} instruments at {}",
        instruments.len(),
        paths.market_snapshot.display()
    );

    let snapshot = build_snapshot(source, &instruments).await?;
    write_snapshot(&paths.market_snapshot, &snapshot)?;

    info!(
        "Market snapshot successfully written to {}",
        paths.market_snapshot.display()
    );
    Ok(())
}
