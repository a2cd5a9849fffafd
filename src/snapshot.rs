use crate::atomic_file::write_json_atomic;
use crate::close_utils::build_item;
use crate::models::{MarketInstrument, MarketItem, MarketSnapshot, ERROR_FETCH_FAILED_PREFIX};
use crate::yahoo::MarketDataSource;
use chrono::Utc;
use log::{info, warn};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("no instruments configured")]
    NoInstruments,
    #[error("market data fetch returned no prices for any of {attempted} instruments")]
    NoMarketData { attempted: usize },
    #[error("failed to write market snapshot: {0:#}")]
    Write(anyhow::Error),
}

/// Fetches every instrument in configuration order and assembles a snapshot.
///
/// Per-instrument failures are recorded on the item. When no instrument yields
/// a price the whole fetch is treated as failed so the caller keeps the
/// previous snapshot.
pub async fn build_snapshot<S: MarketDataSource>(
    source: &S,
    instruments: &[MarketInstrument],
) -> Result<MarketSnapshot, UpdateError> {
    if instruments.is_empty() {
        return Err(UpdateError::NoInstruments);
    }

    let mut items = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        let item = match source.fetch_daily_closes(&instrument.symbol).await {
            Ok(closes) => build_item(instrument, &closes),
            Err(err) => {
                warn!(
                    "Fetching {} ({}) failed: {:#}",
                    instrument.name, instrument.symbol, err
                );
                MarketItem::with_error(
                    instrument,
                    format!("{}: {}", ERROR_FETCH_FAILED_PREFIX, err),
                )
            }
        };
        if !item.error.is_empty() {
            warn!("{}: {}", item.name, item.error);
        }
        items.push(item);
    }

    let priced = items.iter().filter(|item| item.has_price()).count();
    if priced == 0 {
        return Err(UpdateError::NoMarketData {
            attempted: items.len(),
        });
    }
    info!("Fetched prices for {}/{} instruments", priced, items.len());

    Ok(MarketSnapshot {
        updated_at: Some(Utc::now()),
        items,
    })
}

pub fn write_snapshot(path: &Path, snapshot: &MarketSnapshot) -> Result<(), UpdateError> {
    write_json_atomic(path, snapshot).map_err(UpdateError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;
    use std::fs;

    struct StaticSource {
        closes: HashMap<String, Vec<Option<f64>>>,
    }

    impl StaticSource {
        fn new(entries: &[(&str, Vec<Option<f64>>)]) -> Self {
            Self {
                closes: entries
                    .iter()
                    .map(|(symbol, closes)| (symbol.to_string(), closes.clone()))
                    .collect(),
            }
        }
    }

    impl MarketDataSource for StaticSource {
        async fn fetch_daily_closes(&self, symbol: &str) -> Result<Vec<Option<f64>>> {
            self.closes
                .get(symbol)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    fn instruments() -> Vec<MarketInstrument> {
        vec![
            MarketInstrument::new("SPX", "^GSPC", Some(0)),
            MarketInstrument::new("10Y", "^TNX", Some(1)),
            MarketInstrument::new("BTC", "BTC-USD", Some(2)),
        ]
    }

    #[tokio::test]
    async fn builds_items_in_configuration_order() {
        let source = StaticSource::new(&[
            ("^GSPC", vec![Some(100.0), Some(110.0)]),
            ("^TNX", vec![None, None]),
        ]);

        let snapshot = build_snapshot(&source, &instruments()).await.unwrap();

        let names: Vec<_> = snapshot.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["SPX", "10Y", "BTC"]);
        assert_eq!(snapshot.items[0].price, Some(110.0));
        assert_eq!(snapshot.items[0].change_1d_pct, Some(10.0));
        assert_eq!(snapshot.items[1].error, "no_close_prices");
        assert_eq!(
            snapshot.items[2].error,
            "fetch_failed: connection refused"
        );
    }

    #[tokio::test]
    async fn fails_when_nothing_is_priced() {
        let source = StaticSource::new(&[("^GSPC", vec![])]);
        let err = build_snapshot(&source, &instruments()).await.unwrap_err();
        assert!(matches!(err, UpdateError::NoMarketData { attempted: 3 }));

        let err = build_snapshot(&source, &[]).await.unwrap_err();
        assert!(matches!(err, UpdateError::NoInstruments));
    }

    #[tokio::test]
    async fn unchanged_source_yields_identical_items() {
        let source = StaticSource::new(&[
            ("^GSPC", vec![Some(4000.0), Some(4100.0)]),
            ("^TNX", vec![Some(4.2)]),
            ("BTC-USD", vec![Some(60000.0), Some(61000.0)]),
        ]);

        let first = build_snapshot(&source, &instruments()).await.unwrap();
        let second = build_snapshot(&source, &instruments()).await.unwrap();

        assert_eq!(first.items, second.items);
        assert_eq!(
            serde_json::to_string(&first.items).unwrap(),
            serde_json::to_string(&second.items).unwrap()
        );
    }

    #[tokio::test]
    async fn written_snapshot_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("market_snapshot.json");
        let source = StaticSource::new(&[("^GSPC", vec![Some(1.0), Some(2.0)])]);
        let snapshot = build_snapshot(&source, &instruments()).await.unwrap();

        write_snapshot(&path, &snapshot).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["updated_at"].is_string());
        assert_eq!(raw["items"].as_array().map(Vec::len), Some(3));
        assert_eq!(raw["items"][1]["price"], serde_json::Value::Null);
        let parsed: MarketSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.items, snapshot.items);
    }
}
