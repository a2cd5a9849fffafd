use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ERROR_NO_CLOSE_PRICES: &str = "no_close_prices";
pub const ERROR_FETCH_FAILED_PREFIX: &str = "fetch_failed";
pub const ERROR_INVALID_ITEM_PREFIX: &str = "invalid_item";

/// One entry of `market_instruments.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInstrument {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub order: Option<i64>,
}

impl MarketInstrument {
    pub fn new(name: &str, symbol: &str, order: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            order,
        }
    }
}

/// Point-in-time capture of daily market moves, as written by the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<MarketItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketItem {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change_1d_pct: Option<f64>,
    #[serde(default)]
    pub change_5d_pct: Option<f64>,
    #[serde(default)]
    pub change_20d_pct: Option<f64>,
    #[serde(default)]
    pub error: String,
}

impl MarketItem {
    pub fn empty(instrument: &MarketInstrument) -> Self {
        Self {
            name: instrument.name.clone(),
            symbol: instrument.symbol.clone(),
            price: None,
            change_1d_pct: None,
            change_5d_pct: None,
            change_20d_pct: None,
            error: String::new(),
        }
    }

    pub fn with_error(instrument: &MarketInstrument, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::empty(instrument)
        }
    }

    pub fn has_price(&self) -> bool {
        self.price.is_some()
    }
}
