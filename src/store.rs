use crate::models::{MarketInstrument, MarketItem, MarketSnapshot, ERROR_INVALID_ITEM_PREFIX};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;

pub type Row = Map<String, Value>;

/// Load state of one data file as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Missing,
    Invalid { reason: String },
    Ready { data: T },
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            _ => None,
        }
    }

    fn invalid(path: &Path, reason: impl std::fmt::Display) -> Self {
        warn!("Ignoring {}: {}", path.display(), reason);
        Panel::Invalid {
            reason: reason.to_string(),
        }
    }
}

async fn read_json(path: &Path) -> Panel<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Panel::Missing,
        Err(err) => return Panel::invalid(path, format!("unreadable: {}", err)),
    };
    match serde_json::from_str(&content) {
        Ok(data) => Panel::Ready { data },
        Err(err) => Panel::invalid(path, format!("malformed JSON: {}", err)),
    }
}

/// Loads the market snapshot. Only a document that is not an object, or whose
/// `items` is not a list, is invalid as a whole; a bad timestamp drops the
/// caption and a bad item is shown with an error or skipped if unnamed.
pub async fn load_market_snapshot(path: &Path) -> Panel<MarketSnapshot> {
    let mut document = match read_json(path).await {
        Panel::Ready {
            data: Value::Object(document),
        } => document,
        Panel::Ready { .. } => return Panel::invalid(path, "snapshot must be a JSON object"),
        Panel::Missing => return Panel::Missing,
        Panel::Invalid { reason } => return Panel::Invalid { reason },
    };

    let entries = match document.remove("items") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Panel::invalid(path, "snapshot items must be a list"),
    };

    let updated_at = match document.remove("updated_at") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<DateTime<Utc>>(raw) {
            Ok(at) => Some(at),
            Err(err) => {
                warn!("{}: ignoring updated_at: {}", path.display(), err);
                None
            }
        },
    };

    Panel::Ready {
        data: MarketSnapshot {
            updated_at,
            items: decode_items(path, entries),
        },
    }
}

fn decode_items(path: &Path, entries: Vec<Value>) -> Vec<MarketItem> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
            let (name, symbol) = (text("name"), text("symbol"));
            match serde_json::from_value::<MarketItem>(entry) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!("{}: market item {} is malformed: {}", path.display(), idx, err);
                    let instrument =
                        MarketInstrument::new(&name?, symbol.as_deref().unwrap_or_default(), None);
                    Some(MarketItem::with_error(
                        &instrument,
                        format!("{}: {}", ERROR_INVALID_ITEM_PREFIX, err),
                    ))
                }
            }
        })
        .collect()
}

/// Loads a list of flat records. Non-list documents count as no rows and
/// non-object entries are skipped.
pub async fn load_rows(path: &Path) -> Panel<Vec<Row>> {
    match read_json(path).await {
        Panel::Ready {
            data: Value::Array(entries),
        } => Panel::Ready {
            data: entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect(),
        },
        Panel::Ready { .. } => Panel::Ready { data: Vec::new() },
        Panel::Missing => Panel::Missing,
        Panel::Invalid { reason } => Panel::Invalid { reason },
    }
}
