use crate::atomic_file::write_json_atomic;
use crate::models::MarketInstrument;
use anyhow::{Context, Result};
use log::{log, Level};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstrumentConfigError {
    #[error("market config must be a list")]
    NotAList,
    #[error("entry {0} is not an object")]
    NotAnObject(usize),
    #[error("entry {0} missing name")]
    MissingName(usize),
    #[error("entry {0} missing symbol")]
    MissingSymbol(usize),
    #[error("entry {0} order must be int")]
    InvalidOrder(usize),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
    #[error("market config is empty")]
    Empty,
}

/// Rejections collected while validating an admin edit.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstrumentEditError {
    #[error("{}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error("Instrument '{0}' is not configured.")]
    UnknownName(String),
}

pub fn default_instruments() -> Vec<MarketInstrument> {
    vec![
        MarketInstrument::new("SPX", "^GSPC", Some(0)),
        MarketInstrument::new("NDX", "^NDX", Some(1)),
        MarketInstrument::new("10Y", "^TNX", Some(2)),
        MarketInstrument::new("DXY", "DX-Y.NYB", Some(3)),
        MarketInstrument::new("WTI", "CL=F", Some(4)),
        MarketInstrument::new("GOLD", "GC=F", Some(5)),
        MarketInstrument::new("BTC", "BTC-USD", Some(6)),
    ]
}

pub fn parse_instruments(raw: &Value) -> Result<Vec<MarketInstrument>, InstrumentConfigError> {
    let entries = raw.as_array().ok_or(InstrumentConfigError::NotAList)?;

    let mut seen_names = HashSet::new();
    let mut seen_symbols = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        let object = entry
            .as_object()
            .ok_or(InstrumentConfigError::NotAnObject(idx))?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or(InstrumentConfigError::MissingName(idx))?;
        let symbol = object
            .get("symbol")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or(InstrumentConfigError::MissingSymbol(idx))?;
        let order = match object.get("order") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_i64()
                    .ok_or(InstrumentConfigError::InvalidOrder(idx))?,
            ),
        };

        if !seen_names.insert(name.to_string()) {
            return Err(InstrumentConfigError::DuplicateName(name.to_string()));
        }
        if !seen_symbols.insert(symbol.to_string()) {
            return Err(InstrumentConfigError::DuplicateSymbol(symbol.to_string()));
        }
        items.push(MarketInstrument::new(name, symbol, order));
    }

    if items.is_empty() {
        return Err(InstrumentConfigError::Empty);
    }

    Ok(items)
}

/// Loads the configured instruments, falling back to the defaults when the
/// file is missing or invalid.
pub fn load_instruments(path: &Path) -> Vec<MarketInstrument> {
    load_instruments_or_default(path, Level::Warn)
}

/// Same as [`load_instruments`], reporting the fallback at `fallback_level`.
pub fn load_instruments_or_default(path: &Path, fallback_level: Level) -> Vec<MarketInstrument> {
    if !path.exists() {
        log!(
            fallback_level,
            "Market config missing at {}. Falling back to defaults.",
            path.display()
        );
        return default_instruments();
    }

    match read_instruments(path) {
        Ok(items) => items,
        Err(err) => {
            log!(
                fallback_level,
                "Market config invalid ({:#}). Falling back to defaults.",
                err
            );
            default_instruments()
        }
    }
}

fn read_instruments(path: &Path) -> Result<Vec<MarketInstrument>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parse_instruments(&raw)?)
}

pub fn save_instruments(path: &Path, instruments: &[MarketInstrument]) -> Result<()> {
    write_json_atomic(path, &instruments)
}

/// Instrument names in display order: explicit orders ascending, then the
/// unordered ones, each group stable by configuration position.
pub fn display_order(instruments: &[MarketInstrument]) -> Vec<String> {
    let mut indexed: Vec<(usize, &MarketInstrument)> = instruments.iter().enumerate().collect();
    indexed.sort_by_key(|(idx, instrument)| {
        (
            instrument.order.is_none(),
            instrument.order.unwrap_or(0),
            *idx,
        )
    });
    indexed
        .into_iter()
        .map(|(_, instrument)| instrument.name.clone())
        .collect()
}

pub fn add_instrument(
    instruments: &mut Vec<MarketInstrument>,
    name: &str,
    symbol: &str,
    order: Option<i64>,
) -> Result<(), InstrumentEditError> {
    let name = name.trim();
    let symbol = symbol.trim();
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push("Name is required.".to_string());
    }
    if symbol.is_empty() {
        errors.push("Symbol is required.".to_string());
    }
    if !name.is_empty() && instruments.iter().any(|i| i.name == name) {
        errors.push(format!("Name '{}' already exists.", name));
    }
    if !symbol.is_empty() && instruments.iter().any(|i| i.symbol == symbol) {
        errors.push(format!("Symbol '{}' already exists.", symbol));
    }

    if !errors.is_empty() {
        return Err(InstrumentEditError::Invalid(errors));
    }

    instruments.push(MarketInstrument::new(name, symbol, order));
    Ok(())
}

pub fn remove_instrument(
    instruments: &mut Vec<MarketInstrument>,
    name: &str,
) -> Result<MarketInstrument, InstrumentEditError> {
    let position = instruments
        .iter()
        .position(|instrument| instrument.name == name)
        .ok_or_else(|| InstrumentEditError::UnknownName(name.to_string()))?;
    Ok(instruments.remove(position))
}
