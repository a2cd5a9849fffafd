use crate::context::AppContext;
use crate::instruments::{
    add_instrument, display_order, load_instruments, remove_instrument, save_instruments,
};
use anyhow::Result;
use log::info;

const RERUN_HINT: &str = "Rerun `update_market` to refresh data.";

pub fn list(app: &AppContext) -> Result<()> {
    let instruments = load_instruments(&app.paths().market_instruments);
    let order = display_order(&instruments);

    println!("{:<4} {:<10} {:<12} {}", "#", "NAME", "SYMBOL", "ORDER");
    for (idx, name) in order.iter().enumerate() {
        let Some(instrument) = instruments.iter().find(|i| &i.name == name) else {
            continue;
        };
        let order = instrument
            .order
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<10} {:<12} {}",
            idx + 1,
            instrument.name,
            instrument.symbol,
            order
        );
    }
    Ok(())
}

pub fn add(app: &AppContext, name: &str, symbol: &str, order: Option<i64>) -> Result<()> {
    let path = app.paths().market_instruments;
    let mut instruments = load_instruments(&path);
    add_instrument(&mut instruments, name, symbol, order)?;
    save_instruments(&path, &instruments)?;
    info!("Added {}. {}", name.trim(), RERUN_HINT);
    Ok(())
}

pub fn remove(app: &AppContext, name: &str) -> Result<()> {
    let path = app.paths().market_instruments;
    let mut instruments = load_instruments(&path);
    let removed = remove_instrument(&mut instruments, name)?;
    save_instruments(&path, &instruments)?;
    info!("Removed {}. {}", removed.name, RERUN_HINT);
    Ok(())
}
