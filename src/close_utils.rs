use crate::models::{MarketInstrument, MarketItem, ERROR_NO_CLOSE_PRICES};

/// Lookbacks, in trading days, for the change columns of a market item.
pub const ONE_DAY: usize = 1;
pub const FIVE_DAYS: usize = 5;
pub const TWENTY_DAYS: usize = 20;

/// Percentage change from `previous` to `current`, or `None` when either side
/// is missing or `previous` is zero.
pub fn pct_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// The `n`th close from the end (`n == 0` is the latest), skipping gaps.
pub fn last_nth(closes: &[Option<f64>], n: usize) -> Option<f64> {
    closes
        .iter()
        .rev()
        .copied()
        .flatten()
        .filter(|close| close.is_finite())
        .nth(n)
}

pub fn has_closes(closes: &[Option<f64>]) -> bool {
    last_nth(closes, 0).is_some()
}

pub fn build_item(instrument: &MarketInstrument, closes: &[Option<f64>]) -> MarketItem {
    if !has_closes(closes) {
        return MarketItem::with_error(instrument, ERROR_NO_CLOSE_PRICES);
    }

    let latest = last_nth(closes, 0);
    MarketItem {
        price: latest,
        change_1d_pct: pct_change(latest, last_nth(closes, ONE_DAY)),
        change_5d_pct: pct_change(latest, last_nth(closes, FIVE_DAYS)),
        change_20d_pct: pct_change(latest, last_nth(closes, TWENTY_DAYS)),
        ..MarketItem::empty(instrument)
    }
}
