use crate::format::{escape_html, format_cell, format_pct, format_price};
use crate::instruments::display_order;
use crate::models::{MarketInstrument, MarketItem, MarketSnapshot};
use crate::store::{Panel, Row};
use std::collections::HashMap;
use std::fmt::Write;

pub const PAGE_TITLE: &str = "Macro + Market + Events (MVP)";
pub const HEADLINE_METRICS: [&str; 3] = ["SPX", "10Y", "DXY"];

const MARKET_COLUMNS: [&str; 7] = [
    "name",
    "symbol",
    "price",
    "change_1d_pct",
    "change_5d_pct",
    "change_20d_pct",
    "error",
];

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#1f2933}\
table{border-collapse:collapse;width:100%;margin:.5rem 0 1rem}\
th,td{border:1px solid #d9e2ec;padding:.35rem .6rem;text-align:left}\
th{background:#f0f4f8}\
.metrics{display:flex;gap:2rem;margin:1rem 0}\
.metric .value{font-size:1.6rem}\
.up{color:#2f8132}.down{color:#c62828}\
.notice{padding:.6rem 1rem;border-radius:4px}\
.info{background:#e3f2fd}.warning{background:#fff8e1}.error{background:#ffebee}\
.caption{color:#627d98;font-size:.9rem}";

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: String,
    pub delta: String,
}

/// Market table rows in display order plus the headline metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketView {
    pub updated_at: Option<String>,
    pub metrics: Vec<Metric>,
    pub rows: Vec<MarketItem>,
}

pub fn market_view(snapshot: &MarketSnapshot, instruments: &[MarketInstrument]) -> MarketView {
    let order_map: HashMap<String, usize> = display_order(instruments)
        .into_iter()
        .enumerate()
        .map(|(idx, name)| (name, idx))
        .collect();
    let unknown_rank = order_map.len();

    let mut rows = snapshot.items.clone();
    rows.sort_by(|a, b| {
        let rank_a = order_map.get(&a.name).copied().unwrap_or(unknown_rank);
        let rank_b = order_map.get(&b.name).copied().unwrap_or(unknown_rank);
        rank_a.cmp(&rank_b).then_with(|| a.name.cmp(&b.name))
    });

    let metrics = HEADLINE_METRICS
        .iter()
        .map(|label| match rows.iter().find(|row| row.name == *label) {
            Some(row) => Metric {
                label: label.to_string(),
                value: format_price(row.price),
                delta: format_pct(row.change_1d_pct),
            },
            None => Metric {
                label: label.to_string(),
                value: format_price(None),
                delta: format_pct(None),
            },
        })
        .collect();

    MarketView {
        updated_at: snapshot.updated_at.map(|at| at.to_rfc3339()),
        metrics,
        rows,
    }
}

/// Column names in first-seen order across all rows.
pub fn row_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|existing| existing == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

pub fn render_page(
    market: &Panel<MarketSnapshot>,
    instruments: &[MarketInstrument],
    macro_rows: &Panel<Vec<Row>>,
    event_rows: &Panel<Vec<Row>>,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title><style>{STYLE}</style></head><body><h1>{title}</h1>",
        title = escape_html(PAGE_TITLE)
    );
    render_market(&mut html, market, instruments);
    html.push_str("<hr>");
    render_rows(&mut html, "Macro Releases", "No macro releases available.", macro_rows);
    html.push_str("<hr>");
    render_rows(&mut html, "Breaking Events", "No events available.", event_rows);
    html.push_str("</body></html>");
    html
}

fn render_market(
    html: &mut String,
    panel: &Panel<MarketSnapshot>,
    instruments: &[MarketInstrument],
) {
    html.push_str("<section id=\"market\"><h2>Market Snapshot</h2>");
    match panel {
        Panel::Missing => notice(
            html,
            "warning",
            "Market snapshot missing. Run `update_market` to refresh.",
        ),
        Panel::Invalid { reason } => notice(
            html,
            "error",
            &format!("Market snapshot unreadable: {}", reason),
        ),
        Panel::Ready { data } => {
            let view = market_view(data, instruments);
            if let Some(updated_at) = &view.updated_at {
                let _ = write!(
                    html,
                    "<p class=\"caption\">Updated at (UTC): {}</p>",
                    escape_html(updated_at)
                );
            }
            if view.rows.is_empty() {
                notice(html, "info", "No market data available.");
            } else {
                render_metrics(html, &view.metrics);
                render_market_table(html, &view.rows);
            }
        }
    }
    html.push_str("</section>");
}

fn render_metrics(html: &mut String, metrics: &[Metric]) {
    html.push_str("<div class=\"metrics\">");
    for metric in metrics {
        let direction = if metric.delta.starts_with('+') {
            "up"
        } else if metric.delta.starts_with('-') {
            "down"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<div class=\"metric\"><div class=\"label\">{}</div>\
             <div class=\"value\">{}</div><div class=\"delta {}\">{}</div></div>",
            escape_html(&metric.label),
            escape_html(&metric.value),
            direction,
            escape_html(&metric.delta)
        );
    }
    html.push_str("</div>");
}

fn render_market_table(html: &mut String, rows: &[MarketItem]) {
    html.push_str("<table><thead><tr>");
    for column in MARKET_COLUMNS {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        let cells = [
            escape_html(&row.name),
            escape_html(&row.symbol),
            format_price(row.price),
            format_pct(row.change_1d_pct),
            format_pct(row.change_5d_pct),
            format_pct(row.change_20d_pct),
            escape_html(&row.error),
        ];
        html.push_str("<tr>");
        for cell in cells {
            let _ = write!(html, "<td>{}</td>", cell);
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}

fn render_rows(html: &mut String, title: &str, empty_text: &str, panel: &Panel<Vec<Row>>) {
    let _ = write!(html, "<section><h2>{}</h2>", escape_html(title));
    match panel {
        Panel::Invalid { reason } => notice(
            html,
            "error",
            &format!("{} unreadable: {}", title, reason),
        ),
        Panel::Ready { data } if !data.is_empty() => {
            let columns = row_columns(data);
            html.push_str("<table><thead><tr>");
            for column in &columns {
                let _ = write!(html, "<th>{}</th>", escape_html(column));
            }
            html.push_str("</tr></thead><tbody>");
            for row in data {
                html.push_str("<tr>");
                for column in &columns {
                    let cell = row.get(column).map(format_cell).unwrap_or_default();
                    let _ = write!(html, "<td>{}</td>", escape_html(&cell));
                }
                html.push_str("</tr>");
            }
            html.push_str("</tbody></table>");
        }
        _ => notice(html, "info", empty_text),
    }
    html.push_str("</section>");
}

fn notice(html: &mut String, kind: &str, text: &str) {
    let _ = write!(
        html,
        "<p class=\"notice {}\">{}</p>",
        kind,
        escape_html(text)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::default_instruments;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn item(name: &str, price: Option<f64>, change: Option<f64>) -> MarketItem {
        MarketItem {
            name: name.to_string(),
            symbol: format!("{}-SYM", name),
            price,
            change_1d_pct: change,
            change_5d_pct: None,
            change_20d_pct: None,
            error: String::new(),
        }
    }

    fn snapshot(items: Vec<MarketItem>) -> MarketSnapshot {
        MarketSnapshot {
            updated_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            items,
        }
    }

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn market_view_sorts_by_display_order_then_name() {
        let view = market_view(
            &snapshot(vec![
                item("ZETA", None, None),
                item("BTC", Some(1.0), None),
                item("ALPHA", None, None),
                item("SPX", Some(2.0), None),
            ]),
            &default_instruments(),
        );
        let names: Vec<_> = view.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["SPX", "BTC", "ALPHA", "ZETA"]);
    }

    #[test]
    fn market_view_fills_headline_metrics() {
        let view = market_view(
            &snapshot(vec![
                item("SPX", Some(5123.4), Some(0.456)),
                item("10Y", Some(4.5), Some(-1.0)),
            ]),
            &default_instruments(),
        );
        assert_eq!(
            view.metrics,
            vec![
                Metric {
                    label: "SPX".to_string(),
                    value: "5,123.40".to_string(),
                    delta: "+0.46%".to_string(),
                },
                Metric {
                    label: "10Y".to_string(),
                    value: "4.50".to_string(),
                    delta: "-1.00%".to_string(),
                },
                Metric {
                    label: "DXY".to_string(),
                    value: "n/a".to_string(),
                    delta: "n/a".to_string(),
                },
            ]
        );
        assert_eq!(view.updated_at.as_deref(), Some("2024-05-01T12:00:00+00:00"));
    }

    #[test]
    fn row_columns_are_first_seen_union() {
        let data = rows(json!([
            { "date": "2024-05-01", "release": "CPI" },
            { "release": "NFP", "actual": 175 },
        ]));
        assert_eq!(row_columns(&data), vec!["date", "release", "actual"]);
    }

    #[test]
    fn page_shows_values_from_snapshot() {
        let page = render_page(
            &Panel::Ready {
                data: snapshot(vec![item("SPX", Some(5123.4), Some(1.5))]),
            },
            &default_instruments(),
            &Panel::Ready {
                data: rows(json!([{ "release": "CPI <YoY>", "actual": 3.4 }])),
            },
            &Panel::Missing,
        );
        assert!(page.contains("<title>Macro + Market + Events (MVP)</title>"));
        assert!(page.contains("Updated at (UTC): 2024-05-01T12:00:00+00:00"));
        assert!(page.contains("<td>5,123.40</td>"));
        assert!(page.contains("+1.50%"));
        assert!(page.contains("<td>CPI &lt;YoY&gt;</td>"));
        assert!(page.contains("No events available."));
    }

    #[test]
    fn page_degrades_for_missing_and_invalid_files() {
        let page = render_page(
            &Panel::Missing,
            &default_instruments(),
            &Panel::Invalid {
                reason: "malformed JSON".to_string(),
            },
            &Panel::Ready { data: Vec::new() },
        );
        assert!(page.contains("Market snapshot missing."));
        assert!(page.contains("Macro Releases unreadable: malformed JSON"));
        assert!(page.contains("No events available."));
    }

    #[test]
    fn empty_snapshot_shows_notice() {
        let page = render_page(
            &Panel::Ready {
                data: snapshot(Vec::new()),
            },
            &default_instruments(),
            &Panel::Missing,
            &Panel::Missing,
        );
        assert!(page.contains("No market data available."));
        assert!(!page.contains("<table>"));
    }

    #[test]
    fn snapshot_without_timestamp_omits_caption() {
        let mut data = snapshot(vec![item("SPX", Some(1.0), None)]);
        data.updated_at = None;
        let page = render_page(
            &Panel::Ready { data },
            &default_instruments(),
            &Panel::Missing,
            &Panel::Missing,
        );
        assert!(!page.contains("Updated at"));
        assert!(page.contains("<td>1.00</td>"));
    }
}
