use crate::close_utils::has_closes;
use crate::retry::{retry_with_backoff, MAX_RETRIES};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

/// History windows tried in turn until one yields closes.
pub const CHART_RANGES: [&str; 4] = ["1y", "6mo", "3mo", "1mo"];
const CHART_INTERVAL: &str = "1d";

/// Source of daily close prices for a symbol, oldest first. Gaps are `None`.
pub trait MarketDataSource {
    fn fetch_daily_closes(&self, symbol: &str) -> impl Future<Output = Result<Vec<Option<f64>>>>;
}

/// Client for the Yahoo Finance v8 chart endpoint.
pub struct YahooChartClient {
    http: Client,
    base_url: String,
    max_retries: u32,
}

impl YahooChartClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn chart_url(&self, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("market data base URL {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        range: &str,
    ) -> Result<Vec<Option<f64>>, ChartFetchError> {
        let url = self.chart_url(symbol).map_err(ChartFetchError::Url)?;
        let context = format!("chart {} ({})", symbol, range);
        retry_with_backoff(&context, self.max_retries, ChartFetchError::is_transient, || {
            let url = url.clone();
            async move {
                let transport = |error: reqwest::Error| ChartFetchError::Transport {
                    url: url.to_string(),
                    error,
                };
                let response = self
                    .http
                    .get(url.clone())
                    .query(&[("range", range), ("interval", CHART_INTERVAL)])
                    .send()
                    .await
                    .map_err(transport)?;

                // Unknown or delisted symbols come back as 404 with an error body.
                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    return Ok(Vec::new());
                }
                if !status.is_success() {
                    return Err(ChartFetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }

                let body = response.text().await.map_err(transport)?;
                serde_json::from_str::<ChartResponse>(&body)?.into_closes()
            }
        })
        .await
    }
}

impl MarketDataSource for YahooChartClient {
    async fn fetch_daily_closes(&self, symbol: &str) -> Result<Vec<Option<f64>>> {
        let mut last_error = None;
        let mut any_response = false;

        for range in CHART_RANGES {
            match self.fetch_range(symbol, range).await {
                Ok(closes) if has_closes(&closes) => {
                    debug!("{}: {} closes over {}", symbol, closes.len(), range);
                    return Ok(closes);
                }
                Ok(_) => {
                    any_response = true;
                    debug!("{}: no closes over {}", symbol, range);
                }
                // Retries are exhausted; shorter ranges hit the same unavailable source.
                Err(err) if err.is_transient() => return Err(err.into()),
                Err(err) => {
                    warn!("{}: chart request over {} failed: {}", symbol, range, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !any_response => Err(err.into()),
            _ => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChartFetchError {
    #[error("{0:#}")]
    Url(anyhow::Error),
    #[error("GET {url} failed: {error}")]
    Transport { url: String, error: reqwest::Error },
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("chart API error {code}: {description}")]
    Api { code: String, description: String },
    #[error("failed to parse chart response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ChartFetchError {
    /// Whether the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            ChartFetchError::Transport { .. } => true,
            ChartFetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ChartFetchError::Url(_) | ChartFetchError::Api { .. } | ChartFetchError::Decode(_) => {
                false
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_closes(self) -> Result<Vec<Option<f64>>, ChartFetchError> {
        if let Some(error) = self.chart.error {
            return Err(ChartFetchError::Api {
                code: error.code.unwrap_or_else(|| "unknown".to_string()),
                description: error.description.unwrap_or_default(),
            });
        }

        Ok(self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.indicators)
            .and_then(|indicators| indicators.quote.into_iter().next())
            .map(|quote| quote.close)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closes_with_gaps() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"^GSPC"},
            "timestamp":[1,2,3],
            "indicators":{"quote":[{"open":[1.0,2.0,3.0],"close":[4500.5,null,4510.25]}]}}],
            "error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.into_closes().unwrap(),
            vec![Some(4500.5), None, Some(4510.25)]
        );
    }

    #[test]
    fn empty_result_yields_no_closes() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.into_closes().unwrap().is_empty());

        let body = r#"{"chart":{"result":null,"error":null}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.into_closes().unwrap().is_empty());
    }

    #[test]
    fn api_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let err = parsed.into_closes().unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
    }

    #[test]
    fn only_server_side_failures_are_transient() {
        let status = |status| ChartFetchError::Status {
            url: "http://localhost/v8/finance/chart/SPY".to_string(),
            status,
        };
        assert!(status(StatusCode::INTERNAL_SERVER_ERROR).is_transient());
        assert!(status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(!status(StatusCode::BAD_REQUEST).is_transient());
        assert!(!status(StatusCode::FORBIDDEN).is_transient());

        let api = ChartFetchError::Api {
            code: "Bad Request".to_string(),
            description: "Invalid range".to_string(),
        };
        assert!(!api.is_transient());

        let decode = serde_json::from_str::<ChartResponse>("<html>").unwrap_err();
        assert!(!ChartFetchError::from(decode).is_transient());
    }

    #[test]
    fn chart_url_escapes_symbols() {
        let client = YahooChartClient::new(Client::new(), "http://localhost:9000/");
        let url = client.chart_url("CL=F").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v8/finance/chart/CL=F");

        let url = client.chart_url("A/B C").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/A%2FB%20C");
    }
}
