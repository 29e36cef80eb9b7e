use async_trait::async_trait;
use bar_importer_core::cancel::CancellationToken;
use bar_importer_core::period::PeriodMap;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::{RawBar, SeriesFetcher};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Bar intervals understood by the Yahoo chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YahooInterval {
    OneDay,
    OneWeek,
    OneMonth,
}

impl YahooInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            YahooInterval::OneDay => "1d",
            YahooInterval::OneWeek => "1wk",
            YahooInterval::OneMonth => "1mo",
        }
    }
}

/// Yahoo Finance historical chart fetcher.
/// No authentication required.
pub struct YahooFetcher {
    client: Client,
    base_url: String,
}

impl YahooFetcher {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(YAHOO_CHART_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder().user_agent("Mozilla/5.0").build()?;
        Ok(Self { client, base_url })
    }

    async fn request(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        interval: YahooInterval,
    ) -> Result<Vec<RawBar>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, symbol))
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", interval.as_str().to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let body: YahooResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        parse_yahoo_response(symbol, body)
    }
}

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct YahooAdjClose {
    adjclose: Vec<Option<f64>>,
}

fn f64_to_decimal(val: f64) -> Result<Decimal, ProviderError> {
    Decimal::try_from(val).map_err(|e| ProviderError::Parse(format!("invalid decimal value: {e}")))
}

fn parse_yahoo_response(symbol: &str, body: YahooResponse) -> Result<Vec<RawBar>, ProviderError> {
    if let Some(error) = body.chart.error {
        if error.code == "Not Found" {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        return Err(ProviderError::Api {
            status: 0,
            message: format!("{}: {}", error.code, error.description),
        });
    }

    let results = body
        .chart
        .result
        .ok_or_else(|| ProviderError::Parse("no results in response".into()))?;

    match results.first() {
        Some(result) => parse_yahoo_result(symbol, result),
        None => Ok(Vec::new()),
    }
}

fn parse_yahoo_result(symbol: &str, result: &YahooResult) -> Result<Vec<RawBar>, ProviderError> {
    // A range with no trading sessions comes back without timestamps
    let Some(timestamps) = result.timestamp.as_ref() else {
        return Ok(Vec::new());
    };

    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };
    let adjclose = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|a| a.first())
        .map(|a| a.adjclose.as_slice())
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, &ts) in timestamps.iter().enumerate() {
        let prices = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = prices else {
            skipped += 1;
            continue;
        };
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);
        let adjusted_close = adjclose
            .get(i)
            .copied()
            .flatten()
            .map(f64_to_decimal)
            .transpose()?;

        let timestamp = Utc
            .timestamp_opt(ts, 0)
            .single()
            .ok_or_else(|| ProviderError::Parse(format!("invalid unix timestamp: {ts}")))?;

        bars.push(RawBar {
            timestamp,
            open: f64_to_decimal(open)?,
            high: f64_to_decimal(high)?,
            low: f64_to_decimal(low)?,
            close: f64_to_decimal(close)?,
            volume,
            adjusted_close,
        });
    }

    if skipped > 0 {
        warn!("{symbol}: skipped {skipped} row(s) with missing prices");
    }

    Ok(bars)
}

#[async_trait]
impl SeriesFetcher for YahooFetcher {
    type Period = YahooInterval;

    fn name(&self) -> &str {
        "yahoo"
    }

    fn period_map(&self) -> PeriodMap<YahooInterval> {
        PeriodMap::new(
            YahooInterval::OneDay,
            YahooInterval::OneWeek,
            YahooInterval::OneMonth,
        )
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        period: YahooInterval,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawBar>, ProviderError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            res = self.request(symbol, start, end, period) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bar_importer_core::period::Period;
    use rust_decimal_macros::dec;

    fn parse(json: &str) -> Result<Vec<RawBar>, ProviderError> {
        let response: YahooResponse = serde_json::from_str(json).unwrap();
        parse_yahoo_response("AAPL", response)
    }

    #[test]
    fn parse_yahoo_daily_response() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1609459200, 1609545600, 1609632000],
                    "indicators": {
                        "quote": [{
                            "open": [375.31, 380.12, 382.50],
                            "high": [380.00, 385.00, 390.00],
                            "low": [373.00, 378.50, 381.00],
                            "close": [378.85, 383.20, 388.75],
                            "volume": [50000000, 45000000, 55000000]
                        }],
                        "adjclose": [{
                            "adjclose": [370.10, 374.40, 379.90]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let bars = parse(json).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, Utc.timestamp_opt(1609459200, 0).unwrap());
        assert_eq!(bars[0].volume, 50000000);
        assert_eq!(bars[2].volume, 55000000);
        // f64 -> Decimal may carry precision noise
        assert!(bars[0].close > dec!(378.0) && bars[0].close < dec!(379.0));
        let adj = bars[1].adjusted_close.unwrap();
        assert!(adj > dec!(374.0) && adj < dec!(375.0));
    }

    #[test]
    fn parse_yahoo_response_with_null_values() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1609459200, 1609545600, 1609632000],
                    "indicators": {
                        "quote": [{
                            "open": [150.12, null, 151.00],
                            "high": [151.50, null, 152.00],
                            "low": [149.00, null, 150.50],
                            "close": [150.99, null, 151.75],
                            "volume": [1000, null, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let bars = parse(json).unwrap();

        // The null row is skipped, a missing volume becomes zero
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].volume, 0);
        assert!(bars[0].adjusted_close.is_none());
    }

    #[test]
    fn parse_yahoo_not_found() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        }"#;

        match parse(json) {
            Err(ProviderError::NotFound { symbol }) => assert_eq!(symbol, "AAPL"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn parse_yahoo_other_error() {
        let json = r#"{
            "chart": {
                "result": null,
                "error": {
                    "code": "Bad Request",
                    "description": "Invalid input - interval=1h is not supported"
                }
            }
        }"#;

        match parse(json) {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 0);
                assert!(message.starts_with("Bad Request: "));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_yahoo_missing_result_is_parse_error() {
        let json = r#"{ "chart": { "result": null, "error": null } }"#;
        assert!(matches!(parse(json), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn parse_yahoo_empty_range() {
        let json = r#"{
            "chart": {
                "result": [{
                    "indicators": { "quote": [] }
                }],
                "error": null
            }
        }"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn interval_codes() {
        assert_eq!(YahooInterval::OneDay.as_str(), "1d");
        assert_eq!(YahooInterval::OneWeek.as_str(), "1wk");
        assert_eq!(YahooInterval::OneMonth.as_str(), "1mo");
    }

    #[test]
    fn period_map_covers_interday_periods() {
        let fetcher = YahooFetcher::with_base_url("http://127.0.0.1:9".into()).unwrap();
        let map = fetcher.period_map();
        assert_eq!(map.lookup(Period::Daily), Some(YahooInterval::OneDay));
        assert_eq!(map.lookup(Period::Weekly), Some(YahooInterval::OneWeek));
        assert_eq!(map.lookup(Period::Monthly), Some(YahooInterval::OneMonth));
        assert_eq!(map.lookup(Period::Hourly), None);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_request() {
        let fetcher = YahooFetcher::with_base_url("http://127.0.0.1:9".into()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let start = chrono_tz::America::New_York
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap();
        let end = chrono_tz::America::New_York
            .with_ymd_and_hms(2020, 2, 1, 0, 0, 0)
            .unwrap();

        let res = fetcher
            .fetch_series("AAPL", start, end, YahooInterval::OneDay, &token)
            .await;
        assert!(matches!(res, Err(ProviderError::Cancelled)));
    }
}
