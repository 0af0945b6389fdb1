//! Yahoo Finance Provider
//!
//! HTTP implementation of the bars-provider port against the public chart
//! endpoints. Handles the exchange-suffix convention (".NS" for NSE) at this
//! boundary so the rest of the system only sees plain symbols.
//!
//! Bulk responses are parsed defensively: the multi-symbol endpoint has been
//! observed to change shape between releases, and anything that does not
//! carry per-symbol OHLC arrays is reported as ambiguous so the fetch layer
//! can fall back to per-ticker requests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::{Bar, Series};
use crate::ports::provider::{BarsProvider, Interval, Lookback, ProviderError, TickerMeta};

/// Provider tuning (`[provider]` section).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    pub base_url: String,
    /// Exchange suffix appended to plain symbols ("" to disable)
    pub exchange_suffix: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            exchange_suffix: ".NS".to_string(),
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (equityscan)".to_string(),
        }
    }
}

pub struct YahooProvider {
    client: Client,
    config: YahooConfig,
}

// Wire types. Every level is optional; absence anywhere downgrades to an
// ambiguity error rather than a panic.

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Option<ChartBody>,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Option<Vec<QuoteBlock>>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
struct SparkEnvelope {
    spark: Option<ChartBody>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: Option<QuoteSummaryBody>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "summaryProfile")]
    summary_profile: Option<SummaryProfile>,
    #[serde(rename = "financialData")]
    financial_data: Option<FinancialData>,
    price: Option<PriceBlock>,
}

#[derive(Debug, Deserialize)]
struct SummaryProfile {
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinancialData {
    #[serde(rename = "revenueGrowth")]
    revenue_growth: Option<RawValue>,
    #[serde(rename = "returnOnEquity")]
    return_on_equity: Option<RawValue>,
    #[serde(rename = "debtToEquity")]
    debt_to_equity: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct PriceBlock {
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

impl YahooProvider {
    pub fn new(config: YahooConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Append the exchange suffix unless the symbol already carries one.
    fn full_symbol(&self, symbol: &str) -> String {
        if self.config.exchange_suffix.is_empty()
            || symbol.ends_with(&self.config.exchange_suffix)
        {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, self.config.exchange_suffix)
        }
    }

    fn plain_symbol<'a>(&self, symbol: &'a str) -> &'a str {
        symbol
            .strip_suffix(&self.config.exchange_suffix)
            .unwrap_or(symbol)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Http(format!(
                "status {} from {}",
                response.status(),
                url
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Turn one chart result into a series. Missing OHLC arrays mean the
    /// endpoint answered in a shape we do not trust.
    fn parse_chart(symbol: &str, result: &ChartResult) -> Result<Series, ProviderError> {
        let timestamps = result
            .timestamp
            .as_ref()
            .ok_or_else(|| ProviderError::AmbiguousResponse(format!("no timestamps for {symbol}")))?;
        let quote = result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.as_ref())
            .and_then(|q| q.first())
            .ok_or_else(|| ProviderError::AmbiguousResponse(format!("no quote block for {symbol}")))?;

        let (open, high, low, close, volume) = match (
            quote.open.as_ref(),
            quote.high.as_ref(),
            quote.low.as_ref(),
            quote.close.as_ref(),
            quote.volume.as_ref(),
        ) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
            _ => {
                return Err(ProviderError::AmbiguousResponse(format!(
                    "incomplete OHLCV arrays for {symbol}"
                )))
            }
        };
        let n = timestamps.len();
        if [open.len(), high.len(), low.len(), close.len(), volume.len()]
            .iter()
            .any(|len| *len != n)
        {
            return Err(ProviderError::AmbiguousResponse(format!(
                "misaligned OHLCV arrays for {symbol}"
            )));
        }

        let mut series = Series::new();
        for i in 0..n {
            // Holidays and halts come through as null rows; skip them.
            let (Some(o), Some(h), Some(l), Some(c)) = (open[i], high[i], low[i], close[i])
            else {
                continue;
            };
            let date = DateTime::from_timestamp(timestamps[i], 0)
                .ok_or_else(|| ProviderError::Parse(format!("bad timestamp for {symbol}")))?
                .date_naive();
            let bar = Bar::new(date, o, h, l, c, volume[i].unwrap_or(0));
            if !bar.is_valid() {
                continue;
            }
            if series.push(bar).is_err() {
                // Duplicate or out-of-order timestamp; keep the first
                continue;
            }
        }

        if series.is_empty() {
            return Err(ProviderError::NoData(symbol.to_string()));
        }
        Ok(series)
    }
}

#[async_trait]
impl BarsProvider for YahooProvider {
    async fn fetch_bulk(
        &self,
        tickers: &[String],
        lookback: Lookback,
        interval: Interval,
    ) -> Result<HashMap<String, Series>, ProviderError> {
        let joined = tickers
            .iter()
            .map(|t| self.full_symbol(t))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/v7/finance/spark?symbols={}&range={}&interval={}",
            self.config.base_url,
            joined,
            lookback.as_range(),
            interval.as_str()
        );

        let envelope: SparkEnvelope = self.get_json(&url).await?;
        let body = envelope
            .spark
            .ok_or_else(|| ProviderError::AmbiguousResponse("no spark body".into()))?;
        if let Some(err) = body.error {
            return Err(ProviderError::Http(format!(
                "{}: {}",
                err.code.unwrap_or_default(),
                err.description.unwrap_or_default()
            )));
        }
        let results = body
            .result
            .ok_or_else(|| ProviderError::AmbiguousResponse("no result array".into()))?;

        let mut out = HashMap::new();
        for result in &results {
            let Some(full) = result.meta.as_ref().and_then(|m| m.symbol.as_deref()) else {
                return Err(ProviderError::AmbiguousResponse(
                    "bulk entry without a symbol".into(),
                ));
            };
            let plain = self.plain_symbol(full).to_string();
            match Self::parse_chart(&plain, result) {
                Ok(series) => {
                    out.insert(plain, series);
                }
                Err(ProviderError::NoData(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn fetch_single(
        &self,
        ticker: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Result<Series, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.config.base_url,
            self.full_symbol(ticker),
            lookback.as_range(),
            interval.as_str()
        );

        let envelope: ChartEnvelope = self.get_json(&url).await?;
        let body = envelope
            .chart
            .ok_or_else(|| ProviderError::Parse("no chart body".into()))?;
        if let Some(err) = body.error {
            return Err(ProviderError::NoData(format!(
                "{}: {}",
                ticker,
                err.description.unwrap_or_default()
            )));
        }
        let result = body
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))?;

        Self::parse_chart(ticker, &result)
    }

    async fn fetch_meta(&self, ticker: &str) -> Result<TickerMeta, ProviderError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=price,summaryProfile,financialData",
            self.config.base_url,
            self.full_symbol(ticker)
        );

        let envelope: QuoteSummaryEnvelope = self.get_json(&url).await?;
        let result = envelope
            .quote_summary
            .and_then(|b| b.result)
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))?;

        let raw = |v: &Option<RawValue>| v.as_ref().and_then(|r| r.raw);
        let financial = result.financial_data.as_ref();
        Ok(TickerMeta {
            symbol: self.plain_symbol(ticker).to_string(),
            sector: result.summary_profile.and_then(|p| p.sector),
            market_cap: result.price.as_ref().and_then(|p| raw(&p.market_cap)),
            revenue_growth: financial.and_then(|f| raw(&f.revenue_growth)),
            roe: financial.and_then(|f| raw(&f.return_on_equity)),
            debt_to_equity: financial.and_then(|f| raw(&f.debt_to_equity)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_result(json: serde_json::Value) -> ChartResult {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_a_complete_chart_payload() {
        let result = chart_result(serde_json::json!({
            "meta": {"symbol": "INFY.NS"},
            "timestamp": [1704067200, 1704153600, 1704240000],
            "indicators": {"quote": [{
                "open":   [100.0, 101.0, 102.0],
                "high":   [101.0, 102.0, 103.0],
                "low":    [99.0, 100.0, 101.0],
                "close":  [100.5, 101.5, 102.5],
                "volume": [1000, 1100, 1200]
            }]}
        }));
        let series = YahooProvider::parse_chart("INFY", &result).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last().unwrap().close, 102.5);
    }

    #[test]
    fn null_rows_are_skipped() {
        let result = chart_result(serde_json::json!({
            "timestamp": [1704067200, 1704153600],
            "indicators": {"quote": [{
                "open":   [100.0, null],
                "high":   [101.0, null],
                "low":    [99.0, null],
                "close":  [100.5, null],
                "volume": [1000, null]
            }]}
        }));
        let series = YahooProvider::parse_chart("X", &result).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn missing_quote_block_is_ambiguous() {
        let result = chart_result(serde_json::json!({
            "timestamp": [1704067200]
        }));
        let err = YahooProvider::parse_chart("X", &result).unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousResponse(_)));
    }

    #[test]
    fn misaligned_arrays_are_ambiguous() {
        let result = chart_result(serde_json::json!({
            "timestamp": [1704067200, 1704153600],
            "indicators": {"quote": [{
                "open":   [100.0],
                "high":   [101.0],
                "low":    [99.0],
                "close":  [100.5],
                "volume": [1000]
            }]}
        }));
        let err = YahooProvider::parse_chart("X", &result).unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousResponse(_)));
    }

    #[test]
    fn exchange_suffix_round_trip() {
        let provider = YahooProvider::new(YahooConfig::default()).unwrap();
        assert_eq!(provider.full_symbol("INFY"), "INFY.NS");
        assert_eq!(provider.full_symbol("INFY.NS"), "INFY.NS");
        assert_eq!(provider.plain_symbol("INFY.NS"), "INFY");
        assert_eq!(provider.plain_symbol("INFY"), "INFY");
    }

    #[test]
    fn empty_suffix_leaves_symbols_alone() {
        let provider = YahooProvider::new(YahooConfig {
            exchange_suffix: String::new(),
            ..YahooConfig::default()
        })
        .unwrap();
        assert_eq!(provider.full_symbol("AAPL"), "AAPL");
    }
}
