//! Tiingo price client.
//!
//! End-of-day data (daily, weekly, monthly) comes from the `tiingo/daily`
//! endpoint in one call, resampled server-side. Intraday data comes from the
//! IEX endpoint, which caps how much history one call returns, so requests
//! are split into date windows and merged.
//!
//! Crypto pairs come from `tiingo/crypto/prices`, which wraps the bars in a
//! per-ticker `priceData` array and only resamples up to one day; weekly and
//! monthly crypto bars are aggregated locally.

use super::{
    decode, download_windows, into_series, parse_timestamp, resample, send, PriceProvider,
    PriceRequest,
};
use crate::config::DataConfig;
use crate::data::{DataError, HttpRequest, HttpTransport};
use crate::domain::{AssetClass, DateRange, Interval, PriceBar, PriceSeries};
use serde::Deserialize;
use std::sync::Arc;

pub const TIINGO_BASE_URL: &str = "https://api.tiingo.com";

const COLUMNS: &str = "date,open,high,low,close,volume";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TiingoBody {
    Bars(Vec<TiingoBar>),
    Error { detail: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TiingoCryptoBody {
    Tickers(Vec<TiingoCryptoTicker>),
    Error { detail: String },
}

#[derive(Debug, Deserialize)]
struct TiingoCryptoTicker {
    #[serde(rename = "priceData", default)]
    price_data: Vec<TiingoBar>,
}

#[derive(Debug, Deserialize)]
struct TiingoBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Tiingo REST client. The API key travels in the `Authorization` header.
pub struct TiingoClient {
    transport: Arc<dyn HttpTransport>,
    api_key: Option<String>,
    base_url: String,
}

impl TiingoClient {
    pub const NAME: &'static str = "tiingo";

    pub fn new(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            transport,
            api_key,
            base_url: TIINGO_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &DataConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(transport, config.tiingo.api_key().map(str::to_string))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Days of IEX history requested per call. `None` for end-of-day intervals.
    pub fn window_days(interval: Interval) -> Option<i64> {
        match interval {
            Interval::Minute1 => Some(7),
            Interval::Minute5 => Some(30),
            Interval::Minute15 => Some(90),
            Interval::Minute30 => Some(180),
            Interval::Hour1 => Some(365),
            Interval::Hour4 => Some(730),
            Interval::Daily | Interval::Weekly | Interval::Monthly => None,
        }
    }

    fn api_key(&self) -> Result<&str, DataError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DataError::auth(Self::NAME, "no API key configured (TIINGO_API_KEY)"))
    }

    fn endpoint(&self, symbol: &str, interval: Interval) -> String {
        if interval.is_intraday() {
            format!("{}/iex/{symbol}/prices", self.base_url)
        } else {
            format!("{}/tiingo/daily/{symbol}/prices", self.base_url)
        }
    }

    fn fetch_crypto_window(
        &self,
        api_key: &str,
        request: &PriceRequest,
        interval: Interval,
        window: DateRange,
    ) -> Result<Vec<PriceBar>, DataError> {
        let http = HttpRequest::get(format!("{}/tiingo/crypto/prices", self.base_url))
            .with_header("Authorization", format!("Token {api_key}"))
            .with_header("Content-Type", "application/json")
            .with_query("tickers", request.symbol.to_ascii_lowercase())
            .with_query("startDate", window.start().to_string())
            .with_query("endDate", window.end().to_string())
            .with_query("resampleFreq", crypto_freq(interval));

        let response = send(self.transport.as_ref(), Self::NAME, &http)?;
        match decode::<TiingoCryptoBody>(Self::NAME, &response.body)? {
            TiingoCryptoBody::Tickers(tickers) => tickers
                .into_iter()
                .flat_map(|t| t.price_data)
                .map(|row| to_bar(&request.symbol, row))
                .collect(),
            TiingoCryptoBody::Error { detail } => Err(body_error(detail)),
        }
    }

    fn download_crypto(
        &self,
        api_key: &str,
        request: &PriceRequest,
    ) -> Result<Vec<PriceBar>, DataError> {
        match request.interval {
            Interval::Weekly | Interval::Monthly => {
                let daily =
                    self.fetch_crypto_window(api_key, request, Interval::Daily, request.range)?;
                let daily = PriceSeries::from_bars(request.symbol.as_str(), Interval::Daily, daily);
                Ok(resample(daily.bars(), request.interval))
            }
            interval => match Self::window_days(interval) {
                Some(days) => download_windows(request.range, days, |window| {
                    self.fetch_crypto_window(api_key, request, interval, window)
                }),
                None => self.fetch_crypto_window(api_key, request, interval, request.range),
            },
        }
    }

    fn fetch_window(
        &self,
        api_key: &str,
        request: &PriceRequest,
        window: DateRange,
    ) -> Result<Vec<PriceBar>, DataError> {
        let http = HttpRequest::get(self.endpoint(&request.symbol, request.interval))
            .with_header("Authorization", format!("Token {api_key}"))
            .with_header("Content-Type", "application/json")
            .with_query("startDate", window.start().to_string())
            .with_query("endDate", window.end().to_string())
            .with_query("resampleFreq", request.interval.as_code())
            .with_query("columns", COLUMNS);

        let response = send(self.transport.as_ref(), Self::NAME, &http)?;
        match decode::<TiingoBody>(Self::NAME, &response.body)? {
            TiingoBody::Bars(rows) => rows
                .into_iter()
                .map(|row| to_bar(&request.symbol, row))
                .collect(),
            TiingoBody::Error { detail } => Err(body_error(detail)),
        }
    }
}

/// `resampleFreq` vocabulary of the crypto endpoint.
fn crypto_freq(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily | Interval::Weekly | Interval::Monthly => "1day",
        other => other.as_code(),
    }
}

fn to_bar(symbol: &str, row: TiingoBar) -> Result<PriceBar, DataError> {
    let timestamp = parse_timestamp(&row.date).ok_or_else(|| {
        DataError::response(TiingoClient::NAME, format!("bad date '{}'", row.date))
    })?;
    Ok(PriceBar {
        symbol: symbol.to_string(),
        timestamp,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: row.volume.unwrap_or(0.0),
    })
}

fn body_error(detail: String) -> DataError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("token") || lower.contains("authenticat") {
        DataError::auth(TiingoClient::NAME, detail)
    } else if lower.contains("limit") {
        DataError::RateLimit {
            provider: TiingoClient::NAME.to_string(),
            retry_after_secs: None,
        }
    } else {
        DataError::response(TiingoClient::NAME, detail)
    }
}

impl PriceProvider for TiingoClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, _interval: Interval) -> bool {
        true
    }

    fn supports_asset(&self, _asset: AssetClass) -> bool {
        true
    }

    fn download(&self, request: &PriceRequest) -> Result<PriceSeries, DataError> {
        let api_key = self.api_key()?;
        if request.asset == AssetClass::Crypto {
            let bars = self.download_crypto(api_key, request)?;
            return into_series(Self::NAME, request, bars);
        }

        let bars = match Self::window_days(request.interval) {
            Some(days) => download_windows(request.range, days, |window| {
                self.fetch_window(api_key, request, window)
            })?,
            None => self.fetch_window(api_key, request, request.range)?,
        };
        into_series(Self::NAME, request, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheOptions;
    use crate::data::{HttpResponse, StubTransport};

    const DAILY: &str = r#"[
        {"date":"2023-01-04T00:00:00.000Z","open":126.89,"high":128.66,"low":125.08,"close":126.36,"volume":89113633},
        {"date":"2023-01-03T00:00:00.000Z","open":130.28,"high":130.9,"low":124.17,"close":125.07,"volume":112117471}
    ]"#;

    const INTRADAY: &str = r#"[
        {"date":"2023-01-03T14:30:00.000Z","open":130.28,"high":130.9,"low":129.9,"close":130.1},
        {"date":"2023-01-03T14:31:00.000Z","open":130.1,"high":130.3,"low":129.95,"close":130.2}
    ]"#;

    fn client(stub: &Arc<StubTransport>) -> TiingoClient {
        TiingoClient::new(stub.clone(), Some("secret".into()))
    }

    fn fetch(
        client: &TiingoClient,
        symbol: &str,
        start: &str,
        end: &str,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        client.fetch_single(symbol, start, end, interval, &CacheOptions::disabled())
    }

    #[test]
    fn daily_uses_eod_endpoint_with_token_header() {
        let stub = Arc::new(
            StubTransport::new().route("/tiingo/daily/AAPL", HttpResponse::ok(DAILY)),
        );
        let series = fetch(&client(&stub), "aapl", "2023-01-03", "2023-01-04", Interval::Daily)
            .unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 2);
        assert!(series.first_timestamp() < series.last_timestamp());
        assert_eq!(series.bars()[0].close, 125.07);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Token secret")
        );
        assert_eq!(requests[0].query_value("resampleFreq"), Some("daily"));
        assert!(!requests[0].url.contains("secret"));
    }

    #[test]
    fn weekly_is_resampled_server_side() {
        let stub = Arc::new(
            StubTransport::new().route("/tiingo/daily/SPY", HttpResponse::ok(DAILY)),
        );
        fetch(&client(&stub), "SPY", "2023-01-01", "2023-03-01", Interval::Weekly)
            .unwrap();
        assert_eq!(stub.requests()[0].query_value("resampleFreq"), Some("weekly"));
    }

    #[test]
    fn intraday_is_windowed_and_defaults_volume() {
        let stub = Arc::new(StubTransport::new().route("/iex/AAPL", HttpResponse::ok(INTRADAY)));
        let series = fetch(&client(&stub), "AAPL", "2023-01-01", "2023-01-20", Interval::Minute1)
            .unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query_value("startDate"), Some("2023-01-01"));
        assert_eq!(requests[0].query_value("endDate"), Some("2023-01-07"));
        assert_eq!(requests[2].query_value("endDate"), Some("2023-01-20"));
        assert_eq!(requests[0].query_value("resampleFreq"), Some("1min"));

        // identical windows collapse to the unique timestamps
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].volume, 0.0);
    }

    const CRYPTO: &str = r#"[{"ticker":"btcusd","baseCurrency":"btc","quoteCurrency":"usd","priceData":[
        {"date":"2023-01-03T00:00:00+00:00","open":16625.5,"high":16760.0,"low":16573.3,"close":16674.3,"volume":17914.8,"volumeNotional":298714520.1,"tradesDone":160044},
        {"date":"2023-01-04T00:00:00+00:00","open":16674.3,"high":16991.7,"low":16658.9,"close":16852.9,"volume":26310.7,"volumeNotional":443406871.6,"tradesDone":221870},
        {"date":"2023-01-09T00:00:00+00:00","open":17125.0,"high":17389.1,"low":17101.2,"close":17178.1,"volume":30522.5,"volumeNotional":524336197.2,"tradesDone":250001}
    ]}]"#;

    #[test]
    fn crypto_uses_ticker_query_and_price_data() {
        let stub = Arc::new(
            StubTransport::new().route("/tiingo/crypto/prices", HttpResponse::ok(CRYPTO)),
        );
        let series = client(&stub)
            .fetch_crypto(
                "BTCUSD",
                "2023-01-03",
                "2023-01-09",
                Interval::Daily,
                &CacheOptions::disabled(),
            )
            .unwrap();

        assert_eq!(series.symbol, "BTCUSD");
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars()[1].close, 16852.9);

        let req = &stub.requests()[0];
        assert_eq!(req.query_value("tickers"), Some("btcusd"));
        assert_eq!(req.query_value("resampleFreq"), Some("1day"));
        assert_eq!(
            req.headers.get("authorization").map(String::as_str),
            Some("Token secret")
        );
    }

    #[test]
    fn crypto_weekly_is_aggregated_locally() {
        let stub = Arc::new(
            StubTransport::new().route("/tiingo/crypto/prices", HttpResponse::ok(CRYPTO)),
        );
        let series = client(&stub)
            .fetch_crypto(
                "BTCUSD",
                "2023-01-03",
                "2023-01-09",
                Interval::Weekly,
                &CacheOptions::disabled(),
            )
            .unwrap();

        assert_eq!(series.interval, Interval::Weekly);
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].high, 16991.7);
        assert_eq!(series.bars()[0].close, 16852.9);
        assert_eq!(stub.requests()[0].query_value("resampleFreq"), Some("1day"));
    }

    #[test]
    fn crypto_and_equity_cache_separately() {
        let dir = tempfile::tempdir().unwrap();
        let options = CacheOptions::enabled(dir.path());
        let stub = Arc::new(
            StubTransport::new()
                .route("/tiingo/crypto/prices", HttpResponse::ok(CRYPTO))
                .route("/tiingo/daily/BTCUSD", HttpResponse::ok(DAILY)),
        );
        let c = client(&stub);

        let crypto = c
            .fetch_crypto("BTCUSD", "2023-01-03", "2023-01-09", Interval::Daily, &options)
            .unwrap();
        let equity = c
            .fetch_single("BTCUSD", "2023-01-03", "2023-01-09", Interval::Daily, &options)
            .unwrap();

        assert_eq!(stub.request_count(), 2);
        assert_ne!(crypto, equity);
    }

    #[test]
    fn missing_key_fails_before_network() {
        let stub = Arc::new(StubTransport::new());
        let client = TiingoClient::new(stub.clone(), None);
        let err = fetch(&client, "AAPL", "2023-01-03", "2023-01-04", Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::Authentication { .. }));
        assert_eq!(stub.request_count(), 0);
    }

    #[test]
    fn detail_body_is_mapped() {
        let stub = Arc::new(
            StubTransport::new()
                .route(
                    "/BAD",
                    HttpResponse::ok(r#"{"detail":"Error: Ticker 'BAD' not found"}"#),
                )
                .route("/AAPL", HttpResponse::ok(r#"{"detail":"Invalid token."}"#)),
        );
        let c = client(&stub);

        let err = fetch(&c, "BAD", "2023-01-03", "2023-01-04", Interval::Daily).unwrap_err();
        assert!(matches!(err, DataError::ProviderResponse { .. }));

        let err = fetch(&c, "AAPL", "2023-01-03", "2023-01-04", Interval::Daily).unwrap_err();
        assert!(matches!(err, DataError::Authentication { .. }));
    }

    #[test]
    fn empty_array_is_provider_response() {
        let stub = Arc::new(
            StubTransport::new().route("/tiingo/daily/AAPL", HttpResponse::ok("[]")),
        );
        let err = fetch(&client(&stub), "AAPL", "2023-01-03", "2023-01-04", Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::ProviderResponse { .. }));
    }
}
