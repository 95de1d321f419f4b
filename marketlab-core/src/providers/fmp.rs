//! Financial Modeling Prep price client.
//!
//! Daily bars come from `historical-price-full` (newest first, wrapped in a
//! `historical` array), requested in five-year windows. Weekly and monthly
//! bars are aggregated locally from daily bars. Intraday bars come from
//! `historical-chart/{interval}`, windowed per interval. Crypto pairs use the
//! `historical-price-full/crypto` path for daily bars and the same chart
//! endpoint for intraday bars.
//!
//! FMP reports some failures with HTTP 200 and an `"Error Message"` body.

use super::{
    decode, download_windows, into_series, parse_timestamp, resample, send, PriceProvider,
    PriceRequest,
};
use crate::config::DataConfig;
use crate::data::{DataError, HttpRequest, HttpTransport};
use crate::domain::{AssetClass, DateRange, Interval, PriceBar, PriceSeries};
use serde::Deserialize;
use std::sync::Arc;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com";

/// Days of daily history requested per call.
const DAILY_WINDOW_DAYS: i64 = 5 * 365;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FmpBody {
    Error {
        #[serde(rename = "Error Message")]
        message: String,
    },
    Daily {
        #[serde(default)]
        historical: Vec<FmpBar>,
    },
    Chart(Vec<FmpBar>),
}

#[derive(Debug, Deserialize)]
struct FmpBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// FMP REST client. The API key travels as the `apikey` query parameter.
pub struct FmpClient {
    transport: Arc<dyn HttpTransport>,
    api_key: Option<String>,
    base_url: String,
}

impl FmpClient {
    pub const NAME: &'static str = "fmp";

    pub fn new(transport: Arc<dyn HttpTransport>, api_key: Option<String>) -> Self {
        Self {
            transport,
            api_key,
            base_url: FMP_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &DataConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(transport, config.fmp.api_key().map(str::to_string))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Days of history requested per call for `interval`.
    pub fn window_days(interval: Interval) -> i64 {
        match interval {
            Interval::Minute1 => 5,
            Interval::Minute5 => 30,
            Interval::Minute15 => 60,
            Interval::Minute30 => 90,
            Interval::Hour1 => 180,
            Interval::Hour4 => 365,
            Interval::Daily | Interval::Weekly | Interval::Monthly => DAILY_WINDOW_DAYS,
        }
    }

    fn api_key(&self) -> Result<&str, DataError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DataError::auth(Self::NAME, "no API key configured (FMP_API_KEY)"))
    }

    fn endpoint(&self, symbol: &str, interval: Interval, asset: AssetClass) -> String {
        if interval.is_intraday() {
            return format!(
                "{}/api/v3/historical-chart/{}/{symbol}",
                self.base_url,
                interval.as_code()
            );
        }
        match asset {
            AssetClass::Equity => {
                format!("{}/api/v3/historical-price-full/{symbol}", self.base_url)
            }
            AssetClass::Crypto => format!(
                "{}/api/v3/historical-price-full/crypto/{symbol}",
                self.base_url
            ),
        }
    }

    fn fetch_window(
        &self,
        api_key: &str,
        request: &PriceRequest,
        interval: Interval,
        window: DateRange,
    ) -> Result<Vec<PriceBar>, DataError> {
        let symbol = request.symbol.as_str();
        let http = HttpRequest::get(self.endpoint(symbol, interval, request.asset))
            .with_query("from", window.start().to_string())
            .with_query("to", window.end().to_string())
            .with_query("apikey", api_key);

        let response = send(self.transport.as_ref(), Self::NAME, &http)?;
        let rows = match decode::<FmpBody>(Self::NAME, &response.body)? {
            FmpBody::Error { message } => return Err(body_error(message)),
            FmpBody::Daily { historical } => historical,
            FmpBody::Chart(rows) => rows,
        };
        rows.into_iter().map(|row| to_bar(symbol, row)).collect()
    }

    fn bars(
        &self,
        api_key: &str,
        request: &PriceRequest,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, DataError> {
        download_windows(request.range, Self::window_days(interval), |window| {
            self.fetch_window(api_key, request, interval, window)
        })
    }
}

fn to_bar(symbol: &str, row: FmpBar) -> Result<PriceBar, DataError> {
    let timestamp = parse_timestamp(&row.date)
        .ok_or_else(|| DataError::response(FmpClient::NAME, format!("bad date '{}'", row.date)))?;
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

fn body_error(message: String) -> DataError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("api key") || lower.contains("apikey") {
        DataError::auth(FmpClient::NAME, message)
    } else if lower.contains("limit") {
        DataError::RateLimit {
            provider: FmpClient::NAME.to_string(),
            retry_after_secs: None,
        }
    } else {
        DataError::response(FmpClient::NAME, message)
    }
}

impl PriceProvider for FmpClient {
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

        let bars = match request.interval {
            Interval::Weekly | Interval::Monthly => {
                let daily = self.bars(api_key, request, Interval::Daily)?;
                let daily = PriceSeries::from_bars(request.symbol.as_str(), Interval::Daily, daily);
                resample(daily.bars(), request.interval)
            }
            interval => self.bars(api_key, request, interval)?,
        };
        into_series(Self::NAME, request, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheOptions;
    use crate::data::{HttpResponse, StubTransport};
    use chrono::NaiveDate;

    const DAILY: &str = r#"{"symbol":"AAPL","historical":[
        {"date":"2023-01-10","open":130.26,"high":131.26,"low":128.12,"close":130.73,"volume":63896155},
        {"date":"2023-01-09","open":130.47,"high":133.41,"low":129.89,"close":130.15,"volume":70790813},
        {"date":"2023-01-06","open":126.01,"high":130.29,"low":124.89,"close":129.62,"volume":87754715},
        {"date":"2023-01-05","open":127.13,"high":127.77,"low":124.76,"close":125.02,"volume":80962708},
        {"date":"2023-01-04","open":126.89,"high":128.66,"low":125.08,"close":126.36,"volume":89113633},
        {"date":"2023-01-03","open":130.28,"high":130.9,"low":124.17,"close":125.07,"volume":112117471}
    ]}"#;

    const CHART: &str = r#"[
        {"date":"2023-01-03 15:55:00","open":125.1,"low":124.9,"high":125.3,"close":125.07,"volume":1200},
        {"date":"2023-01-03 15:50:00","open":125.4,"low":125.0,"high":125.5,"close":125.1,"volume":900}
    ]"#;

    fn client(stub: &Arc<StubTransport>) -> FmpClient {
        FmpClient::new(stub.clone(), Some("k3y".into()))
    }

    fn fetch(
        client: &FmpClient,
        symbol: &str,
        start: &str,
        end: &str,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        client.fetch_single(symbol, start, end, interval, &CacheOptions::disabled())
    }

    fn day(d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_is_sorted_ascending_and_keyed_by_query() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-price-full/AAPL", HttpResponse::ok(DAILY)),
        );
        let series = fetch(&client(&stub), "AAPL", "2023-01-03", "2023-01-10", Interval::Daily)
            .unwrap();

        assert_eq!(series.len(), 6);
        assert_eq!(series.first_timestamp(), Some(day(3)));
        assert_eq!(series.last_timestamp(), Some(day(10)));

        let req = &stub.requests()[0];
        assert_eq!(req.query_value("apikey"), Some("k3y"));
        assert_eq!(req.query_value("from"), Some("2023-01-03"));
        assert_eq!(req.query_value("to"), Some("2023-01-10"));
        assert!(!req.redacted_url().contains("k3y"));
    }

    #[test]
    fn long_daily_ranges_use_five_year_windows() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-price-full/AAPL", HttpResponse::ok(DAILY)),
        );
        fetch(&client(&stub), "AAPL", "2010-01-01", "2020-12-31", Interval::Daily).unwrap();
        assert_eq!(stub.request_count(), 3);
    }

    #[test]
    fn weekly_is_aggregated_from_daily() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-price-full/AAPL", HttpResponse::ok(DAILY)),
        );
        let series = fetch(&client(&stub), "AAPL", "2023-01-03", "2023-01-10", Interval::Weekly)
            .unwrap();

        assert_eq!(series.interval, Interval::Weekly);
        assert_eq!(series.len(), 2);
        let week = &series.bars()[0];
        assert_eq!(week.timestamp, day(3));
        assert_eq!(week.open, 130.28);
        assert_eq!(week.high, 130.9);
        assert_eq!(week.low, 124.17);
        assert_eq!(week.close, 129.62);
        assert_eq!(week.volume, 112117471.0 + 89113633.0 + 80962708.0 + 87754715.0);
        assert_eq!(series.bars()[1].timestamp, day(9));
    }

    #[test]
    fn monthly_collapses_a_single_month() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-price-full/AAPL", HttpResponse::ok(DAILY)),
        );
        let series = fetch(&client(&stub), "AAPL", "2023-01-01", "2023-01-31", Interval::Monthly)
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, 130.73);
        assert_eq!(series.bars()[0].high, 133.41);
    }

    #[test]
    fn intraday_uses_chart_endpoint() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-chart/5min/AAPL", HttpResponse::ok(CHART)),
        );
        let series = fetch(&client(&stub), "AAPL", "2023-01-03", "2023-01-03", Interval::Minute5)
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(
            series.first_timestamp(),
            day(3).date().and_hms_opt(15, 50, 0)
        );
        assert_eq!(stub.request_count(), 1);
    }

    #[test]
    fn error_message_bodies_are_classified() {
        let stub = Arc::new(
            StubTransport::new()
                .route(
                    "/KEY",
                    HttpResponse::ok(r#"{"Error Message":"Invalid API KEY. Please retry."}"#),
                )
                .route(
                    "/LIM",
                    HttpResponse::ok(r#"{"Error Message":"Limit Reach . Please upgrade"}"#),
                ),
        );
        let c = client(&stub);

        let err = fetch(&c, "KEY", "2023-01-03", "2023-01-04", Interval::Daily).unwrap_err();
        assert!(matches!(err, DataError::Authentication { .. }));

        let err = fetch(&c, "LIM", "2023-01-03", "2023-01-04", Interval::Daily).unwrap_err();
        assert!(matches!(err, DataError::RateLimit { .. }));
    }

    #[test]
    fn empty_object_means_no_data() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-price-full", HttpResponse::ok("{}")),
        );
        let err = fetch(&client(&stub), "ZZZZ", "2023-01-03", "2023-01-04", Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, DataError::ProviderResponse { .. }));
    }

    #[test]
    fn crypto_daily_uses_crypto_path() {
        let stub = Arc::new(StubTransport::new().route(
            "/historical-price-full/crypto/BTCUSD",
            HttpResponse::ok(
                r#"{"symbol":"BTCUSD","historical":[
                    {"date":"2023-01-04","open":16680.2,"high":16990.1,"low":16652.4,"close":16863.2,"volume":18421743322},
                    {"date":"2023-01-03","open":16688.5,"high":16760.4,"low":16622.4,"close":16679.9,"volume":13903079207}
                ]}"#,
            ),
        ));
        let series = client(&stub)
            .fetch_crypto(
                "btcusd",
                "2023-01-03",
                "2023-01-04",
                Interval::Daily,
                &CacheOptions::disabled(),
            )
            .unwrap();

        assert_eq!(series.symbol, "BTCUSD");
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 16679.9);
        assert_eq!(stub.request_count(), 1);
    }

    #[test]
    fn crypto_intraday_shares_the_chart_endpoint() {
        let stub = Arc::new(
            StubTransport::new().route("/historical-chart/5min/ETHUSD", HttpResponse::ok(CHART)),
        );
        let series = client(&stub)
            .fetch_crypto(
                "ETHUSD",
                "2023-01-03",
                "2023-01-03",
                Interval::Minute5,
                &CacheOptions::disabled(),
            )
            .unwrap();
        assert_eq!(series.len(), 2);
        assert!(!stub.requests()[0].url.contains("/crypto/"));
    }

    #[test]
    fn missing_key_fails_before_network() {
        let stub = Arc::new(StubTransport::new());
        let err = fetch(
            &FmpClient::new(stub.clone(), Some("  ".into())),
            "AAPL",
            "2023-01-03",
            "2023-01-04",
            Interval::Daily,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::Authentication { .. }));
        assert_eq!(stub.request_count(), 0);
    }
}
