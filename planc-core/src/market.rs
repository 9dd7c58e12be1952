//! Market data
//!
//! Daily closes from a Yahoo Finance style chart endpoint. VIX is the last
//! close over five days, and index changes come from six months of closes fed
//! into [`index_change`]. A failed fetch is logged and treated as unknown, so
//! the matching condition is simply not met.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::plan::{index_change, Market};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const VIX_SYMBOL: &str = "^VIX";

const VIX_RANGE: &str = "5d";
const INDEX_RANGE: &str = "6mo";
const USER_AGENT: &str = concat!("planc/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

/// Closes in a chart response, oldest first. Days without a close are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<f64>, MarketError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|source| MarketError::Decode {
            symbol: symbol.to_string(),
            source,
        })?;

    if let Some(error) = response.chart.error {
        return Err(MarketError::Api {
            symbol: symbol.to_string(),
            code: error.code,
            description: error.description,
        });
    }

    let closes: Vec<f64> = response
        .chart
        .result
        .into_iter()
        .flatten()
        .next()
        .and_then(|result| result.indicators.quote.into_iter().next())
        .map(|quote| quote.close.into_iter().flatten().collect())
        .unwrap_or_default();

    if closes.is_empty() {
        return Err(MarketError::NoData {
            symbol: symbol.to_string(),
        });
    }
    Ok(closes)
}

/// Which values to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub vix: bool,
    pub japan: bool,
    pub united_states: bool,
}

impl SnapshotRequest {
    pub fn is_empty(&self) -> bool {
        !(self.vix || self.japan || self.united_states)
    }
}

/// Fetched values, `None` where not requested or unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub vix: Option<f64>,
    pub japan_change: Option<f64>,
    pub united_states_change: Option<f64>,
}

pub struct MarketClient {
    http: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(config: &MarketConfig) -> Result<Self, MarketError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(MarketError::Client)?;
        Ok(Self::with_client(http, &config.base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Daily closes of `symbol` over `range` (e.g. `5d`, `6mo`).
    pub async fn daily_closes(&self, symbol: &str, range: &str) -> Result<Vec<f64>, MarketError> {
        let url = format!("{}/{}", self.base_url, symbol.replace('^', "%5E"));
        debug!("GET {} range={}", url, range);

        let http_err = |source| MarketError::Http {
            symbol: symbol.to_string(),
            source,
        };
        let resp = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await.map_err(http_err)?;
        parse_chart(symbol, &body)
    }

    /// Latest VIX close.
    pub async fn vix(&self) -> Result<f64, MarketError> {
        let closes = self.daily_closes(VIX_SYMBOL, VIX_RANGE).await?;
        closes.last().copied().ok_or_else(|| MarketError::NoData {
            symbol: VIX_SYMBOL.to_string(),
        })
    }

    /// 3-month change of the market index, `None` when the history is too short.
    pub async fn index_change(&self, market: Market) -> Result<Option<f64>, MarketError> {
        let symbol = market.index_symbol();
        let closes = self.daily_closes(symbol, INDEX_RANGE).await?;
        let change = index_change(&closes);
        if change.is_none() {
            warn!("{}: only {} closes, 3-month change unknown", symbol, closes.len());
        }
        Ok(change)
    }

    /// Fetch the requested values concurrently. Failures are logged and left as `None`.
    pub async fn snapshot(&self, request: SnapshotRequest) -> Snapshot {
        let vix = async {
            if request.vix {
                self.vix().await.map(Some)
            } else {
                Ok(None)
            }
        };
        let change = |wanted: bool, market: Market| async move {
            if wanted {
                self.index_change(market).await
            } else {
                Ok(None)
            }
        };

        let (vix, japan, united_states) = tokio::join!(
            vix,
            change(request.japan, Market::Japan),
            change(request.united_states, Market::UnitedStates)
        );

        let snapshot = Snapshot {
            vix: settle("VIX", vix),
            japan_change: settle(Market::Japan.index_name(), japan),
            united_states_change: settle(Market::UnitedStates.index_name(), united_states),
        };
        info!("Fetched market data: {:?}", snapshot);
        snapshot
    }
}

fn settle(label: &str, result: Result<Option<f64>, MarketError>) -> Option<f64> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not fetch {}: {}", label, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const N225: &str = include_str!("../tests/fixtures/chart_n225_6mo.json");
    const GSPC: &str = include_str!("../tests/fixtures/chart_gspc_6mo.json");
    const VIX: &str = include_str!("../tests/fixtures/chart_vix_5d.json");
    const NOT_FOUND: &str = include_str!("../tests/fixtures/chart_not_found.json");

    /// Serve canned responses, picking the first route whose key appears in
    /// the request line. Returns the base URL.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let line = request.lines().next().unwrap_or_default();
                    let (status, body) = routes
                        .iter()
                        .find(|(key, _, _)| line.contains(key))
                        .map(|&(_, status, body)| (status, body))
                        .unwrap_or((404, ""));
                    let resp = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(resp.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}/v8/finance/chart")
    }

    fn client(base_url: &str) -> MarketClient {
        let http = Client::builder().no_proxy().build().unwrap();
        MarketClient::with_client(http, base_url)
    }

    #[test]
    fn test_parse_chart_skips_missing_closes() {
        let closes = parse_chart(VIX_SYMBOL, VIX).unwrap();
        assert_eq!(closes, vec![28.11, 29.87, 31.02, 32.45]);
    }

    #[test]
    fn test_parse_chart_feeds_index_change() {
        let closes = parse_chart("^N225", N225).unwrap();
        assert_eq!(closes.len(), 63);
        let change = index_change(&closes).unwrap();
        assert!((change - -25.0).abs() < 1e-9, "Got: {}", change);

        let closes = parse_chart("^GSPC", GSPC).unwrap();
        let change = index_change(&closes).unwrap();
        assert!((change - 5.0).abs() < 1e-9, "Got: {}", change);
    }

    #[test]
    fn test_parse_chart_api_error() {
        let err = parse_chart("^XXX", NOT_FOUND).unwrap_err();
        assert!(matches!(err, MarketError::Api { ref code, .. } if code == "Not Found"));
        assert!(err.to_string().contains("^XXX"));
    }

    #[test]
    fn test_parse_chart_empty_and_garbage() {
        let empty = r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[null]}]}}]}}"#;
        assert!(matches!(
            parse_chart("^VIX", empty),
            Err(MarketError::NoData { .. })
        ));
        assert!(matches!(
            parse_chart("^VIX", "<html>"),
            Err(MarketError::Decode { .. })
        ));
    }

    #[test]
    fn test_snapshot_request_is_empty() {
        assert!(SnapshotRequest::default().is_empty());
        let request = SnapshotRequest {
            japan: true,
            ..Default::default()
        };
        assert!(!request.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_fetches_all_values() {
        let base = serve(vec![("VIX", 200, VIX), ("N225", 200, N225), ("GSPC", 200, GSPC)]).await;
        let snapshot = client(&base)
            .snapshot(SnapshotRequest {
                vix: true,
                japan: true,
                united_states: true,
            })
            .await;

        assert_eq!(snapshot.vix, Some(32.45));
        assert!((snapshot.japan_change.unwrap() - -25.0).abs() < 1e-9);
        assert!((snapshot.united_states_change.unwrap() - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_snapshot_only_fetches_requested() {
        // Only the VIX route exists; index requests would 404
        let base = serve(vec![("VIX", 200, VIX)]).await;
        let snapshot = client(&base)
            .snapshot(SnapshotRequest {
                vix: true,
                ..Default::default()
            })
            .await;
        assert_eq!(
            snapshot,
            Snapshot {
                vix: Some(32.45),
                japan_change: None,
                united_states_change: None,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_none() {
        let base = serve(vec![("VIX", 500, ""), ("N225", 200, NOT_FOUND)]).await;
        let c = client(&base);

        assert!(matches!(
            c.vix().await,
            Err(MarketError::Status { status: 500, .. })
        ));

        let snapshot = c
            .snapshot(SnapshotRequest {
                vix: true,
                japan: true,
                united_states: true,
            })
            .await;
        assert_eq!(snapshot, Snapshot::default());
    }
}
