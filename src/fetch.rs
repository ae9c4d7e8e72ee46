use std::fmt;

use reqwest::Client;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{PRECIPITATION_FILE_SUFFIX, TEMPERATURE_FILE_SUFFIX};
use crate::http_client::{fetch_text, HttpFetchError};
use crate::run::ForecastRun;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    Temperature,
    Precipitation,
}

impl DataKind {
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Temperature => TEMPERATURE_FILE_SUFFIX,
            Self::Precipitation => PRECIPITATION_FILE_SUFFIX,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Precipitation => "precipitation",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug)]
pub struct FetchedTable {
    pub kind: DataKind,
    pub text: String,
    pub url: String,
    pub run: ForecastRun,
}

#[derive(Debug)]
pub struct FetchAttempt {
    pub url: String,
    pub error: HttpFetchError,
}

/// Every candidate run failed for one data kind.
#[derive(Debug)]
pub struct FetchFailure {
    pub kind: DataKind,
    pub attempts: Vec<FetchAttempt>,
}

impl FetchFailure {
    /// No attempt reached the point of receiving an HTTP response.
    pub fn source_unreachable(&self) -> bool {
        !self.attempts.is_empty()
            && self
                .attempts
                .iter()
                .all(|attempt| attempt.error.is_transport())
    }
}

pub fn source_url(cfg: &Config, airport_code: &str, run: ForecastRun, kind: DataKind) -> String {
    format!(
        "{}/{}{}{}{}.csv",
        cfg.base_url,
        cfg.file_prefix,
        airport_code.to_uppercase(),
        run.stamp(),
        kind.file_suffix()
    )
}

pub async fn fetch_table(
    http: &Client,
    cfg: &Config,
    airport_code: &str,
    candidates: &[ForecastRun],
    kind: DataKind,
) -> Result<FetchedTable, FetchFailure> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for run in candidates.iter().copied() {
        let url = source_url(cfg, airport_code, run, kind);
        info!("Attempting {kind} ({run}) from {url}");
        match fetch_text(http, &url).await {
            Ok(text) => {
                info!("Fetched {kind} from {url}");
                return Ok(FetchedTable {
                    kind,
                    text,
                    url,
                    run,
                });
            }
            Err(error) => {
                warn!("Failed {kind} fetch: {error}");
                attempts.push(FetchAttempt { url, error });
            }
        }
    }

    warn!(
        "No {kind} data for {} after {} attempt(s)",
        airport_code.to_uppercase(),
        attempts.len()
    );
    Err(FetchFailure { kind, attempts })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::run::run_candidates;
    use crate::test_support::{closed_base_url, test_client, Upstream};

    fn candidates() -> [ForecastRun; 2] {
        run_candidates(Utc.with_ymd_and_hms(2025, 6, 29, 14, 0, 0).single().unwrap())
    }

    fn config_for(base_url: String) -> Config {
        Config {
            base_url,
            ..Config::default()
        }
    }

    #[test]
    fn url_uses_upper_case_code_and_run_stamp() {
        let cfg = config_for("https://example.test/plumes".to_string());
        let [primary, _] = candidates();
        assert_eq!(
            source_url(&cfg, "kbos", primary, DataKind::Temperature),
            "https://example.test/plumes/GEFSKBOS20250629122mt.csv"
        );
        assert_eq!(
            source_url(&cfg, "bos", primary, DataKind::Precipitation),
            "https://example.test/plumes/GEFSBOS2025062912qpf3h.csv"
        );
    }

    #[tokio::test]
    async fn primary_success_never_requests_fallback() {
        let upstream = Upstream::with_files(&[("GEFSKBOS20250629122mt.csv", "a,b\n")]);
        let cfg = config_for(upstream.spawn().await);
        let http = test_client(Duration::from_secs(5));

        let fetched = fetch_table(&http, &cfg, "kbos", &candidates(), DataKind::Temperature)
            .await
            .unwrap();

        assert_eq!(fetched.run.stamp(), "2025062912");
        assert_eq!(fetched.text, "a,b\n");
        assert_eq!(upstream.hits(), vec!["GEFSKBOS20250629122mt.csv".to_string()]);
    }

    #[tokio::test]
    async fn missing_primary_falls_back_to_previous_run() {
        let upstream = Upstream::with_files(&[("GEFSKBOS2025062906qpf3h.csv", "x\n")]);
        let cfg = config_for(upstream.spawn().await);
        let http = test_client(Duration::from_secs(5));

        let fetched = fetch_table(&http, &cfg, "KBOS", &candidates(), DataKind::Precipitation)
            .await
            .unwrap();

        assert_eq!(fetched.run.stamp(), "2025062906");
        assert!(fetched.url.ends_with("/GEFSKBOS2025062906qpf3h.csv"));
        assert_eq!(upstream.hits().len(), 2);
    }

    #[tokio::test]
    async fn timed_out_primary_falls_back_to_previous_run() {
        let upstream = Upstream::with_files(&[
            ("GEFSKBOS20250629122mt.csv", "primary\n"),
            ("GEFSKBOS20250629062mt.csv", "fallback\n"),
        ])
        .stalling(&["GEFSKBOS20250629122mt.csv"]);
        let cfg = config_for(upstream.spawn().await);
        let http = test_client(Duration::from_millis(300));

        let fetched = fetch_table(&http, &cfg, "kbos", &candidates(), DataKind::Temperature)
            .await
            .unwrap();

        assert_eq!(fetched.text, "fallback\n");
        assert_eq!(fetched.run, candidates()[1]);
        assert!(fetched.url.contains("2025062906"));
    }

    #[tokio::test]
    async fn all_candidates_missing_reports_each_attempt() {
        let upstream = Upstream::default();
        let cfg = config_for(upstream.spawn().await);
        let http = test_client(Duration::from_secs(5));

        let failure = fetch_table(&http, &cfg, "kbos", &candidates(), DataKind::Temperature)
            .await
            .unwrap_err();

        assert_eq!(failure.kind, DataKind::Temperature);
        assert_eq!(failure.attempts.len(), 2);
        assert!(!failure.source_unreachable());
    }

    #[tokio::test]
    async fn refused_connections_mark_source_unreachable() {
        let cfg = config_for(closed_base_url().await);
        let http = test_client(Duration::from_secs(5));

        let failure = fetch_table(&http, &cfg, "kbos", &candidates(), DataKind::Precipitation)
            .await
            .unwrap_err();

        assert_eq!(failure.attempts.len(), 2);
        assert!(failure.source_unreachable());
    }
}
