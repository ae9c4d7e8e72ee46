use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::constants::{
    AIRPORT_CODE_MAX_LEN, AIRPORT_CODE_MIN_LEN, RUN_HEADER_PRECIPITATION, RUN_HEADER_TEMPERATURE,
};
use crate::error::PlotError;
use crate::fetch::{fetch_table, DataKind, FetchedTable};
use crate::render::{render, ForecastBundle};
use crate::run::{run_candidates, ForecastRun};
use crate::types::AppState;

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn plot(
    State(state): State<AppState>,
    Path(airport_code): Path<String>,
) -> Result<Response, PlotError> {
    build_plot(&state, &airport_code, Utc::now()).await
}

/// Returns the upper-cased code when it is 3-4 ASCII alphanumerics.
pub fn validate_airport_code(airport_code: &str) -> Result<String, PlotError> {
    let valid = (AIRPORT_CODE_MIN_LEN..=AIRPORT_CODE_MAX_LEN).contains(&airport_code.len())
        && airport_code.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(PlotError::InvalidAirportCode(airport_code.to_string()));
    }
    Ok(airport_code.to_ascii_uppercase())
}

pub(crate) async fn build_plot(
    state: &AppState,
    airport_code: &str,
    now: DateTime<Utc>,
) -> Result<Response, PlotError> {
    let code = validate_airport_code(airport_code)?;
    let candidates = run_candidates(now);
    info!(
        "Plot requested for {code}; runs {} then {}",
        candidates[0], candidates[1]
    );

    let temperature = fetch_table(
        &state.http,
        &state.cfg,
        &code,
        &candidates,
        DataKind::Temperature,
    )
    .await;
    let precipitation = fetch_table(
        &state.http,
        &state.cfg,
        &code,
        &candidates,
        DataKind::Precipitation,
    )
    .await;

    if let (Err(temperature), Err(precipitation)) = (&temperature, &precipitation) {
        for failure in [temperature, precipitation] {
            let tried: Vec<&str> = failure
                .attempts
                .iter()
                .map(|attempt| attempt.url.as_str())
                .collect();
            warn!("No {} data for {code}; tried {}", failure.kind, tried.join(", "));
        }
        if temperature.source_unreachable() && precipitation.source_unreachable() {
            return Err(PlotError::SourceUnreachable);
        }
        return Err(PlotError::DataNotFound(code));
    }

    let tz = state.cfg.timezone;
    let temperature = temperature.ok().and_then(|fetched| usable_bundle(&fetched, tz));
    let precipitation = precipitation
        .ok()
        .and_then(|fetched| usable_bundle(&fetched, tz));
    let runs = (
        temperature.as_ref().map(|bundle| bundle.run),
        precipitation.as_ref().map(|bundle| bundle.run),
    );

    let cfg = state.cfg.clone();
    let render_code = code.clone();
    let chart = tokio::task::spawn_blocking(move || {
        render(&render_code, temperature.as_ref(), precipitation.as_ref(), &cfg)
    })
    .await
    .map_err(|error| PlotError::Internal(format!("Render task failed: {error}")))??;

    info!("Serving chart for {code}; panels {:?}", chart.panels);
    Ok((plot_headers(runs), chart.png).into_response())
}

fn usable_bundle(fetched: &FetchedTable, tz: Tz) -> Option<ForecastBundle> {
    match ForecastBundle::from_fetched(fetched, tz) {
        Ok(bundle) => Some(bundle),
        Err(error) => {
            warn!("Dropping {} table from {}: {error}", fetched.kind, fetched.url);
            None
        }
    }
}

fn plot_headers(runs: (Option<ForecastRun>, Option<ForecastRun>)) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    for (name, run) in [(RUN_HEADER_TEMPERATURE, runs.0), (RUN_HEADER_PRECIPITATION, runs.1)] {
        if let Some(run) = run {
            if let Ok(value) = HeaderValue::from_str(&run.stamp()) {
                headers.insert(name, value);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use chrono::TimeZone;

    use super::*;
    use crate::config::Config;
    use crate::test_support::{
        closed_base_url, test_client, Upstream, PRECIPITATION_CSV, TEMPERATURE_CSV,
    };

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 4, 13, 20, 0).single().unwrap()
    }

    fn state_for(base_url: String) -> AppState {
        AppState {
            cfg: Arc::new(Config {
                base_url,
                plot_width: 600,
                plot_height: 900,
                ..Config::default()
            }),
            http: test_client(Duration::from_secs(5)),
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn header_value<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn airport_code_validation() {
        assert_eq!(validate_airport_code("kbos").unwrap(), "KBOS");
        assert_eq!(validate_airport_code("BOS").unwrap(), "BOS");
        assert_eq!(validate_airport_code("K1B1").unwrap(), "K1B1");
        assert!(matches!(
            validate_airport_code("bo"),
            Err(PlotError::InvalidAirportCode(_))
        ));
        assert!(validate_airport_code("bos!").is_err());
        assert!(validate_airport_code("kboss").is_err());
        assert!(validate_airport_code("").is_err());
    }

    #[tokio::test]
    async fn invalid_code_is_rejected_before_any_fetch() {
        let upstream = Upstream::default();
        let state = state_for(upstream.spawn().await);

        let response = plot(State(state), Path("bos!".to_string())).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(upstream.hits().is_empty());
    }

    #[tokio::test]
    async fn both_kinds_render_with_run_headers() {
        let upstream = Upstream::with_files(&[
            ("GEFSKBOS20250704122mt.csv", TEMPERATURE_CSV),
            ("GEFSKBOS2025070406qpf3h.csv", PRECIPITATION_CSV),
        ]);
        let state = state_for(upstream.spawn().await);

        let response = build_plot(&state, "kbos", now()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, "content-type"), Some("image/png"));
        assert_eq!(header_value(&response, "content-disposition"), Some("inline"));
        assert_eq!(header_value(&response, "cache-control"), Some("no-store"));
        assert_eq!(
            header_value(&response, "x-gefs-temperature-run"),
            Some("2025070412")
        );
        assert_eq!(
            header_value(&response, "x-gefs-precipitation-run"),
            Some("2025070406")
        );
        assert!(body_bytes(response).await.starts_with(&PNG_SIGNATURE));
    }

    #[tokio::test]
    async fn precipitation_only_still_renders() {
        let upstream = Upstream::with_files(&[("GEFSKBOS2025070412qpf3h.csv", PRECIPITATION_CSV)]);
        let state = state_for(upstream.spawn().await);

        let response = build_plot(&state, "kbos", now()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(header_value(&response, "x-gefs-temperature-run").is_none());
        assert_eq!(
            header_value(&response, "x-gefs-precipitation-run"),
            Some("2025070412")
        );
        assert!(body_bytes(response).await.starts_with(&PNG_SIGNATURE));
    }

    #[tokio::test]
    async fn missing_data_is_not_found() {
        let upstream = Upstream::default();
        let state = state_for(upstream.spawn().await);

        let response = plot(State(state), Path("kbos".to_string())).await.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(upstream.hits().len(), 4);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("KBOS"));
    }

    #[tokio::test]
    async fn unreachable_source_is_bad_gateway() {
        let state = state_for(closed_base_url().await);

        let result = build_plot(&state, "kbos", now()).await;

        assert!(matches!(result, Err(PlotError::SourceUnreachable)));
        assert_eq!(result.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unusable_tables_are_a_render_failure() {
        let upstream = Upstream::with_files(&[
            ("GEFSKBOS20250704122mt.csv", "run,fhour,date\nGEFS,0,07-04-2025:12\n"),
            ("GEFSKBOS2025070412qpf3h.csv", "run,fhour,m01,date\nGEFS,0,0.1,junk\n"),
        ]);
        let state = state_for(upstream.spawn().await);

        let response = build_plot(&state, "kbos", now()).await.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
