//! In-process stand-in for the GEFS plume file server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

#[derive(Clone, Default)]
pub struct Upstream {
    files: Arc<HashMap<String, String>>,
    stalled: Arc<Vec<String>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: Arc::new(
                files
                    .iter()
                    .map(|(name, body)| (name.to_string(), body.to_string()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Requests for these files hang until the client times out.
    pub fn stalling(mut self, names: &[&str]) -> Self {
        self.stalled = Arc::new(names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().map(|hits| hits.clone()).unwrap_or_default()
    }

    /// Serves the files on an ephemeral port and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/{file}", get(serve_file))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }
}

async fn serve_file(State(upstream): State<Upstream>, Path(file): Path<String>) -> Response {
    if let Ok(mut hits) = upstream.hits.lock() {
        hits.push(file.clone());
    }
    if upstream.stalled.contains(&file) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    match upstream.files.get(&file) {
        Some(body) => (StatusCode::OK, body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A base URL nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder().timeout(timeout).build().unwrap()
}

pub const TEMPERATURE_CSV: &str = "\
run,fhour,m01,m02,m03,m04,date
GEFS,0,70.0,71.0,72.0,73.0,07-04-2025:12
GEFS,3,74.0,75.5,76.0,80.0,07-04-2025:15
GEFS,6,78.0,,79.0,81.0,07-04-2025:18
GEFS,9,76.0,77.0,bad,79.0,07-04-2025:21
";

pub const PRECIPITATION_CSV: &str = "\
run,fhour,m01,m02,m03,m04,date
GEFS,0,0.00,0.00,0.00,0.00,07-04-2025:12
GEFS,3,0.005,0.02,0.06,0.00,07-04-2025:15
GEFS,6,0.12,0.35,1.20,0.00,07-04-2025:18
GEFS,9,0.00,0.01,0.05,0.10,07-04-2025:21
";
