use reqwest::{Client, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpFetchError {
    #[error("Request failed ({status}) for {url}")]
    Status { url: String, status: StatusCode },

    #[error("Request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpFetchError {
    /// True when the upstream never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub async fn fetch_text(http: &Client, url: &str) -> Result<String, HttpFetchError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|source| HttpFetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(HttpFetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    response
        .text()
        .await
        .map_err(|source| HttpFetchError::Transport {
            url: url.to_string(),
            source,
        })
}
