//! Native client for the Cat vs Dog Classifier API.
//!
//! Framework-agnostic: any binary that wants to talk to the prediction
//! service (CLI tools, bots, integration harnesses) goes through
//! [`ClassifierApiClient`] instead of hand-rolling requests.

use std::env;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{BatchResponse, ErrorBody, HealthResponse, ModelInfoResponse, PredictResponse};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

/// Outcome of a health probe. Connection failures are part of the answer
/// here, not an error: callers poll this to decide whether the API is up.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HealthResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ClassifierApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ClassifierApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Build a client from `API_BASE_URL` and `API_TIMEOUT` (seconds),
    /// falling back to `http://localhost:8000` and 30s.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = env::var("API_TIMEOUT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(&base_url, Duration::from_secs(timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status().as_u16();
        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(e) => format!("unparseable error body: {e}"),
        };
        Err(ClientError::Api { status, detail })
    }

    pub async fn health_check(&self) -> HealthReport {
        match self.http.get(self.endpoint("/health")).send().await {
            Ok(response) => match Self::parse::<HealthResponse>(response).await {
                Ok(data) => HealthReport {
                    available: true,
                    data: Some(data),
                    error: None,
                },
                Err(e) => HealthReport {
                    available: false,
                    data: None,
                    error: Some(e.to_string()),
                },
            },
            Err(e) if e.is_timeout() => HealthReport {
                available: false,
                data: None,
                error: Some("API server timeout".to_string()),
            },
            Err(e) if e.is_connect() => HealthReport {
                available: false,
                data: None,
                error: Some("Cannot connect to API server".to_string()),
            },
            Err(e) => HealthReport {
                available: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn model_info(&self) -> Result<ModelInfoResponse, ClientError> {
        let response = self.http.get(self.endpoint("/model/info")).send().await?;
        Self::parse(response).await
    }

    pub async fn predict_bytes(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictResponse, ClientError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint("/predict"))
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn predict_file(&self, path: &Path) -> Result<PredictResponse, ClientError> {
        let bytes = read_file(path).await?;
        self.predict_bytes(&display_name(path), bytes).await
    }

    /// Upload up to 10 files as one batch request. Per-file failures come
    /// back inside [`BatchResponse::results`], not as a client error.
    pub async fn predict_batch(&self, paths: &[&Path]) -> Result<BatchResponse, ClientError> {
        let mut form = Form::new();
        for path in paths {
            let bytes = read_file(path).await?;
            let part = Part::bytes(bytes).file_name(display_name(path));
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(self.endpoint("/predict/batch"))
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ClientError> {
    tokio::fs::read(path).await.map_err(|source| ClientError::File {
        path: path.display().to_string(),
        source,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client =
            ClassifierApiClient::new("http://example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://example.com");
        assert_eq!(client.endpoint("/predict"), "http://example.com/predict");
    }

    #[test]
    fn default_configuration_matches_contract() {
        assert_eq!(DEFAULT_BASE_URL, "http://localhost:8000");
        assert_eq!(DEFAULT_TIMEOUT_SECS, 30);
    }

    #[test]
    fn display_name_uses_final_component() {
        assert_eq!(display_name(Path::new("/tmp/photos/cat.jpg")), "cat.jpg");
    }
}
