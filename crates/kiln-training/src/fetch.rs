use crate::error::{PrepError, PrepResult};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

/// Retrieves configuration documents by URL.
pub trait ConfigFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> PrepResult<Vec<u8>>;
}

/// Plain `GET`; anything but `200 OK` is a failure.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> PrepResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PrepError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ConfigFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> PrepResult<Vec<u8>> {
        let failed = |reason: String| PrepError::FetchFailed { reference: url.to_string(), reason };

        let mut response = self.client.get(url).send().map_err(|e| failed(e.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(failed(format!("{} response to GET", response.status())));
        }
        let mut body = Vec::new();
        response.read_to_end(&mut body).map_err(|e| failed(e.to_string()))?;
        tracing::debug!(url, bytes = body.len(), "fetched configuration");
        Ok(body)
    }
}

/// Serves documents registered up front; unknown URLs fail like a 404.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(url.to_string(), body.into());
        }
        self
    }
}

impl ConfigFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> PrepResult<Vec<u8>> {
        let documents = self.documents.lock().map_err(|_| PrepError::FetchFailed {
            reference: url.to_string(),
            reason: "fetcher lock poisoned".to_string(),
        })?;
        documents.get(url).cloned().ok_or_else(|| PrepError::FetchFailed {
            reference: url.to_string(),
            reason: "404 Not Found response to GET".to_string(),
        })
    }
}
