use crate::error::FetchError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Raw response handed back by a [`Transport`]; status checks and decoding
/// are left to the caller so every endpoint classifies failures the same way.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Rejects non-2xx statuses, then decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        if !self.is_success() {
            return Err(FetchError::Status(self.status));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Network capability used by the runtime. The production implementation is
/// [`HttpTransport`]; tests script responses per endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, FetchError>;
}

/// `reqwest`-backed transport. Timeouts are applied per call by the runtime,
/// not on the client.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chat-widget/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

async fn collect(resp: reqwest::Response) -> Result<HttpResponse, FetchError> {
    let status = resp.status().as_u16();
    let body = resp
        .bytes()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    Ok(HttpResponse {
        status,
        body: body.to_vec(),
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        collect(resp).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, FetchError> {
        let payload = serde_json::to_vec(body)?;
        let resp = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        collect(resp).await
    }
}

/// Runs `fut` under a deadline. Dropping the future on expiry aborts the
/// in-flight request.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}
