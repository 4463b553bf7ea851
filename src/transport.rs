use std::future::Future;

use tracing::trace;

use crate::Result;

/// Issues a GET and hands back the raw body.
///
/// Failures are categorized as [`Error::Status`](crate::Error::Status),
/// [`Error::NoResponse`](crate::Error::NoResponse) or
/// [`Error::Request`](crate::Error::Request).
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        trace!(status = resp.status().as_u16(), "GET ok");
        Ok(resp.text().await?)
    }
}
