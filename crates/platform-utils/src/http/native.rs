//! Native HTTP client using bitreq.

use crate::HttpError;

use super::{HttpClient, HttpResponse};

/// Default connection pool capacity for the HTTP client.
const DEFAULT_POOL_CAPACITY: usize = 10;

/// HTTP client implementation using bitreq.
///
/// This client uses bitreq's connection pool to reuse connections
/// across requests, avoiding repeated TCP handshakes and TLS negotiations.
pub struct BitreqHttpClient {
    client: bitreq::Client,
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl BitreqHttpClient {
    /// Create a new `BitreqHttpClient` with an optional user agent and a request timeout.
    pub fn new(user_agent: Option<String>, timeout_secs: u64) -> Self {
        Self {
            client: bitreq::Client::new(DEFAULT_POOL_CAPACITY),
            user_agent,
            timeout_secs,
        }
    }

    fn add_common_headers(&self, req: bitreq::Request) -> bitreq::Request {
        let mut req = req.with_timeout(self.timeout_secs);
        if let Some(ua) = &self.user_agent {
            req = req.with_header("User-Agent", ua);
        }
        req
    }
}

#[async_trait::async_trait]
impl HttpClient for BitreqHttpClient {
    async fn get(&self, url: String) -> Result<HttpResponse, HttpError> {
        tracing::debug!("Making GET request to: {url}");
        let req = self.add_common_headers(bitreq::get(&url));
        let response = self.client.send_async(req).await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let status = response.status_code as u16;
        let body = response.as_str()?.to_string();
        tracing::debug!("Received response, status: {status}");
        tracing::trace!("raw response body: {body}");

        Ok(HttpResponse { status, body })
    }
}
