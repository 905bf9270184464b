//! HTTP client abstraction used for every LNURL round trip.
//!
//! The library only ever issues GET requests; transports for other networks
//! (e.g. a Tor proxy) plug in by implementing [`HttpClient`].

use crate::HttpError;

mod native;

pub use native::BitreqHttpClient;

/// Default request timeout in seconds.
pub const REQUEST_TIMEOUT: u64 = 5;

/// Response from an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Returns true if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client trait for making requests.
///
/// Implementations must be safe to share between concurrent callers.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Makes a GET request.
    async fn get(&self, url: String) -> Result<HttpResponse, HttpError>;
}
