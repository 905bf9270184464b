mod error;
pub mod http;

pub use error::HttpError;
pub use http::{BitreqHttpClient, HttpClient, HttpResponse, REQUEST_TIMEOUT};
