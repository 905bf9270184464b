use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use platform_utils::{HttpClient, HttpError, HttpResponse};
use tracing::debug;

#[derive(Debug)]
pub struct MockResponse {
    pub(crate) status_code: u16,
    pub(crate) text: String,
}

impl MockResponse {
    pub fn new(status_code: u16, text: impl ToString) -> Self {
        MockResponse {
            status_code,
            text: text.to_string(),
        }
    }
}

/// Answers GET requests from a queue of canned responses and remembers every
/// requested URL.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<MockResponse, HttpError>>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    pub fn add_response(&self, response: MockResponse) -> &Self {
        debug!("Push response: {response:?}");
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
        self
    }

    pub fn add_error(&self, error: HttpError) -> &Self {
        debug!("Push error: {error:?}");
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: String) -> Result<HttpResponse, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);

        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| {
                HttpError::Other(String::from("No response available for GET request"))
            })??;
        debug!("Pop GET response: {response:?}");

        Ok(HttpResponse {
            status: response.status_code,
            body: response.text,
        })
    }
}
