use platform_utils::{HttpClient, HttpError};
use tracing::{debug, trace};

use crate::{
    error::{LnurlError, LnurlResult},
    models::{LnurlCallbackStatus, error_envelope},
};

/// GETs `url` and reads the body as JSON.
///
/// An `ERROR` envelope becomes [`LnurlError::Service`] whatever the status code,
/// any other non-2xx response is a transport failure.
pub(crate) async fn get_json(
    http_client: &dyn HttpClient,
    url: &str,
) -> LnurlResult<serde_json::Value> {
    debug!("Requesting lnurl endpoint {url}");
    let response = http_client
        .get(url.to_string())
        .await
        .map_err(|e| LnurlError::transport(url, e))?;
    trace!(
        "Lnurl endpoint responded with status {}: {}",
        response.status, response.body
    );

    let body = serde_json::from_str::<serde_json::Value>(&response.body);
    if let Ok(body) = &body
        && let Some(details) = error_envelope(body)
    {
        debug!("Lnurl endpoint returned an error: {}", details.reason);
        return Err(LnurlError::Service {
            reason: details.reason,
            url: url.to_string(),
        });
    }

    if !response.is_success() {
        return Err(LnurlError::transport(
            url,
            HttpError::Status {
                status: response.status,
                body: response.body,
            },
        ));
    }

    body.map_err(|e| LnurlError::transport(url, e))
}

/// GETs a callback that answers with a bare `{"status": "OK"}` envelope.
pub(crate) async fn get_callback_status(
    http_client: &dyn HttpClient,
    url: &str,
) -> LnurlResult<()> {
    let body = get_json(http_client, url).await?;
    match serde_json::from_value::<LnurlCallbackStatus>(body)
        .map_err(|e| LnurlError::transport(url, e))?
    {
        LnurlCallbackStatus::Ok => Ok(()),
        LnurlCallbackStatus::ErrorStatus { error_details } => Err(LnurlError::Service {
            reason: error_details.reason,
            url: url.to_string(),
        }),
    }
}
