use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LnurlError, LnurlResult};

/// An LNURL-allowance offer. Only the offer is decoded here, the websocket
/// session on `socket` is left to the caller.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LnurlAllowanceParams {
    #[serde(default)]
    pub k1: String,
    /// `wss://` endpoint of the allowance session
    pub socket: String,
    /// Base64 encoded image, may be empty
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommended_allowance_amount: u64,
}

impl LnurlAllowanceParams {
    pub fn from_json(body: serde_json::Value) -> LnurlResult<Self> {
        let params: Self = serde_json::from_value(body)
            .map_err(|e| LnurlError::validation(format!("invalid allowanceRequest: {e}")))?;
        let socket = Url::parse(&params.socket)
            .map_err(|e| LnurlError::validation(format!("invalid allowance socket: {e}")))?;
        if socket.scheme() != "wss" {
            return Err(LnurlError::validation(format!(
                "allowance socket must use wss, got {}",
                socket.scheme()
            )));
        }
        Ok(params)
    }

    pub fn image_bytes(&self) -> LnurlResult<Vec<u8>> {
        Ok(BASE64_STANDARD.decode(&self.image)?)
    }
}
