use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ensure_sdk,
    error::{LnurlError, LnurlResult},
};

/// An LNURL-channel request, as per <https://github.com/lnurl/luds/blob/luds/02.md>
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LnurlChannelParams {
    /// Node URI of the service, `pubkey@host:port`
    #[serde(default)]
    pub uri: String,
    pub callback: String,
    pub k1: String,
}

impl LnurlChannelParams {
    pub fn from_json(body: serde_json::Value) -> LnurlResult<Self> {
        let params: Self = serde_json::from_value(body)
            .map_err(|e| LnurlError::validation(format!("invalid channelRequest: {e}")))?;
        ensure_sdk!(
            !params.k1.is_empty(),
            LnurlError::validation("channelRequest k1 is empty")
        );
        Url::parse(&params.callback)
            .map_err(|e| LnurlError::validation(format!("invalid channel callback: {e}")))?;
        Ok(params)
    }
}
