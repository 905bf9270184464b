use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    allowance::LnurlAllowanceParams, auth::LnurlAuthParams, channel::LnurlChannelParams,
    pay::LnurlPayParams, withdraw::LnurlWithdrawParams,
};

/// Contains the result of the entire LNURL interaction, as reported by the LNURL endpoint.
///
/// * `Ok` indicates the interaction with the endpoint was valid, and the endpoint
///  - started to pay the invoice asynchronously in the case of LNURL-withdraw,
///  - verified the client signature in the case of LNURL-auth
/// * `Error` indicates a generic issue the LNURL endpoint encountered, including a freetext
///   description of the reason.
///
/// Both cases are described in LUD-03 <https://github.com/lnurl/luds/blob/luds/03.md> & LUD-04: <https://github.com/lnurl/luds/blob/luds/04.md>
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[serde(tag = "status")]
pub enum LnurlCallbackStatus {
    /// On-wire format is: `{"status": "OK"}`
    Ok,
    /// On-wire format is: `{"status": "ERROR", "reason": "error details..."}`
    #[serde(rename = "ERROR")]
    ErrorStatus {
        #[serde(flatten)]
        error_details: LnurlErrorDetails,
    },
}

/// The `reason` of an `ERROR` envelope.
#[derive(Clone, Deserialize, Debug, Serialize, PartialEq, Eq)]
pub struct LnurlErrorDetails {
    #[serde(default)]
    pub reason: String,
}

/// Reads an `ERROR` envelope out of a response body, if that is what it is.
pub(crate) fn error_envelope(body: &serde_json::Value) -> Option<LnurlErrorDetails> {
    if body.get("status").and_then(serde_json::Value::as_str) != Some("ERROR") {
        return None;
    }
    Some(LnurlErrorDetails {
        reason: body
            .get("reason")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// The LNURL subprotocols.
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
pub enum LnurlKind {
    #[strum(serialize = "lnurl-auth")]
    #[serde(rename = "lnurl-auth")]
    Auth,
    #[strum(serialize = "lnurl-channel")]
    #[serde(rename = "lnurl-channel")]
    Channel,
    #[strum(serialize = "lnurl-withdraw")]
    #[serde(rename = "lnurl-withdraw")]
    Withdraw,
    #[strum(serialize = "lnurl-pay")]
    #[serde(rename = "lnurl-pay")]
    Pay,
    #[strum(serialize = "lnurl-allowance")]
    #[serde(rename = "lnurl-allowance")]
    Allowance,
}

/// A resolved LNURL, one variant per subprotocol.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind")]
pub enum LnurlResponse {
    #[serde(rename = "lnurl-auth")]
    Auth(LnurlAuthParams),
    #[serde(rename = "lnurl-channel")]
    Channel(LnurlChannelParams),
    #[serde(rename = "lnurl-withdraw")]
    Withdraw(LnurlWithdrawParams),
    #[serde(rename = "lnurl-pay")]
    Pay(Box<LnurlPayParams>),
    #[serde(rename = "lnurl-allowance")]
    Allowance(LnurlAllowanceParams),
}

impl LnurlResponse {
    pub fn kind(&self) -> LnurlKind {
        match self {
            LnurlResponse::Auth(_) => LnurlKind::Auth,
            LnurlResponse::Channel(_) => LnurlKind::Channel,
            LnurlResponse::Withdraw(_) => LnurlKind::Withdraw,
            LnurlResponse::Pay(_) => LnurlKind::Pay,
            LnurlResponse::Allowance(_) => LnurlKind::Allowance,
        }
    }
}
