use platform_utils::HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    auth::query_param,
    ensure_sdk,
    error::{LnurlError, LnurlResult},
    invoice::InvoiceDecoder,
    request::get_callback_status,
};

/// Performs the second and last step of LNURL-withdraw,
/// as per <https://github.com/lnurl/luds/blob/luds/03.md>
pub(crate) async fn execute(
    http_client: &dyn HttpClient,
    invoice_decoder: &dyn InvoiceDecoder,
    params: &LnurlWithdrawParams,
    invoice: &str,
) -> LnurlResult<()> {
    let decoded = invoice_decoder
        .decode(invoice)
        .map_err(LnurlError::InvalidInvoice)?;
    if let Some(amount_msat) = decoded.amount_msat {
        ensure_sdk!(
            params.is_amount_valid(amount_msat),
            LnurlError::validation(format!(
                "invoice amount {amount_msat} msat is outside the withdrawable range"
            ))
        );
    }

    let callback_url = params.callback_url(invoice)?;
    get_callback_status(http_client, &callback_url).await
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LnurlWithdrawParams {
    pub callback: String,
    pub k1: String,
    #[serde(default)]
    pub default_description: String,
    /// The minimum amount, in millisats, that this LNURL-withdraw endpoint accepts
    pub min_withdrawable: u64,
    /// The maximum amount, in millisats, that this LNURL-withdraw endpoint accepts
    pub max_withdrawable: u64,
    /// LUD-14 balance check URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_check: Option<String>,
    /// LUD-19 LNURL-pay link offered alongside the withdrawal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_link: Option<String>,
}

impl LnurlWithdrawParams {
    /// Reads a complete withdraw request out of the LNURL query string, so the
    /// first round trip can be skipped.
    ///
    /// Returns `None` when any of `callback`, `k1`, `minWithdrawable` or
    /// `maxWithdrawable` is missing or malformed.
    pub fn from_query(url: &Url) -> Option<Self> {
        let callback = query_param(url, "callback")?;
        if let Err(e) = Url::parse(&callback) {
            debug!("Fast withdraw callback is not a url: {e}");
            return None;
        }
        let k1 = query_param(url, "k1").filter(|k1| !k1.is_empty())?;
        let max_withdrawable = query_param(url, "maxWithdrawable")?.parse().ok()?;
        let min_withdrawable = query_param(url, "minWithdrawable")?.parse().ok()?;

        Some(Self {
            callback,
            k1,
            default_description: query_param(url, "defaultDescription").unwrap_or_default(),
            min_withdrawable,
            max_withdrawable,
            balance_check: query_param(url, "balanceCheck"),
            pay_link: query_param(url, "payLink"),
        })
    }

    pub fn from_json(body: serde_json::Value) -> LnurlResult<Self> {
        let params: Self = serde_json::from_value(body).map_err(|e| {
            warn!("Invalid withdrawRequest: {e}");
            LnurlError::validation(format!("invalid withdrawRequest: {e}"))
        })?;
        Url::parse(&params.callback)
            .map_err(|e| LnurlError::validation(format!("invalid withdraw callback: {e}")))?;
        Ok(params)
    }

    /// `callback?k1=<k1>&pr=<bolt11>`
    pub fn callback_url(&self, invoice: &str) -> LnurlResult<String> {
        let mut url = Url::parse(&self.callback)
            .map_err(|e| LnurlError::validation(format!("invalid withdraw callback: {e}")))?;
        url.query_pairs_mut()
            .append_pair("k1", &self.k1)
            .append_pair("pr", invoice);
        Ok(url.to_string())
    }

    pub fn is_amount_valid(&self, amount_msat: u64) -> bool {
        amount_msat >= self.min_withdrawable && amount_msat <= self.max_withdrawable
    }
}
