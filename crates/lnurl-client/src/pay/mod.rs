mod metadata;
mod payer_data;
mod success_action;

use platform_utils::HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    ensure_sdk,
    error::{LnurlError, LnurlResult},
    invoice::{DecodedInvoice, InvoiceDecoder},
    request::get_json,
    utils::now,
};

pub use metadata::{Metadata, MetadataBuilder, MetadataEntry, MetadataIdentifier, MetadataImage};
pub use payer_data::{
    KeyAuth, PayerDataItemSpec, PayerDataKeyAuthSpec, PayerDataSpec, PayerDataValues,
};
pub use success_action::{
    Aes256CbcDec, Aes256CbcEnc, AesSuccessActionData, MessageSuccessActionData, SuccessAction,
    UrlSuccessActionData,
};

/// Performs the second and last step of LNURL-pay, as per
/// <https://github.com/lnurl/luds/blob/luds/06.md>
///
/// Payer data is only sent when the service declared a spec for it. The
/// amount and comment are sent as given; callers wanting to enforce the
/// advertised bounds use [`LnurlPayParams::validate_user_input`] first. The
/// returned invoice is checked against the metadata commitment and the
/// requested amount.
pub(crate) async fn call(
    http_client: &dyn HttpClient,
    invoice_decoder: &dyn InvoiceDecoder,
    params: &LnurlPayParams,
    amount_msat: u64,
    comment: Option<&str>,
    payer_data: Option<&PayerDataValues>,
    validate_success_action_url: bool,
) -> LnurlResult<LnurlPayResult> {
    params.payer_data.check(payer_data)?;

    let payer_data_json = match payer_data {
        Some(values) if params.payer_data.exists() => Some(values.to_json()?),
        _ => None,
    };
    let callback_url =
        params.build_callback_url(amount_msat, comment, payer_data_json.as_deref())?;

    let body = get_json(http_client, &callback_url).await?;
    let response: CallbackResponse = serde_json::from_value(body).map_err(|e| {
        warn!("Invalid pay callback response: {e}");
        LnurlError::validation(format!(
            "invalid pay callback response from '{callback_url}': {e}"
        ))
    })?;

    let invoice = invoice_decoder.decode(&response.pr).map_err(|e| {
        LnurlError::InvalidInvoice(format!("error parsing invoice '{}': {e}", response.pr))
    })?;

    let expected = match &payer_data_json {
        Some(json) => params.metadata.hash_with_payer_data(json),
        None => params.metadata.hash(),
    };
    let actual = invoice.description_hash.clone().unwrap_or_default();
    ensure_sdk!(
        actual.eq_ignore_ascii_case(&expected),
        LnurlError::CommitmentMismatch { expected, actual }
    );

    let invoice_amount_msat = invoice.amount_msat.unwrap_or_default();
    ensure_sdk!(
        invoice_amount_msat == amount_msat,
        LnurlError::AmountMismatch {
            expected: amount_msat,
            actual: invoice_amount_msat,
        }
    );

    let success_action = response
        .success_action
        .map(|action| action.validate(&params.callback, validate_success_action_url))
        .transpose()?;
    debug!("Pay callback returned a valid invoice for {amount_msat} msat");

    Ok(LnurlPayResult {
        invoice,
        payer_data_json,
        success_action,
        disposable: response.disposable,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayRequestWire {
    callback: String,
    #[serde(default)]
    min_sendable: u64,
    #[serde(default)]
    max_sendable: u64,
    metadata: String,
    #[serde(default)]
    comment_allowed: u64,
    #[serde(default)]
    payer_data: Option<serde_json::Value>,
    #[serde(default)]
    allows_nostr: Option<bool>,
    #[serde(default)]
    nostr_pubkey: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackResponse {
    pr: String,
    #[serde(default)]
    success_action: Option<SuccessAction>,
    #[serde(default)]
    disposable: Option<bool>,
}

/// Wrapped in a [`crate::LnurlResponse::Pay`], a decoded LNURL-pay offer.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayParams {
    /// The callback, with a `nonce` query parameter to bypass caches
    pub callback: String,
    /// The minimum amount, in millisats, that this LNURL-pay endpoint accepts
    pub min_sendable: u64,
    /// The maximum amount, in millisats, that this LNURL-pay endpoint accepts
    pub max_sendable: u64,
    /// The comment length accepted by this endpoint
    ///
    /// See <https://github.com/lnurl/luds/blob/luds/12.md>
    pub comment_allowed: u64,
    pub metadata: Metadata,
    pub payer_data: PayerDataSpec,

    /// Value indicating whether the recipient supports Nostr Zaps through NIP-57.
    ///
    /// See <https://github.com/nostr-protocol/nips/blob/master/57.md>
    pub allows_nostr: Option<bool>,
    /// Optional recipient's lnurl provider's Nostr pubkey for NIP-57, hex encoded.
    pub nostr_pubkey: Option<String>,

    /// Indicates the domain of the LNURL-pay service, to be shown to the user when asking for
    /// payment input, as per LUD-06 spec.
    ///
    /// Note: this is not the domain of the callback, but the domain of the LNURL-pay endpoint.
    pub domain: String,
    pub url: String,
}

impl LnurlPayParams {
    pub fn parse(body: serde_json::Value, url: &str) -> LnurlResult<Self> {
        Self::parse_with_nonce(body, url, now())
    }

    pub fn parse_with_nonce(body: serde_json::Value, url: &str, nonce: u64) -> LnurlResult<Self> {
        let wire: PayRequestWire = serde_json::from_value(body).map_err(|e| {
            warn!("Invalid payRequest: {e}");
            LnurlError::validation(format!("invalid payRequest: {e}"))
        })?;

        let metadata = Metadata::parse(&wire.metadata)?;
        let mut callback = Url::parse(&wire.callback)
            .map_err(|e| LnurlError::validation(format!("callback is not a valid URL: {e}")))?;
        set_nonce(&mut callback, nonce);

        let payer_data = match wire.payer_data {
            Some(spec) => serde_json::from_value(spec).unwrap_or_else(|e| {
                warn!("Ignoring invalid payerData spec: {e}");
                PayerDataSpec::default()
            }),
            None => PayerDataSpec::default(),
        };

        let domain = Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        Ok(Self {
            callback: callback.to_string(),
            min_sendable: wire.min_sendable,
            max_sendable: wire.max_sendable,
            comment_allowed: wire.comment_allowed,
            metadata,
            payer_data,
            allows_nostr: wire.allows_nostr,
            nostr_pubkey: wire.nostr_pubkey,
            domain,
            url: url.to_string(),
        })
    }

    pub fn validate_user_input(&self, amount_msat: u64, comment: Option<&str>) -> LnurlResult<()> {
        ensure_sdk!(
            amount_msat >= self.min_sendable,
            LnurlError::validation("Amount is smaller than the minimum allowed")
        );

        ensure_sdk!(
            amount_msat <= self.max_sendable,
            LnurlError::validation("Amount is bigger than the maximum allowed")
        );

        let Some(comment) = comment else {
            return Ok(());
        };

        ensure_sdk!(
            u64::try_from(comment.chars().count()).unwrap_or(u64::MAX) <= self.comment_allowed,
            LnurlError::validation("Comment is longer than the maximum allowed comment length")
        );

        Ok(())
    }

    /// `callback&amount=<msat>[&comment=..][&payerdata=..]`
    pub fn build_callback_url(
        &self,
        amount_msat: u64,
        comment: Option<&str>,
        payer_data_json: Option<&str>,
    ) -> LnurlResult<String> {
        let mut url = Url::parse(&self.callback)
            .map_err(|e| LnurlError::validation(format!("invalid callback url: {e}")))?;

        url.query_pairs_mut()
            .append_pair("amount", &amount_msat.to_string());
        if let Some(comment) = comment
            && !comment.is_empty()
        {
            url.query_pairs_mut().append_pair("comment", comment);
        }
        if let Some(payer_data_json) = payer_data_json {
            url.query_pairs_mut()
                .append_pair("payerdata", payer_data_json);
        }

        Ok(url.to_string())
    }
}

fn set_nonce(url: &mut Url, nonce: u64) {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "nonce")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("nonce", &nonce.to_string());
}

/// A verified LNURL-pay callback response.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayResult {
    pub invoice: DecodedInvoice,
    /// The exact payer data JSON that was sent and hashed, if any
    pub payer_data_json: Option<String>,
    pub success_action: Option<SuccessAction>,
    pub disposable: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sha2::{Digest, Sha256};

    use super::*;
    use crate::test_utils::{MockHttpClient, MockInvoiceDecoder, MockResponse};

    const METADATA: &str = r#"[["text/plain","hi"]]"#;
    const PR: &str = "lnbc10n1mock";
    const URL: &str = "https://service.com/.well-known/lnurlp/alice";

    fn pay_request(payer_data: Option<serde_json::Value>) -> serde_json::Value {
        let mut body = json!({
            "tag": "payRequest",
            "callback": "https://service.com/pay/callback",
            "minSendable": 1000,
            "maxSendable": 100_000,
            "metadata": METADATA,
            "commentAllowed": 10
        });
        if let Some(payer_data) = payer_data {
            body["payerData"] = payer_data;
        }
        body
    }

    fn params(payer_data: Option<serde_json::Value>) -> LnurlPayParams {
        LnurlPayParams::parse_with_nonce(pay_request(payer_data), URL, 42).unwrap()
    }

    fn sha256_hex(data: &str) -> String {
        hex::encode(Sha256::digest(data.as_bytes()))
    }

    fn query_value(url: &str, name: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    #[test]
    fn test_parse_pay_request() {
        let params = params(None);
        assert_eq!(params.callback, "https://service.com/pay/callback?nonce=42");
        assert_eq!(params.min_sendable, 1000);
        assert_eq!(params.max_sendable, 100_000);
        assert_eq!(params.comment_allowed, 10);
        assert_eq!(params.metadata.description(), Some("hi"));
        assert_eq!(params.domain, "service.com");
        assert!(!params.payer_data.exists());
        assert_eq!(params.allows_nostr, None);
    }

    #[test]
    fn test_parse_replaces_nonce() {
        let mut body = pay_request(None);
        body["callback"] = json!("https://service.com/cb?id=7&nonce=1");
        body["allowsNostr"] = json!(true);
        body["nostrPubkey"] = json!("ab".repeat(32));
        let params = LnurlPayParams::parse_with_nonce(body, URL, 99).unwrap();
        assert_eq!(params.callback, "https://service.com/cb?id=7&nonce=99");
        assert_eq!(params.allows_nostr, Some(true));
    }

    #[test]
    fn test_parse_with_current_time_nonce() {
        let params = LnurlPayParams::parse(pay_request(None), URL).unwrap();
        let nonce: u64 = query_value(&params.callback, "nonce")
            .unwrap()
            .parse()
            .unwrap();
        assert!(nonce > 0);
    }

    #[test]
    fn test_parse_invalid_pay_request() {
        let mut no_callback = pay_request(None);
        no_callback["callback"] = json!("not a url");
        let mut bad_metadata = pay_request(None);
        bad_metadata["metadata"] = json!("{");
        let mut no_metadata = pay_request(None);
        no_metadata.as_object_mut().unwrap().remove("metadata");

        for body in [no_callback, bad_metadata, no_metadata] {
            assert!(matches!(
                LnurlPayParams::parse_with_nonce(body, URL, 1),
                Err(LnurlError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_parse_ignores_invalid_payer_data_spec() {
        let params = params(Some(json!("garbage")));
        assert!(!params.payer_data.exists());
    }

    #[test]
    fn test_validate_user_input() {
        let params = params(None);
        assert!(params.validate_user_input(1000, None).is_ok());
        assert!(params.validate_user_input(100_000, Some("0123456789")).is_ok());

        assert!(params.validate_user_input(999, None).is_err());
        assert!(params.validate_user_input(100_001, None).is_err());
        assert!(params.validate_user_input(5000, Some("01234567890")).is_err());
    }

    #[test]
    fn test_build_callback_url() {
        let params = params(None);
        assert_eq!(
            params.build_callback_url(5000, Some(""), None).unwrap(),
            "https://service.com/pay/callback?nonce=42&amount=5000"
        );
        assert_eq!(
            params
                .build_callback_url(5000, Some("thx"), Some(r#"{"name":"A"}"#))
                .unwrap(),
            "https://service.com/pay/callback?nonce=42&amount=5000&comment=thx&payerdata=%7B%22name%22%3A%22A%22%7D"
        );
    }

    #[tokio::test]
    async fn test_pay_call() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(
            200,
            json!({"pr": PR, "routes": [], "disposable": false}),
        ));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(1000), Some(sha256_hex(METADATA)));

        let result = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            Some(""),
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(result.invoice.bolt11, PR);
        assert_eq!(result.payer_data_json, None);
        assert_eq!(result.disposable, Some(false));
        assert_eq!(result.success_action, None);

        let requested = http_client.requested_urls();
        assert_eq!(
            requested,
            vec!["https://service.com/pay/callback?nonce=42&amount=1000".to_string()]
        );
    }

    #[tokio::test]
    async fn test_pay_call_without_advertised_bounds() {
        let body = json!({
            "tag": "payRequest",
            "callback": "https://service.com/pay/callback",
            "metadata": METADATA
        });
        let params = LnurlPayParams::parse_with_nonce(body, URL, 42).unwrap();
        assert_eq!(params.max_sendable, 0);
        assert_eq!(params.comment_allowed, 0);

        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(1000), Some(sha256_hex(METADATA)));

        call(&http_client, &invoice_decoder, &params, 1000, Some(""), None, true)
            .await
            .unwrap();
        call(
            &http_client,
            &invoice_decoder,
            &params,
            1000,
            Some("thanks"),
            None,
            true,
        )
        .await
        .unwrap();

        assert_eq!(
            http_client.requested_urls(),
            vec![
                "https://service.com/pay/callback?nonce=42&amount=1000".to_string(),
                "https://service.com/pay/callback?nonce=42&amount=1000&comment=thanks".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_pay_call_commitment_mismatch() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(1000), Some(sha256_hex("other")));

        let err = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::CommitmentMismatch { expected, actual }
                if expected == sha256_hex(METADATA) && actual == sha256_hex("other")
        ));
    }

    #[tokio::test]
    async fn test_pay_call_amount_mismatch() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(2000), Some(sha256_hex(METADATA)));

        let err = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::AmountMismatch {
                expected: 1000,
                actual: 2000
            }
        ));
    }

    #[tokio::test]
    async fn test_pay_call_with_payer_data() {
        let params = params(Some(json!({
            "name": {"mandatory": false},
            "email": {"mandatory": true}
        })));
        let values = PayerDataValues {
            name: "Alice".into(),
            email: "alice@mail.com".into(),
            ..Default::default()
        };
        let payer_data_json = r#"{"name":"Alice","email":"alice@mail.com"}"#;

        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(
            PR,
            Some(1000),
            Some(sha256_hex(&format!("{METADATA}{payer_data_json}"))),
        );

        let result = call(
            &http_client,
            &invoice_decoder,
            &params,
            1000,
            None,
            Some(&values),
            true,
        )
        .await
        .unwrap();
        assert_eq!(result.payer_data_json.as_deref(), Some(payer_data_json));

        let requested = http_client.requested_urls();
        assert_eq!(
            query_value(&requested[0], "payerdata").as_deref(),
            Some(payer_data_json)
        );
    }

    #[tokio::test]
    async fn test_pay_call_skips_payer_data_without_spec() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": PR})));
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(1000), Some(sha256_hex(METADATA)));
        let values = PayerDataValues {
            name: "Alice".into(),
            ..Default::default()
        };

        let result = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            Some(&values),
            true,
        )
        .await
        .unwrap();
        assert_eq!(result.payer_data_json, None);
        assert_eq!(
            query_value(&http_client.requested_urls()[0], "payerdata"),
            None
        );
    }

    #[tokio::test]
    async fn test_pay_call_mandatory_payer_data_before_request() {
        let http_client = MockHttpClient::new();
        let invoice_decoder = MockInvoiceDecoder::new();
        let params = params(Some(json!({"email": {"mandatory": true}})));

        let err = call(
            &http_client,
            &invoice_decoder,
            &params,
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::MissingMandatoryField { field: "email" }
        ));
        assert!(http_client.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_pay_call_endpoint_error() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(
            200,
            json!({"status": "ERROR", "reason": "amount too low"}),
        ));
        let invoice_decoder = MockInvoiceDecoder::new();

        let err = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::Service { reason, url }
                if reason == "amount too low" && url.ends_with("amount=1000")
        ));
    }

    #[tokio::test]
    async fn test_pay_call_invalid_invoice() {
        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, json!({"pr": "lnbc1garbage"})));
        let invoice_decoder = MockInvoiceDecoder::new();

        let err = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LnurlError::InvalidInvoice(_)));
    }

    #[tokio::test]
    async fn test_pay_call_success_action() {
        let invoice_decoder = MockInvoiceDecoder::new();
        invoice_decoder.add_invoice(PR, Some(1000), Some(sha256_hex(METADATA)));
        let response = json!({
            "pr": PR,
            "successAction": {
                "tag": "url",
                "description": "thanks",
                "url": "https://elsewhere.com/receipt"
            }
        });

        let http_client = MockHttpClient::new();
        http_client.add_response(MockResponse::new(200, response.clone()));
        let err = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LnurlError::Validation(_)));

        http_client.add_response(MockResponse::new(200, response));
        let result = call(
            &http_client,
            &invoice_decoder,
            &params(None),
            1000,
            None,
            None,
            false,
        )
        .await
        .unwrap();
        assert!(matches!(
            result.success_action,
            Some(SuccessAction::Url { data }) if !data.matches_callback_domain
        ));
    }
}
