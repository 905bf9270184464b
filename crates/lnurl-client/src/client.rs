use std::sync::Arc;

use platform_utils::{BitreqHttpClient, HttpClient};
use tracing::{debug, warn};
use url::Url;

use crate::{
    allowance::LnurlAllowanceParams,
    auth::{LnurlAuthParams, query_param},
    channel::LnurlChannelParams,
    codec::{decode, decode_strict_with, lightning_address_to_url, with_onion_scheme},
    config::LnurlConfig,
    error::{LnurlError, LnurlResult, Validated},
    invoice::{Bolt11InvoiceDecoder, InvoiceDecoder},
    models::LnurlResponse,
    normalize::{Normalizer, UrlParts},
    pay::{self, LnurlPayParams, LnurlPayResult, PayerDataValues},
    request::{get_callback_status, get_json},
    scanner::find_in_text,
    utils::is_onion_host,
    withdraw::{self, LnurlWithdrawParams},
};

/// Resolves LNURLs and drives the follow-up calls of each subprotocol.
///
/// Immutable once built, so a single instance can be shared between tasks.
pub struct LnurlClient {
    http_client: Arc<dyn HttpClient>,
    tor_client: Option<Arc<dyn HttpClient>>,
    invoice_decoder: Arc<dyn InvoiceDecoder>,
    normalizer: Normalizer,
    config: LnurlConfig,
}

impl LnurlClient {
    pub fn new(config: LnurlConfig) -> Self {
        let http_client =
            BitreqHttpClient::new(config.user_agent.clone(), config.request_timeout_secs);
        Self {
            http_client: Arc::new(http_client),
            tor_client: None,
            invoice_decoder: Arc::new(Bolt11InvoiceDecoder),
            normalizer: Normalizer::default(),
            config,
        }
    }

    #[must_use]
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = http_client;
        self
    }

    /// Client used for `.onion` hosts instead of the default one.
    #[must_use]
    pub fn with_tor_client(mut self, tor_client: Arc<dyn HttpClient>) -> Self {
        self.tor_client = Some(tor_client);
        self
    }

    #[must_use]
    pub fn with_invoice_decoder(mut self, invoice_decoder: Arc<dyn InvoiceDecoder>) -> Self {
        self.invoice_decoder = invoice_decoder;
        self
    }

    pub fn config(&self) -> &LnurlConfig {
        &self.config
    }

    /// Resolves `input` and returns the parameters of the subprotocol it points to.
    ///
    /// `input` may be a URL, a lightning address, or text containing a bech32
    /// or LUD-17 LNURL. Auth requests and withdraw requests carrying all their
    /// parameters in the query string are answered without a request.
    pub async fn handle(&self, input: &str) -> LnurlResult<LnurlResponse> {
        let url = self.resolve(input)?;
        let parsed = Url::parse(&url)
            .map_err(|e| LnurlError::format(format!("invalid lnurl url '{url}': {e}")))?;

        match query_param(&parsed, "tag").as_deref() {
            Some("login") => {
                debug!("Handling lnurl-auth from the query string");
                return Ok(LnurlResponse::Auth(LnurlAuthParams::from_url(&url)?));
            }
            Some("withdrawRequest") => {
                if let Some(params) = LnurlWithdrawParams::from_query(&parsed) {
                    debug!("Handling fast lnurl-withdraw from the query string");
                    return Ok(LnurlResponse::Withdraw(params));
                }
            }
            _ => {}
        }

        let body = get_json(self.client_for(&url), &url).await?;
        Self::dispatch(body, &url)
    }

    /// Sends the LNURL-pay callback and verifies the returned invoice.
    pub async fn pay(
        &self,
        params: &LnurlPayParams,
        amount_msat: u64,
        comment: Option<&str>,
        payer_data: Option<&PayerDataValues>,
    ) -> LnurlResult<LnurlPayResult> {
        pay::call(
            self.client_for(&params.callback),
            self.invoice_decoder.as_ref(),
            params,
            amount_msat,
            comment,
            payer_data,
            self.config.validate_success_action_url,
        )
        .await
    }

    /// Hands `invoice` to the LNURL-withdraw service.
    pub async fn withdraw(&self, params: &LnurlWithdrawParams, invoice: &str) -> LnurlResult<()> {
        withdraw::execute(
            self.client_for(&params.callback),
            self.invoice_decoder.as_ref(),
            params,
            invoice,
        )
        .await
    }

    /// Sends a signed LNURL-auth challenge, as per
    /// <https://github.com/lnurl/luds/blob/luds/04.md>
    pub async fn submit_auth(
        &self,
        params: &LnurlAuthParams,
        sig: &str,
        key: &str,
    ) -> LnurlResult<()> {
        let url = params.signed_callback_url(sig, key)?;
        get_callback_status(self.client_for(&url), &url).await
    }

    /// Turns the user input into the URL to query.
    pub fn resolve(&self, input: &str) -> LnurlResult<String> {
        let input = input.trim();
        let lower = input.to_lowercase();

        if lower.starts_with("https://") || lower.starts_with("http://") {
            return Ok(if self.config.strict {
                accept(self.normalizer.normalize(input))
            } else {
                input.to_string()
            });
        }

        if let Some(found) = find_in_text(input) {
            return if self.config.strict {
                Ok(accept(decode_strict_with(&self.normalizer, &found)?))
            } else {
                Ok(with_onion_scheme(&decode(&found)?))
            };
        }

        if input.contains('@') && !input.contains(char::is_whitespace) {
            return lightning_address_to_url(input);
        }

        Err(LnurlError::format(format!("no lnurl found in '{input}'")))
    }

    fn client_for(&self, url: &str) -> &dyn HttpClient {
        let onion = UrlParts::split(url).is_some_and(|parts| is_onion_host(parts.host));
        match &self.tor_client {
            Some(tor_client) if onion => {
                debug!("Routing {url} through the tor client");
                tor_client.as_ref()
            }
            _ => self.http_client.as_ref(),
        }
    }

    fn dispatch(body: serde_json::Value, url: &str) -> LnurlResult<LnurlResponse> {
        let tag = body
            .get("tag")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        debug!("Dispatching lnurl response with tag '{tag}'");

        match tag.as_str() {
            "withdrawRequest" => Ok(LnurlResponse::Withdraw(LnurlWithdrawParams::from_json(
                body,
            )?)),
            "payRequest" => Ok(LnurlResponse::Pay(Box::new(LnurlPayParams::parse(
                body, url,
            )?))),
            "channelRequest" => Ok(LnurlResponse::Channel(LnurlChannelParams::from_json(
                body,
            )?)),
            "allowanceRequest" => Ok(LnurlResponse::Allowance(
                LnurlAllowanceParams::from_json(body)?,
            )),
            _ => Err(LnurlError::UnknownTag {
                tag,
                body: body.to_string(),
            }),
        }
    }
}

fn accept(validated: Validated<String>) -> String {
    if let Some(warning) = &validated.warning {
        warn!("Continuing with {} despite: {warning}", validated.value);
    }
    validated.value
}

impl Default for LnurlClient {
    fn default() -> Self {
        Self::new(LnurlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use serde_json::json;
    use sha2::{Digest, Sha256};

    use super::*;
    use crate::{
        codec::encode,
        models::LnurlKind,
        test_utils::{MockHttpClient, MockInvoiceDecoder, MockResponse},
    };

    const K1: &str = "e2af6254a8df433264fa23f67eb8188635d15ce883e8fc020989d5f82ae6f11e";
    const METADATA: &str = r#"[["text/plain","coffee"]]"#;

    fn client(config: LnurlConfig) -> (LnurlClient, Arc<MockHttpClient>) {
        let http_client = Arc::new(MockHttpClient::new());
        let client = LnurlClient::new(config).with_http_client(http_client.clone());
        (client, http_client)
    }

    fn pay_request_body() -> serde_json::Value {
        json!({
            "tag": "payRequest",
            "callback": "https://service.com/lnurlp/alice/callback",
            "minSendable": 1000,
            "maxSendable": 1_000_000,
            "metadata": METADATA,
            "commentAllowed": 32
        })
    }

    #[tokio::test]
    async fn test_handle_auth_without_request() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        let lnurl = encode(&format!(
            "https://site.com/login?tag=login&k1={K1}&action=login"
        ))?;

        let response = client.handle(&format!("lightning:{lnurl}")).await?;
        assert_eq!(response.kind(), LnurlKind::Auth);
        let LnurlResponse::Auth(params) = response else {
            panic!("expected auth");
        };
        assert_eq!(params.k1, K1);
        assert_eq!(params.host, "site.com");
        assert!(http_client.requested_urls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_auth_invalid_k1() {
        let (client, http_client) = client(LnurlConfig::default());
        let err = client
            .handle("keyauth://site.com/login?tag=login&k1=ABCD")
            .await
            .unwrap_err();
        assert!(matches!(err, LnurlError::Validation(_)));
        assert!(http_client.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_fast_withdraw_without_request() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        let response = client
            .handle("lnurlw://service.com/w?tag=withdrawRequest&k1=abc&callback=https%3A%2F%2Fservice.com%2Fcb&minWithdrawable=1000&maxWithdrawable=2000")
            .await?;
        let LnurlResponse::Withdraw(params) = response else {
            panic!("expected withdraw");
        };
        assert_eq!(params.callback, "https://service.com/cb");
        assert_eq!(params.max_withdrawable, 2000);
        assert!(http_client.requested_urls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_incomplete_fast_withdraw_falls_through() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(
            200,
            json!({
                "tag": "withdrawRequest",
                "callback": "https://service.com/cb",
                "k1": "abc",
                "minWithdrawable": 1000,
                "maxWithdrawable": 2000,
                "defaultDescription": "sats"
            }),
        ));

        let url = "https://service.com/w?tag=withdrawRequest&minWithdrawable=oops";
        let response = client.handle(url).await?;
        assert_eq!(response.kind(), LnurlKind::Withdraw);
        assert_eq!(http_client.requested_urls(), vec![url.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_pay_request_from_bech32() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(200, pay_request_body()));
        let lnurl = encode("https://service.com/lnurlp/alice")?;

        let response = client.handle(&lnurl).await?;
        let LnurlResponse::Pay(params) = response else {
            panic!("expected pay");
        };
        assert_eq!(params.metadata.description(), Some("coffee"));
        assert_eq!(params.domain, "service.com");
        assert!(
            params
                .callback
                .starts_with("https://service.com/lnurlp/alice/callback?nonce=")
        );
        assert_eq!(
            http_client.requested_urls(),
            vec!["https://service.com/lnurlp/alice".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_lightning_address() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(200, pay_request_body()));

        let response = client.handle("Alice@Service.com").await?;
        assert_eq!(response.kind(), LnurlKind::Pay);
        assert_eq!(
            http_client.requested_urls(),
            vec!["https://service.com/.well-known/lnurlp/alice".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_channel_and_allowance() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(
            200,
            json!({
                "tag": "channelRequest",
                "uri": "03ab@1.2.3.4:9735",
                "callback": "https://service.com/channel",
                "k1": "abc"
            }),
        ));
        http_client.add_response(MockResponse::new(
            200,
            json!({
                "tag": "allowanceRequest",
                "socket": "wss://service.com/allowance",
                "k1": "abc"
            }),
        ));

        let channel = client.handle("lnurlc://service.com/channel").await?;
        assert_eq!(channel.kind(), LnurlKind::Channel);
        let allowance = client.handle("lnurla://service.com/allowance").await?;
        assert_eq!(allowance.kind(), LnurlKind::Allowance);
        assert_eq!(
            http_client.requested_urls(),
            vec![
                "https://service.com/channel".to_string(),
                "https://service.com/allowance".to_string()
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_error_envelope() {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(
            200,
            json!({"status": "ERROR", "reason": "expired"}),
        ));

        let err = client
            .handle("https://service.com/lnurl")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::Service { reason, url }
                if reason == "expired" && url == "https://service.com/lnurl"
        ));
    }

    #[tokio::test]
    async fn test_handle_unknown_tag() {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(200, json!({"tag": "hostedChannelRequest"})));

        let err = client
            .handle("https://service.com/lnurl")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LnurlError::UnknownTag { tag, body }
                if tag == "hostedChannelRequest" && body.contains("hostedChannelRequest")
        ));
    }

    #[tokio::test]
    async fn test_handle_unrecognized_input() {
        let (client, http_client) = client(LnurlConfig::default());
        for input in ["", "hello world", "ftp://service.com"] {
            assert!(matches!(
                client.handle(input).await,
                Err(LnurlError::Format(_))
            ));
        }
        assert!(http_client.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_onion_hosts_use_tor_client() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        let tor_client = Arc::new(MockHttpClient::new());
        tor_client.add_response(MockResponse::new(200, pay_request_body()));
        let client = client.with_tor_client(tor_client.clone());

        client.handle("lnurlp://service.onion/lnurlp/alice").await?;
        assert_eq!(
            tor_client.requested_urls(),
            vec!["http://service.onion/lnurlp/alice".to_string()]
        );
        assert!(http_client.requested_urls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_onion_hosts_without_tor_client() -> Result<()> {
        let (client, http_client) = client(LnurlConfig::default());
        http_client.add_response(MockResponse::new(200, pay_request_body()));

        client.handle("http://service.onion/lnurlp/alice").await?;
        assert_eq!(
            http_client.requested_urls(),
            vec!["http://service.onion/lnurlp/alice".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_strict_mode_corrects_scheme() -> Result<()> {
        let (client, http_client) = client(LnurlConfig {
            strict: true,
            ..LnurlConfig::default()
        });
        http_client.add_response(MockResponse::new(200, pay_request_body()));
        http_client.add_response(MockResponse::new(200, pay_request_body()));

        client.handle("http://service.com/lnurlp/alice").await?;
        let lnurl = encode("https://service.onion/lnurlp/alice")?;
        client.handle(&lnurl).await?;
        assert_eq!(
            http_client.requested_urls(),
            vec![
                "https://service.com/lnurlp/alice".to_string(),
                "http://service.onion/lnurlp/alice".to_string()
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_then_pay() -> Result<()> {
        let invoice_decoder = Arc::new(MockInvoiceDecoder::new());
        invoice_decoder.add_invoice(
            "lnbc1mock",
            Some(5000),
            Some(hex::encode(Sha256::digest(METADATA.as_bytes()))),
        );
        let (client, http_client) = client(LnurlConfig::default());
        let client = client.with_invoice_decoder(invoice_decoder);
        http_client.add_response(MockResponse::new(200, pay_request_body()));
        http_client.add_response(MockResponse::new(
            200,
            json!({"pr": "lnbc1mock", "successAction": {"tag": "message", "message": "thanks"}}),
        ));

        let LnurlResponse::Pay(params) = client.handle("alice@service.com").await? else {
            panic!("expected pay");
        };
        let result = client.pay(&params, 5000, Some("hi"), None).await?;
        assert_eq!(result.invoice.amount_msat, Some(5000));
        assert!(result.success_action.is_some());

        let requested = http_client.requested_urls();
        assert_eq!(requested.len(), 2);
        assert!(requested[1].ends_with("&amount=5000&comment=hi"));
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw_and_auth_callbacks() -> Result<()> {
        let invoice_decoder = Arc::new(MockInvoiceDecoder::new());
        invoice_decoder.add_invoice("lnbc1mock", Some(1500), None);
        let (client, http_client) = client(LnurlConfig::default());
        let client = client.with_invoice_decoder(invoice_decoder);
        http_client.add_response(MockResponse::new(200, json!({"status": "OK"})));
        http_client.add_response(MockResponse::new(200, json!({"status": "OK"})));

        let LnurlResponse::Withdraw(withdraw) = client
            .handle("lnurlw://service.com/w?tag=withdrawRequest&k1=abc&callback=https%3A%2F%2Fservice.com%2Fcb&minWithdrawable=1000&maxWithdrawable=2000")
            .await?
        else {
            panic!("expected withdraw");
        };
        client.withdraw(&withdraw, "lnbc1mock").await?;

        let LnurlResponse::Auth(auth) = client
            .handle(&format!("keyauth://site.com/login?tag=login&k1={K1}"))
            .await?
        else {
            panic!("expected auth");
        };
        client.submit_auth(&auth, "3045", "02ab").await?;

        assert_eq!(
            http_client.requested_urls(),
            vec![
                "https://service.com/cb?k1=abc&pr=lnbc1mock".to_string(),
                format!("https://site.com/login?tag=login&k1={K1}&sig=3045&key=02ab"),
            ]
        );
        Ok(())
    }
}
