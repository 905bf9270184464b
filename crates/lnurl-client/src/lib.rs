//! Client side of the LNURL protocols: identifier codec, scheme and domain
//! policy, and the auth, channel, withdraw, pay and allowance subprotocols.

mod allowance;
mod auth;
mod channel;
mod client;
mod codec;
mod config;
mod error;
mod invoice;
mod models;
mod normalize;
pub mod pay;
mod request;
mod scanner;
mod utils;
mod withdraw;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use allowance::LnurlAllowanceParams;
pub use auth::{LnurlAuthParams, random_k1, verify_signature};
pub use channel::LnurlChannelParams;
pub use client::LnurlClient;
pub use codec::{
    LUD17_SCHEMES, decode, decode_strict, decode_strict_with, encode, encode_strict,
    encode_strict_with, is_lud17_scheme, lightning_address_to_url,
};
pub use config::LnurlConfig;
pub use error::{DomainPolicyError, LnurlError, LnurlResult, Validated};
pub use invoice::{Bolt11InvoiceDecoder, DecodedInvoice, InvoiceDecoder};
pub use models::{LnurlCallbackStatus, LnurlErrorDetails, LnurlKind, LnurlResponse};
pub use normalize::{
    HostKind, Normalizer, PublicSuffixList, SuffixResolver, UrlParts, is_domain_name,
};
pub use pay::{LnurlPayParams, LnurlPayResult, Metadata, PayerDataSpec, PayerDataValues};
pub use platform_utils::{HttpClient, HttpError, HttpResponse};
pub use scanner::find_in_text;
pub use withdraw::LnurlWithdrawParams;
