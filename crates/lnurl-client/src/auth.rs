use rand::RngCore;
use secp256k1::{Message, PublicKey, Secp256k1, ecdsa::Signature};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{
    ensure_sdk,
    error::{LnurlError, LnurlResult},
};

const SUPPORTED_ACTIONS: [&str; 4] = ["register", "login", "link", "auth"];

/// Wrapped in a [`crate::LnurlResponse::Auth`], the parameters of a LNURL-auth
/// request. These are read from the LNURL itself, no request is made.
///
/// See <https://github.com/lnurl/luds/blob/luds/04.md>
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LnurlAuthParams {
    /// Hex encoded 32 bytes of challenge
    pub k1: String,

    /// When available, one of: register, login, link, auth. Other values are
    /// dropped.
    pub action: Option<String>,

    /// The LNURL-auth URL, including the query arguments. This will be
    /// extended with the signed challenge and the linking key, then called in
    /// the second step of the workflow.
    pub callback: String,

    /// Host of the LNURL-auth service, to be shown to the user when asking for
    /// auth confirmation, as per LUD-04.
    pub host: String,
}

impl LnurlAuthParams {
    pub fn from_url(raw_url: &str) -> LnurlResult<Self> {
        let url = Url::parse(raw_url).map_err(|e| {
            warn!("Lnurl auth URL is invalid: {e:?}");
            LnurlError::format(format!("invalid lnurl auth url: {e}"))
        })?;

        let k1 = query_param(&url, "k1")
            .ok_or_else(|| LnurlError::validation("lnurl missing k1 parameter"))?;
        ensure_sdk!(
            is_valid_k1(&k1),
            LnurlError::validation("k1 is not a valid 32-byte hex-encoded string")
        );

        let action = query_param(&url, "action").filter(|action| {
            let supported = SUPPORTED_ACTIONS.contains(&action.as_str());
            if !supported {
                warn!("Ignoring unsupported lnurl auth action: {action}");
            }
            supported
        });

        let host = url
            .host_str()
            .ok_or_else(|| LnurlError::validation("lnurl missing domain"))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            k1,
            action,
            callback: raw_url.to_string(),
            host,
        })
    }

    /// Builds the URL to call with a signed challenge:
    /// `<callback>&sig=<hex(sign(k1, linkingPrivKey))>&key=<hex(linkingKey)>`
    pub fn signed_callback_url(&self, sig: &str, key: &str) -> LnurlResult<String> {
        let mut url = Url::parse(&self.callback).map_err(|e| {
            warn!("Lnurl auth callback URL is invalid: {e:?}");
            LnurlError::format("invalid lnurl auth callback url")
        })?;
        url.query_pairs_mut()
            .append_pair("sig", sig)
            .append_pair("key", key);
        Ok(url.to_string())
    }
}

/// Verifies a LNURL-auth signature, as a service receiving the callback would.
///
/// `sig` may be DER or compact encoded. A well-formed signature that does not
/// verify yields `Ok(false)`.
///
/// The challenge is not required to be 32 bytes: like a plain ECDSA verifier it
/// is read as a big-endian number, keeping its first 32 bytes when longer.
pub fn verify_signature(k1: &str, sig: &str, key: &str) -> LnurlResult<bool> {
    let k1 = hex::decode(k1).map_err(|_| LnurlError::format("failed to decode k1 hex"))?;
    let sig = hex::decode(sig).map_err(|_| LnurlError::format("failed to decode sig hex"))?;
    let key = hex::decode(key).map_err(|_| LnurlError::format("failed to decode key hex"))?;

    let key = PublicKey::from_slice(&key)
        .map_err(|e| LnurlError::format(format!("failed to parse key: {e}")))?;
    let mut sig = Signature::from_der(&sig)
        .or_else(|_| Signature::from_compact(&sig))
        .map_err(|e| LnurlError::format(format!("failed to parse sig: {e}")))?;
    sig.normalize_s();

    let message = Message::from_digest(challenge_digest(&k1));
    Ok(Secp256k1::verification_only()
        .verify_ecdsa(&message, &sig, &key)
        .is_ok())
}

fn challenge_digest(k1: &[u8]) -> [u8; 32] {
    let k1 = &k1[..k1.len().min(32)];
    let mut digest = [0u8; 32];
    let start = digest.len().saturating_sub(k1.len());
    digest[start..].copy_from_slice(k1);
    digest
}

/// A fresh 32-byte challenge, hex encoded.
pub fn random_k1() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn is_valid_k1(k1: &str) -> bool {
    k1.len() == 64 && k1.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}

pub(crate) fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
