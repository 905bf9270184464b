//! Conversions between bech32 LNURLs, LUD-17 scheme URLs and canonical URLs.

use bech32::{Checksum, Hrp, primitives::decode::CheckedHrpstring};
use tracing::{debug, warn};

use crate::{
    error::{DomainPolicyError, LnurlError, LnurlResult, Validated},
    normalize::{Normalizer, PublicSuffixList, SuffixResolver, UrlParts},
    utils::is_onion_host,
};

const LNURL_HRP: &str = "lnurl";
const BECH32_PREFIX: &str = "lnurl1";

/// Bech32 without the BIP-173 length limit, since LNURLs carrying all of
/// their parameters easily exceed 1023 characters.
enum LnurlChecksum {}

impl Checksum for LnurlChecksum {
    type MidstateRepr = u32;
    const CODE_LENGTH: usize = usize::MAX;
    const CHECKSUM_LENGTH: usize = 6;
    const GENERATOR_SH: [u32; 5] = [
        0x3b6a_57b2,
        0x2650_8e6d,
        0x1ea1_19fa,
        0x3d42_33dd,
        0x2a14_62b3,
    ];
    const TARGET_RESIDUE: u32 = 1;
}

/// LUD-17 schemes. Each one stands for `https` (`http` on onion hosts).
pub const LUD17_SCHEMES: [&str; 5] = ["lnurlp", "lnurlw", "lnurlc", "lnurla", "keyauth"];

pub fn is_lud17_scheme(scheme: &str) -> bool {
    LUD17_SCHEMES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
}

/// Decodes a bech32 LNURL or a LUD-17 scheme URL into a plain URL.
///
/// Scheme URLs are rewritten to `https://` with the remainder kept byte for
/// byte. `http://` URLs are already canonical for onion services and pass
/// through untouched.
pub fn decode(code: &str) -> LnurlResult<String> {
    let code = code.trim();
    if code.to_lowercase().starts_with(BECH32_PREFIX) {
        return decode_bech32(code);
    }

    if let Some((scheme, rest)) = code.split_once("://") {
        if scheme.eq_ignore_ascii_case("https") || is_lud17_scheme(scheme) {
            return Ok(format!("https://{rest}"));
        }
        if scheme.eq_ignore_ascii_case("http") {
            return Ok(code.to_string());
        }
    }

    Err(LnurlError::format(format!(
        "unrecognized lnurl format: {code}"
    )))
}

/// Decodes like [`decode`] and then applies the scheme and domain policy.
///
/// The corrected URL is always returned; a policy violation rides along as a
/// warning. LUD-17 aliases given directly are legitimate and never warn about
/// their scheme, but a bech32 payload carrying one does.
pub fn decode_strict(code: &str) -> LnurlResult<Validated<String>> {
    decode_strict_with(&Normalizer::new(PublicSuffixList), code)
}

pub fn decode_strict_with<R: SuffixResolver>(
    normalizer: &Normalizer<R>,
    code: &str,
) -> LnurlResult<Validated<String>> {
    let code = code.trim();
    if code.to_lowercase().starts_with(BECH32_PREFIX) {
        let decoded = decode_bech32(code)?;
        return Ok(normalizer.normalize(&decoded));
    }

    let Some(parts) = UrlParts::split(code) else {
        return Err(LnurlError::format(format!(
            "unrecognized lnurl format: {code}"
        )));
    };
    let Some(scheme) = parts.scheme else {
        return Err(LnurlError::format(format!(
            "unrecognized lnurl format: {code}"
        )));
    };

    let mut normalized = normalizer.normalize(code);
    if is_lud17_scheme(scheme)
        && matches!(
            normalized.warning,
            Some(DomainPolicyError::InvalidScheme { .. })
        )
    {
        normalized.warning = None;
    }
    Ok(normalized)
}

/// Encodes a URL as an upper-cased bech32 LNURL.
pub fn encode(url: &str) -> LnurlResult<String> {
    let hrp = Hrp::parse(LNURL_HRP).map_err(|e| LnurlError::format(e.to_string()))?;
    let encoded = bech32::encode::<LnurlChecksum>(hrp, url.as_bytes())
        .map_err(|e| LnurlError::format(e.to_string()))?;
    Ok(encoded.to_uppercase())
}

/// Applies the scheme and domain policy before encoding.
///
/// LUD-17 aliases are first turned into their canonical scheme. Hosts failing
/// the domain or TLD checks are encoded as given, with the violation attached.
pub fn encode_strict(url: &str) -> LnurlResult<Validated<String>> {
    encode_strict_with(&Normalizer::new(PublicSuffixList), url)
}

pub fn encode_strict_with<R: SuffixResolver>(
    normalizer: &Normalizer<R>,
    url: &str,
) -> LnurlResult<Validated<String>> {
    let url = url.trim();
    let (input, alias) = match UrlParts::split(url) {
        Some(parts) if parts.scheme.is_some_and(is_lud17_scheme) => {
            (format!("https://{}", parts.rest), true)
        }
        _ => (url.to_string(), false),
    };

    let mut normalized = normalizer.normalize(&input);
    if alias
        && matches!(
            normalized.warning,
            Some(DomainPolicyError::InvalidScheme { .. })
        )
    {
        normalized.warning = None;
    }
    if let Some(warning) = &normalized.warning {
        warn!("Encoding {url} despite policy violation: {warning}");
    }

    Ok(Validated {
        value: encode(&normalized.value)?,
        warning: normalized.warning,
    })
}

/// Expands a LUD-16 lightning address into its LNURL-pay endpoint.
pub fn lightning_address_to_url(address: &str) -> LnurlResult<String> {
    let address = address.trim();
    let address = address.strip_prefix('₿').unwrap_or(address);
    let (user, domain) = address
        .split_once('@')
        .ok_or_else(|| LnurlError::format(format!("invalid lightning address: {address}")))?;

    // Domains are case-insensitive, and LUD-16 only allows lowercase usernames.
    let (user, domain) = (user.to_lowercase(), domain.to_lowercase());
    if user.is_empty()
        || !user
            .chars()
            .all(|c| c.is_alphanumeric() || ['-', '_', '.', '+'].contains(&c))
    {
        return Err(LnurlError::format(format!(
            "invalid lightning address user: {user}"
        )));
    }
    if domain.is_empty() || domain.contains(['/', '?', '#', '@']) {
        return Err(LnurlError::format(format!(
            "invalid lightning address domain: {domain}"
        )));
    }

    let scheme = if is_onion_host(&domain) { "http" } else { "https" };
    Ok(format!("{scheme}://{domain}/.well-known/lnurlp/{user}"))
}

/// Switches an `https` URL to `http` when it points to an onion service.
pub(crate) fn with_onion_scheme(url: &str) -> String {
    match UrlParts::split(url) {
        Some(parts)
            if parts.scheme.is_some_and(|s| s.eq_ignore_ascii_case("https"))
                && is_onion_host(parts.host) =>
        {
            debug!("Using http for onion host {}", parts.host);
            format!("http://{}", parts.rest)
        }
        _ => url.to_string(),
    }
}

fn decode_bech32(code: &str) -> LnurlResult<String> {
    let code = code.to_lowercase();
    let checked = CheckedHrpstring::new::<LnurlChecksum>(&code)
        .map_err(|e| LnurlError::format(format!("invalid bech32 lnurl: {e}")))?;
    let hrp = checked.hrp().to_lowercase();
    if hrp != LNURL_HRP {
        return Err(LnurlError::format(format!(
            "tag is not '{LNURL_HRP}', but '{hrp}'"
        )));
    }

    String::from_utf8(checked.byte_iter().collect())
        .map_err(|_| LnurlError::format("lnurl payload is not valid UTF-8"))
}
