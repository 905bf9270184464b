use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static BECH32_LNURL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\blnurl[0-9]+[0-9a-z]+\b").expect("bech32 lnurl pattern is valid")
});
static SCHEME_LNURL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:lnurlp|lnurlw|lnurlc|lnurla|keyauth)://\S+")
        .expect("scheme lnurl pattern is valid")
});

/// Finds the first LNURL in a blob of text.
///
/// A bech32 LNURL is searched for first, in the lower-cased text, and
/// returned lower-cased. Failing that, the first LUD-17 scheme URL is returned
/// as it appears in the text.
pub fn find_in_text(text: &str) -> Option<String> {
    if let Some(found) = BECH32_LNURL_REGEX.find(&text.to_lowercase()) {
        debug!("Found bech32 lnurl in text");
        return Some(found.as_str().to_string());
    }

    let found = SCHEME_LNURL_REGEX.find(text)?;
    debug!("Found scheme lnurl in text");
    Some(found.as_str().to_string())
}
