//! Scheme and domain policy for canonical LNURLs.
//!
//! A canonical LNURL uses `http` when its effective top-level domain is
//! `onion` and `https` everywhere else, IP literals included.

use std::net::IpAddr;

use tracing::debug;

use crate::error::{DomainPolicyError, Validated};

const ONION_TLD: &str = "onion";

/// Public suffix and IDNA lookups used to classify hosts.
pub trait SuffixResolver: Send + Sync {
    /// IDNA ToASCII form of `host`, `None` when the host cannot be converted.
    fn to_ascii(&self, host: &str) -> Option<String>;

    /// Effective TLD plus one label of an ASCII host.
    fn registrable_domain(&self, host: &str) -> Option<String>;

    /// Whether `suffix` is listed in the ICANN section of the public suffix list.
    fn is_icann(&self, suffix: &str) -> bool;
}

/// [`SuffixResolver`] backed by the bundled Mozilla public suffix list.
#[derive(Clone, Copy, Debug, Default)]
pub struct PublicSuffixList;

impl SuffixResolver for PublicSuffixList {
    fn to_ascii(&self, host: &str) -> Option<String> {
        match url::Host::parse(host) {
            Ok(url::Host::Domain(domain)) => Some(domain),
            _ => None,
        }
    }

    fn registrable_domain(&self, host: &str) -> Option<String> {
        let domain = psl::domain(host.as_bytes())?;
        std::str::from_utf8(domain.as_bytes())
            .ok()
            .map(ToString::to_string)
    }

    fn is_icann(&self, suffix: &str) -> bool {
        psl::suffix(suffix.as_bytes()).and_then(|s| s.typ()) == Some(psl::Type::Icann)
    }
}

/// How a URL host was classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostKind {
    Ip(IpAddr),
    Domain {
        subdomain: String,
        domain: String,
        tld: String,
        icann: bool,
    },
}

impl HostKind {
    pub fn is_onion(&self) -> bool {
        matches!(self, HostKind::Domain { tld, .. } if tld == ONION_TLD)
    }

    /// Scheme the host must be reached through.
    pub fn required_scheme(&self) -> &'static str {
        if self.is_onion() { "http" } else { "https" }
    }
}

/// Applies the scheme and domain policy to URLs.
#[derive(Clone, Debug)]
pub struct Normalizer<R = PublicSuffixList> {
    resolver: R,
}

impl Default for Normalizer<PublicSuffixList> {
    fn default() -> Self {
        Self::new(PublicSuffixList)
    }
}

impl<R: SuffixResolver> Normalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Normalizes `url`, returning the corrected URL and the policy violation
    /// found, if any.
    ///
    /// Only the scheme is ever rewritten; everything after `://` is kept as
    /// given. Hosts that fail domain or TLD validation are returned unchanged.
    pub fn normalize(&self, url: &str) -> Validated<String> {
        let Some(parts) = UrlParts::split(url) else {
            return Validated::warn(url.to_string(), DomainPolicyError::InvalidUrl);
        };

        let kind = match self.classify(parts.host) {
            Ok(kind) => kind,
            Err(e) => {
                debug!("Host {} rejected: {e}", parts.host);
                return Validated::warn(url.to_string(), e);
            }
        };

        if let HostKind::Domain { tld, icann, .. } = &kind
            && !kind.is_onion()
            && !icann
        {
            debug!("Host {} has non-ICANN tld {tld}", parts.host);
            return Validated::warn(url.to_string(), DomainPolicyError::InvalidTld);
        }

        let required = kind.required_scheme();
        match parts.scheme {
            Some(scheme) if scheme.eq_ignore_ascii_case(required) => {
                Validated::ok(url.to_string())
            }
            scheme => Validated::warn(
                format!("{required}://{}", parts.rest),
                DomainPolicyError::InvalidScheme {
                    found: scheme.unwrap_or_default().to_string(),
                },
            ),
        }
    }

    /// Classifies a bare host (no scheme, port or brackets).
    pub fn classify(&self, host: &str) -> Result<HostKind, DomainPolicyError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(HostKind::Ip(ip));
        }

        let ascii = self
            .resolver
            .to_ascii(host)
            .ok_or(DomainPolicyError::InvalidDomain)?;
        if !is_domain_name(&ascii) {
            return Err(DomainPolicyError::InvalidDomain);
        }

        let registrable = self
            .resolver
            .registrable_domain(ascii.trim_end_matches('.'))
            .ok_or(DomainPolicyError::InvalidDomain)?;
        let (domain, tld) = registrable
            .split_once('.')
            .ok_or(DomainPolicyError::InvalidDomain)?;
        let subdomain = ascii
            .trim_end_matches('.')
            .strip_suffix(&registrable)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or_default();

        Ok(HostKind::Domain {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            tld: tld.to_string(),
            icann: self.resolver.is_icann(tld),
        })
    }
}

/// The pieces of a URL the policy needs, borrowed from the input.
#[derive(Debug, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    /// Everything after `scheme://`, or the whole input when there is no scheme.
    pub rest: &'a str,
    pub host: &'a str,
    pub port: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    pub fn split(url: &'a str) -> Option<Self> {
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) if is_scheme(scheme) => (Some(scheme), rest),
            _ => (None, url.strip_prefix("//").unwrap_or(url)),
        };

        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let host_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host_port)| host_port);

        let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
            let (host, after) = bracketed.split_once(']')?;
            (host, after.strip_prefix(':'))
        } else {
            split_port(host_port)
        };

        if host.is_empty() {
            return None;
        }

        Some(Self {
            scheme,
            rest,
            host,
            port,
        })
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Splits `domain.com:8080`. A trailing run of digits only counts as a port
/// when it is preceded by a colon.
fn split_port(host_port: &str) -> (&str, Option<&str>) {
    for (i, c) in host_port.char_indices().rev() {
        if c == ':' {
            return (&host_port[..i], Some(&host_port[i + 1..]));
        }
        if !c.is_ascii_digit() {
            break;
        }
    }
    (host_port, None)
}

/// Checks if `s` is a presentation-format domain name: LDH labels plus
/// underscores, 1 to 63 bytes per label, at most 253 bytes in total (254 with
/// a trailing dot) and at least one non-numeric character.
pub fn is_domain_name(s: &str) -> bool {
    if s == "." {
        return true;
    }

    let len = s.len();
    if len == 0 || len > 254 || (len == 254 && !s.ends_with('.')) {
        return false;
    }

    let mut last = b'.';
    let mut non_numeric = false;
    let mut label_len = 0usize;
    for c in s.bytes() {
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                non_numeric = true;
                label_len += 1;
            }
            b'0'..=b'9' => label_len += 1,
            b'-' => {
                if last == b'.' {
                    return false;
                }
                non_numeric = true;
                label_len += 1;
            }
            b'.' => {
                if last == b'.' || last == b'-' || label_len == 0 || label_len > 63 {
                    return false;
                }
                label_len = 0;
            }
            _ => return false,
        }
        last = c;
    }

    last != b'-' && label_len <= 63 && non_numeric
}
