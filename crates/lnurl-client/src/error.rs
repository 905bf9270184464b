use platform_utils::HttpError;
use thiserror::Error;

pub type LnurlResult<T, E = LnurlError> = Result<T, E>;

#[derive(Debug, Error, Clone)]
pub enum LnurlError {
    /// Malformed identifier, bad hex or bech32 payload.
    #[error("invalid format: {0}")]
    Format(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{field} is mandatory")]
    MissingMandatoryField { field: &'static str },
    /// A soft domain policy violation that was promoted to an error through
    /// [`Validated::into_result`].
    #[error("{error} (corrected: {corrected})")]
    DomainPolicy {
        error: DomainPolicyError,
        corrected: String,
    },
    #[error("http error calling '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: HttpError,
    },
    #[error("endpoint error calling '{url}': {reason}")]
    Service { reason: String, url: String },
    #[error("unknown response tag '{tag}': {body}")]
    UnknownTag { tag: String, body: String },
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),
    #[error("wrong description_hash (expected {expected}, got {actual})")]
    CommitmentMismatch { expected: String, actual: String },
    #[error("got invoice with wrong amount (wanted {expected}, got {actual})")]
    AmountMismatch { expected: u64, actual: u64 },
}

impl LnurlError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn transport(url: &str, source: impl Into<HttpError>) -> Self {
        Self::Transport {
            url: url.to_string(),
            source: source.into(),
        }
    }
}

impl From<base64::DecodeError> for LnurlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Scheme and domain rules every canonical LNURL must follow.
///
/// These are soft: the normalizer still hands back its best corrected value
/// next to the violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainPolicyError {
    #[error("invalid url")]
    InvalidUrl,
    #[error("invalid domain")]
    InvalidDomain,
    #[error("invalid tld")]
    InvalidTld,
    #[error("invalid scheme: {found}")]
    InvalidScheme { found: String },
}

/// A value paired with an optional soft policy violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<T> {
    pub value: T,
    pub warning: Option<DomainPolicyError>,
}

impl<T> Validated<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn warn(value: T, warning: DomainPolicyError) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validated<U> {
        Validated {
            value: f(self.value),
            warning: self.warning,
        }
    }
}

impl<T: ToString> Validated<T> {
    /// Turns a warning into [`LnurlError::DomainPolicy`], for callers that do not
    /// want to proceed with a corrected value.
    pub fn into_result(self) -> LnurlResult<T> {
        match self.warning {
            None => Ok(self.value),
            Some(error) => Err(LnurlError::DomainPolicy {
                error,
                corrected: self.value.to_string(),
            }),
        }
    }
}
