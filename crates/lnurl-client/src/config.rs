use serde::{Deserialize, Serialize};

use crate::utils::default_true;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = platform_utils::REQUEST_TIMEOUT;

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Configuration for an [`crate::LnurlClient`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LnurlConfig {
    /// Timeout applied to every request made by the default HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Value of the `User-Agent` header, if any.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Resolve identifiers with the strict scheme and domain policy. Violations
    /// are logged and the corrected URL is used.
    #[serde(default)]
    pub strict: bool,

    /// Reject URL success actions whose domain differs from the callback domain.
    ///
    /// See <https://github.com/lnurl/luds/blob/luds/09.md>
    #[serde(default = "default_true")]
    pub validate_success_action_url: bool,
}

impl Default for LnurlConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: None,
            strict: false,
            validate_success_action_url: true,
        }
    }
}
