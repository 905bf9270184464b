use serde::{Deserialize, Serialize};

use crate::{
    ensure_sdk,
    error::{LnurlError, LnurlResult},
};

/// Payer data a LNURL-pay service asks for, as per
/// <https://github.com/lnurl/luds/blob/luds/18.md>
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PayerDataSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PayerDataItemSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PayerDataItemSpec>,
    /// A lightning address of the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<PayerDataItemSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<PayerDataItemSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<PayerDataKeyAuthSpec>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PayerDataItemSpec {
    #[serde(default)]
    pub mandatory: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PayerDataKeyAuthSpec {
    #[serde(default)]
    pub mandatory: bool,
    /// Challenge to sign with the payer's linking key
    #[serde(default)]
    pub k1: String,
}

impl PayerDataSpec {
    pub fn exists(&self) -> bool {
        self.name.is_some()
            || self.pubkey.is_some()
            || self.identifier.is_some()
            || self.email.is_some()
            || self.auth.is_some()
    }

    /// Fails on the first mandatory field without a value.
    pub fn check(&self, values: Option<&PayerDataValues>) -> LnurlResult<()> {
        let missing = |item: Option<PayerDataItemSpec>, value: Option<&str>| {
            item.is_some_and(|i| i.mandatory) && value.is_none_or(str::is_empty)
        };

        ensure_sdk!(
            !missing(self.email, values.map(|v| v.email.as_str())),
            LnurlError::MissingMandatoryField { field: "email" }
        );
        ensure_sdk!(
            !missing(self.identifier, values.map(|v| v.identifier.as_str())),
            LnurlError::MissingMandatoryField {
                field: "lightning address"
            }
        );
        ensure_sdk!(
            !missing(self.name, values.map(|v| v.name.as_str())),
            LnurlError::MissingMandatoryField { field: "name" }
        );
        ensure_sdk!(
            !missing(self.pubkey, values.map(|v| v.pubkey.as_str())),
            LnurlError::MissingMandatoryField { field: "pubkey" }
        );

        let auth_mandatory = self.auth.as_ref().is_some_and(|auth| auth.mandatory);
        ensure_sdk!(
            !(auth_mandatory && values.is_none_or(|values| values.auth.is_none())),
            LnurlError::MissingMandatoryField { field: "auth" }
        );

        Ok(())
    }
}

/// Payer data sent along a LNURL-pay callback. Empty fields are left out of the
/// JSON encoding.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PayerDataValues {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pubkey: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub identifier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<KeyAuth>,
}

impl PayerDataValues {
    /// The exact JSON sent as `payerdata`, and hashed into the invoice
    /// description hash.
    pub fn to_json(&self) -> LnurlResult<String> {
        serde_json::to_string(self)
            .map_err(|e| LnurlError::validation(format!("failed to encode payer data: {e}")))
    }
}

/// Signed payer data challenge
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct KeyAuth {
    pub k1: String,
    pub sig: String,
    pub key: String,
}
