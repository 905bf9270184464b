use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ensure_sdk,
    error::{LnurlError, LnurlResult},
    utils::default_true,
};

pub type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
pub type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const MAX_DESCRIPTION_LEN: usize = 144;
const MAX_CIPHERTEXT_LEN: usize = 4096;
const IV_LEN: usize = 24;

/// Supported success action types
///
/// Receiving any other (unsupported) success action type will result in a failed parsing,
/// which will abort the LNURL-pay workflow, as per LUD-09.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "tag")]
pub enum SuccessAction {
    /// AES type, described in LUD-10
    Aes {
        #[serde(flatten)]
        data: AesSuccessActionData,
    },

    /// Message type, described in LUD-09
    Message {
        #[serde(flatten)]
        data: MessageSuccessActionData,
    },

    /// URL type, described in LUD-09
    Url {
        #[serde(flatten)]
        data: UrlSuccessActionData,
    },
}

impl SuccessAction {
    /// Validates the action against the callback it came from. URL actions get
    /// their `matches_callback_domain` flag set.
    pub fn validate(self, callback: &str, validate_url: bool) -> LnurlResult<Self> {
        match self {
            SuccessAction::Aes { data } => {
                data.validate()?;
                Ok(SuccessAction::Aes { data })
            }
            SuccessAction::Message { data } => {
                data.validate()?;
                Ok(SuccessAction::Message { data })
            }
            SuccessAction::Url { data } => Ok(SuccessAction::Url {
                data: data.validate(callback, validate_url)?,
            }),
        }
    }
}

/// Payload of the AES success action, as received from the LNURL endpoint
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AesSuccessActionData {
    /// Contents description, up to 144 characters
    pub description: String,

    /// Base64, AES-encrypted data where encryption key is payment preimage, up to 4kb of characters
    pub ciphertext: String,

    /// Base64, initialization vector, exactly 24 characters
    pub iv: String,
}

impl AesSuccessActionData {
    /// Decrypts the ciphertext as a UTF-8 string, given the key (invoice preimage) parameter.
    pub fn decrypt(&self, key: &[u8; 32]) -> LnurlResult<String> {
        let iv = BASE64_STANDARD.decode(&self.iv)?;
        let ciphertext = BASE64_STANDARD.decode(&self.ciphertext)?;
        let plaintext_bytes = Aes256CbcDec::new_from_slices(key, &iv)
            .map_err(|e| LnurlError::validation(format!("invalid AES iv: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|e| LnurlError::validation(format!("failed to decrypt: {e}")))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|e| LnurlError::validation(format!("decrypted text is not UTF-8: {e}")))
    }

    /// Encrypts a plaintext with a given key and IV, returning base64.
    pub fn encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &str) -> LnurlResult<String> {
        let ciphertext_bytes = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| LnurlError::validation(format!("invalid AES iv: {e}")))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Ok(BASE64_STANDARD.encode(ciphertext_bytes))
    }

    /// Validates the fields, but does not decrypt and validate the ciphertext.
    pub fn validate(&self) -> LnurlResult<()> {
        ensure_sdk!(
            self.description.len() <= MAX_DESCRIPTION_LEN,
            LnurlError::validation(
                "AES action description length is larger than the maximum allowed"
            )
        );

        ensure_sdk!(
            self.ciphertext.len() <= MAX_CIPHERTEXT_LEN,
            LnurlError::validation(
                "AES action ciphertext length is larger than the maximum allowed"
            )
        );

        BASE64_STANDARD.decode(&self.ciphertext)?;

        ensure_sdk!(
            self.iv.len() == IV_LEN,
            LnurlError::validation("AES action iv has unexpected length")
        );

        BASE64_STANDARD.decode(&self.iv)?;

        Ok(())
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Deserialize, Serialize)]
pub struct MessageSuccessActionData {
    pub message: String,
}

impl MessageSuccessActionData {
    pub fn validate(&self) -> LnurlResult<()> {
        ensure_sdk!(
            self.message.len() <= MAX_DESCRIPTION_LEN,
            LnurlError::validation("Success action message is longer than the maximum allowed length")
        );

        Ok(())
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Deserialize, Serialize)]
pub struct UrlSuccessActionData {
    /// Contents description, up to 144 characters
    pub description: String,

    /// URL of the success action
    pub url: String,

    /// Indicates the success URL domain matches the LNURL callback domain.
    ///
    /// See <https://github.com/lnurl/luds/blob/luds/09.md>
    #[serde(default = "default_true")]
    pub matches_callback_domain: bool,
}

impl UrlSuccessActionData {
    pub fn validate(&self, callback: &str, validate_url: bool) -> LnurlResult<Self> {
        ensure_sdk!(
            self.description.len() <= MAX_DESCRIPTION_LEN,
            LnurlError::validation(
                "Success action description is longer than the maximum allowed length"
            )
        );

        let callback_host = host_of(callback, "callback")?;
        let action_host = host_of(&self.url, "success action url")?;
        let matches_callback_domain = callback_host == action_host;

        ensure_sdk!(
            !validate_url || matches_callback_domain,
            LnurlError::validation(
                "Success Action URL has different domain than the callback domain"
            )
        );

        Ok(Self {
            matches_callback_domain,
            ..self.clone()
        })
    }
}

fn host_of(url: &str, what: &str) -> LnurlResult<String> {
    let url = Url::parse(url).map_err(|e| LnurlError::validation(format!("invalid {what}: {e}")))?;
    url.host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| LnurlError::validation(format!("could not determine {what} domain")))
}
