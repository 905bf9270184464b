use base64::{Engine, prelude::BASE64_STANDARD};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{LnurlError, LnurlResult};

const TEXT_PLAIN: &str = "text/plain";
const TEXT_LONG_DESC: &str = "text/long-desc";
const IMAGE_PNG: &str = "image/png;base64";
const IMAGE_JPEG: &str = "image/jpeg;base64";
const TEXT_IDENTIFIER: &str = "text/identifier";
const TEXT_EMAIL: &str = "text/email";

/// A `[contentType, value]` pair of LNURL-pay metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataEntry {
    pub content_type: String,
    pub value: String,
}

/// LNURL-pay metadata, as per <https://github.com/lnurl/luds/blob/luds/06.md>
///
/// The raw string is kept exactly as the service sent it, since the invoice
/// description hash commits to those bytes. Typed accessors read the parsed
/// entries, where a repeated content type resolves to its last occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    raw: String,
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    pub fn parse(raw: &str) -> LnurlResult<Self> {
        let items: Vec<serde_json::Value> = serde_json::from_str(raw)
            .map_err(|e| LnurlError::validation(format!("invalid metadata: {e}")))?;

        // Anything other than a pair of strings stays in `raw` only
        let entries = items
            .iter()
            .filter_map(|item| {
                let [content_type, value, ..] = item.as_array()?.as_slice() else {
                    return None;
                };
                Some(MetadataEntry {
                    content_type: content_type.as_str()?.to_string(),
                    value: value.as_str()?.to_string(),
                })
            })
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            entries,
        })
    }

    pub fn builder(description: impl Into<String>) -> MetadataBuilder {
        MetadataBuilder {
            description: description.into(),
            ..Default::default()
        }
    }

    /// The metadata string the hash is computed over.
    pub fn encoded(&self) -> &str {
        &self.raw
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    /// Hex encoded `sha256(metadata)`
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.raw.as_bytes()))
    }

    /// Hex encoded `sha256(metadata || payer_data_json)`, as per LUD-18.
    pub fn hash_with_payer_data(&self, payer_data_json: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw.as_bytes());
        hasher.update(payer_data_json.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn description(&self) -> Option<&str> {
        self.find(&[TEXT_PLAIN]).map(|e| e.value.as_str())
    }

    pub fn long_description(&self) -> Option<&str> {
        self.find(&[TEXT_LONG_DESC]).map(|e| e.value.as_str())
    }

    pub fn image(&self) -> Option<MetadataImage<'_>> {
        self.find(&[IMAGE_PNG, IMAGE_JPEG]).map(|e| MetadataImage {
            content_type: &e.content_type,
            data: &e.value,
        })
    }

    /// The lightning address (LUD-16) or email the metadata is bound to.
    pub fn identifier(&self) -> Option<MetadataIdentifier<'_>> {
        self.find(&[TEXT_IDENTIFIER, TEXT_EMAIL])
            .map(|e| MetadataIdentifier {
                address: &e.value,
                is_email: e.content_type == TEXT_EMAIL,
            })
    }

    fn find(&self, content_types: &[&str]) -> Option<&MetadataEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| content_types.contains(&e.content_type.as_str()))
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataImage<'a> {
    /// `image/png;base64` or `image/jpeg;base64`
    pub content_type: &'a str,
    /// Base64 encoded image
    pub data: &'a str,
}

impl MetadataImage<'_> {
    pub fn bytes(&self) -> LnurlResult<Vec<u8>> {
        Ok(BASE64_STANDARD.decode(self.data)?)
    }

    /// `png` or `jpeg`
    pub fn extension(&self) -> &str {
        self.content_type
            .split_once('/')
            .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype))
            .unwrap_or_default()
    }

    pub fn data_uri(&self) -> String {
        format!("data:{},{}", self.content_type, self.data)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataIdentifier<'a> {
    pub address: &'a str,
    pub is_email: bool,
}

/// Builds metadata in the canonical order: description, long description,
/// image, identifier.
#[derive(Clone, Debug, Default)]
pub struct MetadataBuilder {
    description: String,
    long_description: Option<String>,
    image: Option<(String, Vec<u8>)>,
    identifier: Option<(String, bool)>,
}

impl MetadataBuilder {
    pub fn long_description(mut self, long_description: impl Into<String>) -> Self {
        self.long_description = Some(long_description.into());
        self
    }

    /// `extension` is `png` or `jpeg`
    pub fn image(mut self, extension: &str, bytes: Vec<u8>) -> Self {
        self.image = Some((extension.to_string(), bytes));
        self
    }

    pub fn identifier(mut self, address: impl Into<String>, is_email: bool) -> Self {
        self.identifier = Some((address.into(), is_email));
        self
    }

    pub fn build(self) -> Metadata {
        let mut entries = vec![entry(TEXT_PLAIN, self.description)];
        if let Some(long_description) = self.long_description
            && !long_description.is_empty()
        {
            entries.push(entry(TEXT_LONG_DESC, long_description));
        }
        if let Some((extension, bytes)) = self.image {
            entries.push(entry(
                &format!("image/{extension};base64"),
                BASE64_STANDARD.encode(bytes),
            ));
        }
        if let Some((address, is_email)) = self.identifier
            && !address.is_empty()
        {
            let content_type = if is_email { TEXT_EMAIL } else { TEXT_IDENTIFIER };
            entries.push(entry(content_type, address));
        }

        let raw = serde_json::Value::Array(
            entries
                .iter()
                .map(|e| serde_json::json!([e.content_type, e.value]))
                .collect(),
        )
        .to_string();

        Metadata { raw, entries }
    }
}

fn entry(content_type: &str, value: String) -> MetadataEntry {
    MetadataEntry {
        content_type: content_type.to_string(),
        value,
    }
}
