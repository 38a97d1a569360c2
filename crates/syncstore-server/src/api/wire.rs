//! JSON shapes exchanged over HTTP
//!
//! Hashes and public keys travel as lowercase hex, ciphertext and
//! signatures as standard base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use syncstore_core::{Entry, PathHash, StoreError};

/// An entry tree as returned by `GET`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub path: String,
    pub parent: Option<String>,
    #[serde(default)]
    pub data: String,
    pub timestamp: i64,
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<WireEntry>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unchanged: bool,
}

impl From<&Entry> for WireEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            path: entry.path.to_hex(),
            parent: entry.parent.map(|p| p.to_hex()),
            data: BASE64.encode(&entry.data),
            timestamp: entry.timestamp,
            has_children: entry.has_children,
            entries: entry.children.iter().map(WireEntry::from).collect(),
            signature: BASE64.encode(&entry.signature),
            public_key: hex::encode(&entry.public_key),
            unchanged: entry.unchanged,
        }
    }
}

impl WireEntry {
    pub fn into_entry(self) -> Result<Entry, StoreError> {
        let children = self
            .entries
            .into_iter()
            .map(WireEntry::into_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Entry {
            path: PathHash::from_hex(&self.path)?,
            parent: self.parent.as_deref().map(PathHash::from_hex).transpose()?,
            data: decode_base64("data", &self.data)?,
            timestamp: self.timestamp,
            has_children: self.has_children,
            children,
            signature: decode_base64("signature", &self.signature)?,
            public_key: decode_hex("public_key", &self.public_key)?,
            unchanged: self.unchanged,
        })
    }
}

/// Body of `POST /account/{account}/store/{path}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRequest {
    pub path: String,
    pub parent: Option<String>,
    /// Sealed value
    pub value: String,
    pub signature: String,
    pub public_key: String,
}

impl PutRequest {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            path: entry.path.to_hex(),
            parent: entry.parent.map(|p| p.to_hex()),
            value: BASE64.encode(&entry.data),
            signature: BASE64.encode(&entry.signature),
            public_key: hex::encode(&entry.public_key),
        }
    }

    pub fn into_entry(self) -> Result<Entry, StoreError> {
        let path = PathHash::from_hex(&self.path)?;
        let parent = self.parent.as_deref().map(PathHash::from_hex).transpose()?;
        Ok(Entry::new(path, parent, decode_base64("value", &self.value)?).with_signature(
            decode_base64("signature", &self.signature)?,
            decode_hex("public_key", &self.public_key)?,
        ))
    }
}

/// Returned by `POST` and `DELETE`: the timestamp the change was stamped with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub path: String,
    pub timestamp: i64,
}

fn decode_base64(field: &str, s: &str) -> Result<Vec<u8>, StoreError> {
    BASE64
        .decode(s)
        .map_err(|e| StoreError::InvalidInput(format!("{} is not valid base64: {}", field, e)))
}

fn decode_hex(field: &str, s: &str) -> Result<Vec<u8>, StoreError> {
    hex::decode(s).map_err(|e| StoreError::InvalidInput(format!("{} is not valid hex: {}", field, e)))
}
