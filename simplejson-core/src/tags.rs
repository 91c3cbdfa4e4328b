//! Ad-hoc filter tag keys and values
//!
//! Both are closed sum types so that adding a new key or value kind is a
//! deliberate change to the wire protocol. Keys encode as
//! `{"type": "string", "text": "host"}` and values as `{"text": "web-1"}`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SimpleJsonError, SimpleJsonResult};

/// A key that ad-hoc filters can be built on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TagKey {
    String { text: String },
}

/// A candidate value for a tag key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    String { text: String },
}

impl TagKey {
    /// Create a string-typed tag key
    pub fn string<S: Into<String>>(name: S) -> Self {
        TagKey::String { text: name.into() }
    }

    /// The wire `type` tag of this key
    pub fn type_tag(&self) -> &'static str {
        match self {
            TagKey::String { .. } => "string",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TagKey::String { text } => text,
        }
    }
}

impl TagValue {
    /// Create a string tag value
    pub fn string<S: Into<String>>(value: S) -> Self {
        TagValue::String { text: value.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            TagValue::String { text } => text,
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag(), self.name())
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Decode a wire tag key, rejecting unknown key types explicitly
pub fn decode_tag_key(value: serde_json::Value) -> SimpleJsonResult<TagKey> {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("string") => Ok(serde_json::from_value(value)?),
        Some(other) => Err(SimpleJsonError::InvalidTagType(other.to_string())),
        None => Err(SimpleJsonError::decode("tag key is missing its type")),
    }
}
