//! Parsing and transport decoding of a single `<item>` record.
//!
//! An item looks like
//! `<item><type>636f7265</type><code>6173616c</code><length>10</length><data encoding="base64">QWJiZXkgUm9hZA==</data></item>`.
//! `type` and `code` are hex encoded ASCII, `data` is standard base64 and
//! `length` is advisory only. Field decoding is best effort: a bad field
//! decodes to empty and the failure is kept on the result as a [`FieldIssue`].

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::error::{FieldError, WrapperError};

/// An item as it appears on the wire, before transport decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename = "item")]
pub struct Item {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub code: String,
    /// Kept as text; a bad length never costs the whole item
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Type,
    Code,
    Length,
    Data,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Type => "type",
            Field::Code => "code",
            Field::Length => "length",
            Field::Data => "data",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: Field,
    pub error: FieldError,
}

/// An item after hex/base64 decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedItem {
    /// Usually `core` (DAAP fields) or `ssnc` (player events)
    pub kind: String,
    pub code: String,
    pub length: i64,
    pub data: Vec<u8>,
    /// Fields that failed to decode and were replaced with empty values
    pub issues: Vec<FieldIssue>,
}

impl DecodedItem {
    /// Payload as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// First four payload bytes as a big-endian integer.
    pub fn be_u32(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(..4)?.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }
}

/// Parse and decode one record in a single step.
pub fn decode(record: &str) -> Result<DecodedItem, WrapperError> {
    parse_item(record).map(|item| decode_item(&item))
}

/// Deserialize the `<item>` element. Sub-elements may come in any order;
/// missing ones are left empty and unknown ones are ignored.
pub fn parse_item(record: &str) -> Result<Item, WrapperError> {
    let record = record.trim_start();
    let root = record.strip_prefix("<item").ok_or(WrapperError::MissingItem)?;
    if !root.starts_with(|c: char| c == '>' || c == '/' || c.is_ascii_whitespace()) {
        return Err(WrapperError::MissingItem);
    }

    serde_xml_rs::from_str(record).map_err(|e| WrapperError::Xml(e.to_string()))
}

/// Transport-decode an item. Never fails; see [`DecodedItem::issues`].
pub fn decode_item(item: &Item) -> DecodedItem {
    let mut issues = Vec::new();
    let mut note = |field: Field, error: FieldError| issues.push(FieldIssue { field, error });

    let kind = decode_hex_text(item.kind.trim()).unwrap_or_else(|error| {
        note(Field::Type, error);
        String::new()
    });
    let code = decode_hex_text(item.code.trim()).unwrap_or_else(|error| {
        note(Field::Code, error);
        String::new()
    });
    let length = parse_length(&item.length).unwrap_or_else(|error| {
        note(Field::Length, error);
        0
    });
    let data = decode_base64(&item.data).unwrap_or_else(|error| {
        note(Field::Data, error);
        Vec::new()
    });

    DecodedItem {
        kind,
        code,
        length,
        data,
        issues,
    }
}

/// Advisory length; empty means zero.
fn parse_length(text: &str) -> Result<i64, FieldError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse()
        .map_err(|_| FieldError::InvalidLength(text.to_string()))
}

/// Decode a hex string; `2n` digits give `n` bytes.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, FieldError> {
    let digits = text.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(FieldError::OddHexLength(digits.len()));
    }

    let nibble = |offset: usize| {
        (digits[offset] as char)
            .to_digit(16)
            .map(|value| value as u8)
            .ok_or(FieldError::InvalidHexDigit(offset))
    };

    (0..digits.len())
        .step_by(2)
        .map(|offset| Ok(nibble(offset)? << 4 | nibble(offset + 1)?))
        .collect()
}

/// Decode a hex string into text, replacing invalid UTF-8.
pub fn decode_hex_text(text: &str) -> Result<String, FieldError> {
    decode_hex(text).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode standard (padded) base64, ignoring line breaks inside the payload.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, FieldError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| FieldError::Base64(e.to_string()))
}
