//! Turn whatever the device sent back into canonical hex.
//!
//! Device firmware is inconsistent: some builds print bare hex, some wrap it
//! in JSON under one of a handful of field names, most add line endings.
//! Normalization never fails. Garbage degrades to a short or empty value that
//! then fails validation on its own.
use serde::Serialize;

use crate::job::Direction;

/// Field names tried, in order, when an encrypt reply is a JSON object.
pub const ENCRYPT_FIELDS: &[&str] = &["ct", "ctHex", "pt", "ptHex"];
/// Field names tried, in order, when a decrypt reply is a JSON object.
pub const DECRYPT_FIELDS: &[&str] = &["pt", "ptHex", "ct", "ctHex"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
/// Uppercase hex digits only. No separators, possibly empty or odd-length.
pub struct CanonicalHex(String);

impl CanonicalHex {
    /// Strip every non-hex character and uppercase the rest.
    pub fn clean(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(char::is_ascii_hexdigit)
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode complete digit pairs; a dangling final nibble is dropped.
    pub fn to_bytes(&self) -> Vec<u8> {
        let even = &self.0[..self.0.len() & !1];
        hex::decode(even).unwrap_or_default()
    }
}

impl std::fmt::Display for CanonicalHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn candidate_fields(direction: Direction) -> &'static [&'static str] {
    match direction {
        Direction::Encrypt => ENCRYPT_FIELDS,
        Direction::Decrypt => DECRYPT_FIELDS,
    }
}

/// Normalize a raw device reply for a job of the given direction.
pub fn normalize_response(direction: Direction, raw: &str) -> CanonicalHex {
    let trimmed = raw.trim();
    let field = if trimmed.starts_with('{') {
        extract_field(candidate_fields(direction), trimmed)
    } else {
        None
    };
    CanonicalHex::clean(field.as_deref().unwrap_or(trimmed))
}

fn extract_field(candidates: &[&str], payload: &str) -> Option<String> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(payload).ok()?;
    candidates.iter().find_map(|candidate| {
        object
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(candidate))
            .find_map(|(_, value)| field_text(value))
    })
}

// Empty strings and non-scalar values count as absent.
fn field_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if !text.is_empty() => Some(text.clone()),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_input_is_unchanged() {
        let canonical = "69C4E0D86A7B0430D8CDB78070B4C55A";
        assert_eq!(
            normalize_response(Direction::Encrypt, canonical).as_str(),
            canonical
        );
    }

    #[test]
    fn extracts_json_field() {
        let out = normalize_response(Direction::Encrypt, r#"{"ct":"deadbeef"}"#);
        assert_eq!(out.as_str(), "DEADBEEF");
        let out = normalize_response(Direction::Decrypt, r#"{"ct":"deadbeef"}"#);
        assert_eq!(out.as_str(), "DEADBEEF");
    }

    #[test]
    fn field_names_match_case_insensitively() {
        let out = normalize_response(Direction::Decrypt, r#" {"PTHEX": "00 11 22"} "#);
        assert_eq!(out.as_str(), "001122");
    }

    #[test]
    fn direction_decides_priority() {
        let payload = r#"{"pt":"0011","ct":"AABB"}"#;
        assert_eq!(normalize_response(Direction::Encrypt, payload).as_str(), "AABB");
        assert_eq!(normalize_response(Direction::Decrypt, payload).as_str(), "0011");
    }

    #[test]
    fn empty_field_falls_through_to_next_candidate() {
        let payload = r#"{"ct":"","ctHex":"abcd"}"#;
        assert_eq!(normalize_response(Direction::Encrypt, payload).as_str(), "ABCD");
    }

    #[test]
    fn broken_json_falls_back_to_whole_payload() {
        let out = normalize_response(Direction::Encrypt, "{ct: 12ab");
        assert_eq!(out.as_str(), "C12AB");
    }

    #[test]
    fn object_without_candidates_uses_whole_payload() {
        let out = normalize_response(Direction::Encrypt, r#"{"out":"99"}"#);
        assert_eq!(out.as_str(), "99");
    }

    #[test]
    fn strips_noise_and_line_endings() {
        let out = normalize_response(Direction::Encrypt, "CT= 69c4 e0d8\r\n");
        assert_eq!(out.as_str(), "C69C4E0D8");
        assert!(normalize_response(Direction::Decrypt, "   \r\n").is_empty());
        assert!(normalize_response(Direction::Decrypt, "").is_empty());
    }

    #[test]
    fn numeric_field_is_accepted() {
        let out = normalize_response(Direction::Decrypt, r#"{"pt":1234}"#);
        assert_eq!(out.as_str(), "1234");
    }

    #[test]
    fn bytes_drop_dangling_nibble() {
        let hex = CanonicalHex::clean("abc");
        assert_eq!(hex.to_bytes(), vec![0xab]);
        assert_eq!(CanonicalHex::clean(&"11".repeat(16)).to_bytes(), vec![0x11; 16]);
    }
}
