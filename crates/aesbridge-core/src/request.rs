//! Parse caller input into something a store will accept.
//!
//! Stores trust their callers on lengths. This is where callers earn it.
use crate::job::{BLOCK_LEN, Block};
use crate::text::ascii_to_block;

/// Key lengths accepted on input, in hex characters.
pub const KEY_HEX_LENGTHS: [usize; 3] = [32, 48, 64];

/// Tag used when the caller sends none.
pub const DEFAULT_TAG: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("key must be 32/48/64 hex chars (128/192/256 bits), got {0}")]
    BadKeyLength(usize),
    #[error("block must be 32 hex chars (128-bit block), got {0}")]
    BadBlockLength(usize),
    #[error("{0} is not valid hex")]
    NotHex(&'static str),
    #[error("ASCII plaintext must be at most 16 bytes, got {0}")]
    AsciiTooLong(usize),
    #[error("plaintext is not ASCII")]
    NotAscii,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A validated key/block/tag triple.
pub struct BlockRequest {
    pub key: Vec<u8>,
    pub block: Block,
    pub tag: String,
}

impl BlockRequest {
    /// Validate hex input. Whitespace around fields is ignored, case is not
    /// significant, and a blank token becomes [`DEFAULT_TAG`].
    pub fn parse(key_hex: &str, block_hex: &str, token: Option<&str>) -> Result<Self, RequestError> {
        let key = parse_key(key_hex)?;
        let block_hex = block_hex.trim();
        if block_hex.is_empty() {
            return Err(RequestError::MissingField("block"));
        }
        if block_hex.len() != BLOCK_LEN * 2 {
            return Err(RequestError::BadBlockLength(block_hex.len()));
        }
        let mut block = [0u8; BLOCK_LEN];
        hex::decode_to_slice(block_hex, &mut block).map_err(|_| RequestError::NotHex("block"))?;
        Ok(Self {
            key,
            block,
            tag: normalize_tag(token),
        })
    }

    /// Like [`BlockRequest::parse`], with the block given as ASCII text.
    pub fn from_ascii(key_hex: &str, text: &str, token: Option<&str>) -> Result<Self, RequestError> {
        let key = parse_key(key_hex)?;
        let block = ascii_to_block(text)?;
        Ok(Self {
            key,
            block,
            tag: normalize_tag(token),
        })
    }
}

fn parse_key(key_hex: &str) -> Result<Vec<u8>, RequestError> {
    let key_hex = key_hex.trim();
    if key_hex.is_empty() {
        return Err(RequestError::MissingField("key"));
    }
    if !KEY_HEX_LENGTHS.contains(&key_hex.len()) {
        return Err(RequestError::BadKeyLength(key_hex.len()));
    }
    hex::decode(key_hex).map_err(|_| RequestError::NotHex("key"))
}

fn normalize_tag(token: Option<&str>) -> String {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TAG)
        .to_ascii_uppercase()
}

/// Key wired into the FPGA for a single-hex-digit token.
///
/// Token `t` selects the 128-bit key whose byte `i` is `(t << 4) | i`.
pub fn token_key(token: &str) -> Option<[u8; 16]> {
    let token = token.trim();
    if token.len() != 1 {
        return None;
    }
    let high = u8::from_str_radix(token, 16).ok()? << 4;
    Some(std::array::from_fn(|i| high | i as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090A0B0C0D0E0F";
    const BLOCK: &str = "00112233445566778899AABBCCDDEEFF";

    #[test]
    fn parses_valid_request() {
        let req = BlockRequest::parse(&KEY.to_lowercase(), BLOCK, Some(" a ")).unwrap();
        assert_eq!(req.key, hex::decode(KEY).unwrap());
        assert_eq!(req.block[15], 0xff);
        assert_eq!(req.tag, "A");
    }

    #[test]
    fn token_defaults_to_zero() {
        assert_eq!(BlockRequest::parse(KEY, BLOCK, None).unwrap().tag, "0");
        assert_eq!(BlockRequest::parse(KEY, BLOCK, Some("  ")).unwrap().tag, "0");
    }

    #[test]
    fn accepts_all_key_sizes() {
        for len in KEY_HEX_LENGTHS {
            let key = "ab".repeat(len / 2);
            assert_eq!(BlockRequest::parse(&key, BLOCK, None).unwrap().key.len(), len / 2);
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            BlockRequest::parse("", BLOCK, None),
            Err(RequestError::MissingField("key"))
        );
        assert_eq!(
            BlockRequest::parse("0011", BLOCK, None),
            Err(RequestError::BadKeyLength(4))
        );
        assert_eq!(
            BlockRequest::parse(KEY, "0011", None),
            Err(RequestError::BadBlockLength(4))
        );
        assert_eq!(
            BlockRequest::parse(KEY, &"zz".repeat(16), None),
            Err(RequestError::NotHex("block"))
        );
        assert_eq!(
            BlockRequest::parse(&"g0".repeat(16), BLOCK, None),
            Err(RequestError::NotHex("key"))
        );
    }

    #[test]
    fn ascii_request_packs_text() {
        let req = BlockRequest::from_ascii(KEY, "hi", Some("3")).unwrap();
        assert_eq!(&req.block[..3], b"hi\0");
        assert_eq!(req.tag, "3");
    }

    #[test]
    fn token_keys_follow_fpga_table() {
        assert_eq!(token_key("0").map(hex::encode_upper).as_deref(), Some(KEY));
        assert_eq!(
            token_key("b").map(hex::encode_upper).as_deref(),
            Some("B0B1B2B3B4B5B6B7B8B9BABBBCBDBEBF")
        );
        assert_eq!(token_key("10"), None);
        assert_eq!(token_key("G"), None);
    }
}
