//! Human-readable views of blocks.
use crate::job::{BLOCK_LEN, Block};
use crate::normalize::CanonicalHex;
use crate::request::RequestError;

/// Decode hex pairs to characters and drop trailing NUL/space padding.
///
/// Bytes map to the Latin-1 code point of the same value, so every input has
/// a rendering.
pub fn hex_to_ascii(hex: &str) -> String {
    let text: String = CanonicalHex::clean(hex)
        .to_bytes()
        .into_iter()
        .map(char::from)
        .collect();
    text.trim_end_matches(['\0', ' ']).to_owned()
}

/// Pack up to one block of ASCII text, NUL-padded on the right.
pub fn ascii_to_block(text: &str) -> Result<Block, RequestError> {
    if !text.is_ascii() {
        return Err(RequestError::NotAscii);
    }
    let bytes = text.as_bytes();
    if bytes.len() > BLOCK_LEN {
        return Err(RequestError::AsciiTooLong(bytes.len()));
    }
    let mut block = [0u8; BLOCK_LEN];
    block[..bytes.len()].copy_from_slice(bytes);
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_trims_padding() {
        let block = ascii_to_block("HELLO FPGA").unwrap();
        let hex = hex::encode_upper(block);
        assert_eq!(hex_to_ascii(&hex), "HELLO FPGA");
    }

    #[test]
    fn trailing_spaces_are_padding() {
        assert_eq!(hex_to_ascii("4869202020"), "Hi");
    }

    #[test]
    fn high_bytes_render_as_latin1() {
        assert_eq!(hex_to_ascii("41E9"), "A\u{e9}");
    }

    #[test]
    fn empty_and_odd_input() {
        assert_eq!(hex_to_ascii(""), "");
        assert_eq!(hex_to_ascii("414"), "A");
    }

    #[test]
    fn rejects_oversized_or_non_ascii_text() {
        assert_eq!(
            ascii_to_block("seventeen chars!!"),
            Err(RequestError::AsciiTooLong(17))
        );
        assert_eq!(ascii_to_block("caf\u{e9}"), Err(RequestError::NotAscii));
        assert_eq!(ascii_to_block("").unwrap(), [0u8; 16]);
    }
}
