//! Software reference for single-block AES-ECB, no padding.
//!
//! Every device answer is judged against this, so it must be byte-exact.
use aes::cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit, consts::U16};
use aes::{Aes128, Aes192, Aes256};

use crate::job::{BLOCK_LEN, Block, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// Key is not 16, 24 or 32 bytes.
    #[error("unsupported AES key size: {} bits", .0 * 8)]
    UnsupportedKeySize(usize),
    /// Input is not exactly one block.
    #[error("input must be 16 bytes, got {0}")]
    InvalidBlockLength(usize),
}

/// Encrypt or decrypt one block with a 128/192/256-bit key.
pub fn transform(direction: Direction, key: &[u8], block: &[u8]) -> Result<Block, CipherError> {
    let block: Block = block
        .try_into()
        .map_err(|_| CipherError::InvalidBlockLength(block.len()))?;
    match key.len() {
        16 => apply::<Aes128>(direction, key, block),
        24 => apply::<Aes192>(direction, key, block),
        32 => apply::<Aes256>(direction, key, block),
        other => Err(CipherError::UnsupportedKeySize(other)),
    }
}

pub fn encrypt_block(key: &[u8], block: &[u8]) -> Result<Block, CipherError> {
    transform(Direction::Encrypt, key, block)
}

pub fn decrypt_block(key: &[u8], block: &[u8]) -> Result<Block, CipherError> {
    transform(Direction::Decrypt, key, block)
}

fn apply<C>(direction: Direction, key: &[u8], block: Block) -> Result<Block, CipherError>
where
    C: KeyInit + BlockEncrypt + BlockDecrypt + BlockSizeUser<BlockSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::UnsupportedKeySize(key.len()))?;
    let mut buf = aes::Block::clone_from_slice(&block);
    match direction {
        Direction::Encrypt => cipher.encrypt_block(&mut buf),
        Direction::Decrypt => cipher.decrypt_block(&mut buf),
    }
    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&buf);
    Ok(out)
}
