//! Cipher primitives of the link protocol. Everything is AES-128.
//!
//! A public link carries a master key. Folder links use it to decrypt the key of each
//! listed node with ECB (one independent block at a time). A file node key is 32 bytes
//! and is unpacked into an AES key (XOR of both halves), an 8-byte IV and an 8-byte MAC.
//! A folder node key is used as is.
//!
//! Node attributes are a base64 blob, CBC-encrypted with a zero IV, which decrypts to
//! `MEGA` followed by a JSON object padded with NUL bytes to the block size.
//!
//! File content is encrypted with CTR. The initial 128-bit big-endian counter is the
//! file IV followed by 8 zero bytes, so decryption can start at any byte offset by
//! advancing the counter by whole blocks and discarding the remainder of a block.

mod attr;
mod ctr;
mod key;

pub use self::{
    attr::{Attribute, decrypt_attribute, encrypt_attribute},
    ctr::{Aes128Ctr, advance_counter, ctr_seek},
    key::{MasterKey, NodeKey, unpack_key},
};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

pub const BLOCK_SIZE: usize = 16;
pub const IV_LEN: usize = 8;
pub const MAC_LEN: usize = 8;

/// URL-safe base64 without padding, as used for keys and attributes.
pub const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);
