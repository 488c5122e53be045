use {
    super::BLOCK_SIZE,
    aes::{
        Aes128,
        cipher::{KeyIvInit, StreamCipher},
    },
};

pub type Aes128Ctr = ctr::Ctr128BE<Aes128>;

const BLOCK_SIZE_U64: u64 = 16;

/// Advances a big-endian 128-bit counter by the number of whole blocks before `offset`.
///
/// The carry from the low 64-bit word propagates into the high word; the counter
/// wraps around at 2^128 like the keystream does.
#[must_use]
#[inline]
pub fn advance_counter(iv: &[u8; BLOCK_SIZE], offset: u64) -> [u8; BLOCK_SIZE] {
    let blocks = offset.checked_div(BLOCK_SIZE_U64).unwrap_or_default();
    u128::from_be_bytes(*iv)
        .wrapping_add(u128::from(blocks))
        .to_be_bytes()
}

/// Creates a CTR keystream positioned at byte `offset` of the stream that starts at `iv`.
#[must_use]
#[inline]
pub fn ctr_seek(key: &[u8; BLOCK_SIZE], iv: &[u8; BLOCK_SIZE], offset: u64) -> Aes128Ctr {
    if offset == 0 {
        return Aes128Ctr::new(key.into(), iv.into());
    }
    let counter = advance_counter(iv, offset);
    let mut cipher = Aes128Ctr::new(key.into(), (&counter).into());
    let skip = offset.checked_rem(BLOCK_SIZE_U64).unwrap_or_default();
    if skip > 0 {
        let mut discarded = [0; BLOCK_SIZE];
        // `skip` is below the block size.
        if let Some(partial) = usize::try_from(skip)
            .ok()
            .and_then(|skip| discarded.get_mut(..skip))
        {
            cipher.apply_keystream(partial);
        }
    }
    cipher
}
