use {
    super::{BASE64, BLOCK_SIZE},
    crate::error::CryptoError,
    aes::Aes128,
    base64::Engine,
    cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding},
    serde::{Deserialize, Serialize},
};

const MAGIC: &[u8; 4] = b"MEGA";
const ZERO_IV: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Decrypted node attributes. Only the display name is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "n", default)]
    pub name: String,
}

/// Decodes and decrypts an attribute blob.
///
/// A missing `MEGA` prefix (wrong key or corrupted data) is reported as
/// [`CryptoError::BadMagic`], separately from a JSON parse failure.
#[inline]
pub fn decrypt_attribute(
    ciphertext_b64: &str,
    key: &[u8; BLOCK_SIZE],
) -> Result<Attribute, CryptoError> {
    let mut data = BASE64.decode(ciphertext_b64)?;
    let len = data.len();
    if !len.is_multiple_of(BLOCK_SIZE) {
        return Err(CryptoError::MisalignedCiphertext { len });
    }
    let plaintext = cbc::Decryptor::<Aes128>::new(key.into(), (&ZERO_IV).into())
        .decrypt_padded_mut::<NoPadding>(&mut data)
        .map_err(|_| CryptoError::MisalignedCiphertext { len })?;

    let Some(json) = plaintext.strip_prefix(MAGIC) else {
        let prefix = plaintext.get(..MAGIC.len()).unwrap_or(plaintext);
        return Err(CryptoError::BadMagic {
            prefix: hex::encode(prefix),
        });
    };
    let end = json
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |pos| pos.saturating_add(1));
    serde_json::from_slice(json.get(..end).unwrap_or_default())
        .map_err(CryptoError::AttributeParse)
}

/// Produces the wire form accepted by [`decrypt_attribute`].
#[inline]
pub fn encrypt_attribute(
    attribute: &Attribute,
    key: &[u8; BLOCK_SIZE],
) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(attribute).map_err(CryptoError::AttributeParse)?;
    let mut data = MAGIC.to_vec();
    data.extend_from_slice(&json);
    let padded_len = data.len().next_multiple_of(BLOCK_SIZE);
    data.resize(padded_len, 0);
    let ciphertext = cbc::Encryptor::<Aes128>::new(key.into(), (&ZERO_IV).into())
        .encrypt_padded_mut::<NoPadding>(&mut data, padded_len)
        .map_err(|_| CryptoError::MisalignedCiphertext { len: padded_len })?;
    Ok(BASE64.encode(ciphertext))
}
