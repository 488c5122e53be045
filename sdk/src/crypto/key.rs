use {
    super::{BASE64, BLOCK_SIZE, IV_LEN, MAC_LEN},
    crate::error::CryptoError,
    aes::{
        Aes128, Block,
        cipher::{BlockDecrypt, BlockEncrypt, KeyInit},
    },
    base64::Engine,
    megalink_protocol::{FILE_KEY_B64_LEN, FOLDER_KEY_B64_LEN},
    std::fmt,
};

const PACKED_FILE_KEY_LEN: usize = 32;

/// Resolved key material of a node. `iv` and `mac` are only meaningful for files.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NodeKey {
    pub key: [u8; BLOCK_SIZE],
    pub iv: [u8; IV_LEN],
    pub mac: [u8; MAC_LEN],
}

impl fmt::Debug for NodeKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKey").finish_non_exhaustive()
    }
}

impl NodeKey {
    #[must_use]
    #[inline]
    pub fn folder(key: [u8; BLOCK_SIZE]) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Parses a decrypted 16-byte folder key.
    #[inline]
    pub fn from_folder_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::folder(to_array(raw)?))
    }

    /// Unpacks a decrypted 32-byte file key.
    #[inline]
    pub fn from_file_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        Ok(unpack_key(&to_array(raw)?))
    }

    /// Parses the key component of a file link.
    #[inline]
    pub fn from_file_link_key(key: &str) -> Result<Self, CryptoError> {
        if key.len() != FILE_KEY_B64_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: FILE_KEY_B64_LEN,
                actual: key.len(),
            });
        }
        Self::from_file_bytes(&BASE64.decode(key)?)
    }

    /// Initial CTR counter block for the file content.
    #[must_use]
    #[inline]
    pub fn ctr_iv(&self) -> [u8; BLOCK_SIZE] {
        let mut iv = [0; BLOCK_SIZE];
        let (head, _) = iv.split_at_mut(IV_LEN);
        head.copy_from_slice(&self.iv);
        iv
    }
}

fn to_array<const N: usize>(raw: &[u8]) -> Result<[u8; N], CryptoError> {
    raw.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: N,
        actual: raw.len(),
    })
}

/// Splits a packed file key into AES key, IV and MAC.
///
/// The AES key is `raw[0..16] ^ raw[16..32]`, the IV is `raw[16..24]`
/// and the MAC is `raw[24..32]`.
#[must_use]
#[inline]
pub fn unpack_key(raw: &[u8; PACKED_FILE_KEY_LEN]) -> NodeKey {
    let (low, high) = raw.split_at(BLOCK_SIZE);
    let (iv, mac) = high.split_at(IV_LEN);
    let mut node_key = NodeKey::default();
    for (out, (a, b)) in node_key.key.iter_mut().zip(low.iter().zip(high)) {
        *out = a ^ b;
    }
    node_key.iv.copy_from_slice(iv);
    node_key.mac.copy_from_slice(mac);
    node_key
}

/// Key component of a folder link. Decrypts the keys of the listed nodes.
#[derive(Clone)]
pub struct MasterKey {
    cipher: Aes128,
}

impl fmt::Debug for MasterKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

impl MasterKey {
    #[must_use]
    #[inline]
    pub fn new(key: &[u8; BLOCK_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(key.into()),
        }
    }

    /// Parses the key component of a folder link.
    #[inline]
    pub fn from_folder_link_key(key: &str) -> Result<Self, CryptoError> {
        if key.len() != FOLDER_KEY_B64_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: FOLDER_KEY_B64_LEN,
                actual: key.len(),
            });
        }
        let raw = BASE64.decode(key)?;
        Ok(Self::new(&to_array(&raw)?))
    }

    /// ECB decryption without padding: each block is decrypted on its own.
    #[inline]
    pub fn decrypt_node_key(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if !ciphertext.len().is_multiple_of(BLOCK_SIZE) {
            return Err(CryptoError::MisalignedCiphertext {
                len: ciphertext.len(),
            });
        }
        let mut blocks: Vec<Block> = ciphertext
            .chunks_exact(BLOCK_SIZE)
            .map(Block::clone_from_slice)
            .collect();
        self.cipher.decrypt_blocks(&mut blocks);
        Ok(blocks.iter().flatten().copied().collect())
    }

    /// Inverse of [`MasterKey::decrypt_node_key`].
    #[inline]
    pub fn encrypt_node_key(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if !plaintext.len().is_multiple_of(BLOCK_SIZE) {
            return Err(CryptoError::MisalignedCiphertext {
                len: plaintext.len(),
            });
        }
        let mut blocks: Vec<Block> = plaintext
            .chunks_exact(BLOCK_SIZE)
            .map(Block::clone_from_slice)
            .collect();
        self.cipher.encrypt_blocks(&mut blocks);
        Ok(blocks.iter().flatten().copied().collect())
    }
}
