//! Hybrid key exchange for room keys.
//!
//! Every room owns one RSA key pair. When a member joins, the server encrypts
//! the room's PEM-encoded public and private keys under the member's own
//! public key and ships both as hex. RSA can only encrypt
//! `modulus_bytes - 11` bytes at a time with PKCS#1 v1.5 padding, so payloads
//! are cut into fixed-size chunks, each chunk is encrypted on its own, and the
//! resulting blocks are concatenated. Decryption walks the ciphertext one
//! modulus-sized block at a time.
//!
//! The same chunked scheme is used by peers for chat text under the room key.

use std::fmt;

use rsa::{
    Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding},
    traits::PublicKeyParts,
};
use thiserror::Error;

/// Default RSA modulus size for room and peer keys.
pub const DEFAULT_KEY_BITS: usize = 1024;

/// Bytes consumed by PKCS#1 v1.5 encryption padding in every block.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Errors raised while generating, encoding or using key material.
#[derive(Debug, Error)]
pub enum KeyExchangeError {
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] rsa::Error),

    #[error("encryption failed: {0}")]
    Encryption(#[source] rsa::Error),

    #[error("decryption failed: {0}")]
    Decryption(#[source] rsa::Error),

    #[error("ciphertext length {length} is not a multiple of the {block}-byte block size")]
    MalformedCiphertext { length: usize, block: usize },

    #[error("key of {bits} bits is too small for PKCS#1 v1.5 encryption")]
    KeyTooSmall { bits: usize },

    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("decrypted key material is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Largest plaintext chunk a single RSA block can carry for `key`.
pub fn plaintext_block_size(key: &impl PublicKeyParts) -> Result<usize, KeyExchangeError> {
    let size = key.size();
    if size <= PKCS1_V15_OVERHEAD {
        return Err(KeyExchangeError::KeyTooSmall { bits: size * 8 });
    }
    Ok(size - PKCS1_V15_OVERHEAD)
}

/// Encrypt an arbitrary-length payload under `recipient`.
///
/// An empty payload still produces one block (an encrypted empty chunk).
pub fn encrypt(plaintext: &[u8], recipient: &RsaPublicKey) -> Result<Vec<u8>, KeyExchangeError> {
    let block = plaintext_block_size(recipient)?;
    let mut rng = rand::thread_rng();

    if plaintext.is_empty() {
        return recipient
            .encrypt(&mut rng, Pkcs1v15Encrypt, &[])
            .map_err(KeyExchangeError::Encryption);
    }

    let mut ciphertext = Vec::with_capacity(plaintext.len().div_ceil(block) * recipient.size());
    for chunk in plaintext.chunks(block) {
        let sealed = recipient
            .encrypt(&mut rng, Pkcs1v15Encrypt, chunk)
            .map_err(KeyExchangeError::Encryption)?;
        ciphertext.extend_from_slice(&sealed);
    }
    Ok(ciphertext)
}

/// Decrypt a payload produced by [`encrypt`] with the matching private key.
pub fn decrypt(ciphertext: &[u8], own: &RsaPrivateKey) -> Result<Vec<u8>, KeyExchangeError> {
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }

    let stride = own.size();
    if ciphertext.len() % stride != 0 {
        return Err(KeyExchangeError::MalformedCiphertext {
            length: ciphertext.len(),
            block: stride,
        });
    }

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for block in ciphertext.chunks(stride) {
        let opened = own
            .decrypt(Pkcs1v15Encrypt, block)
            .map_err(KeyExchangeError::Decryption)?;
        plaintext.extend_from_slice(&opened);
    }
    Ok(plaintext)
}

/// [`encrypt`], then lowercase hex as carried in JSON frames.
pub fn encrypt_to_hex(plaintext: &[u8], recipient: &RsaPublicKey) -> Result<String, KeyExchangeError> {
    Ok(hex::encode(encrypt(plaintext, recipient)?))
}

/// Hex-decode a frame field, then [`decrypt`].
pub fn decrypt_hex(ciphertext_hex: &str, own: &RsaPrivateKey) -> Result<Vec<u8>, KeyExchangeError> {
    let ciphertext = hex::decode(ciphertext_hex)?;
    decrypt(&ciphertext, own)
}

/// Parse a PKCS#1 PEM public key as sent in `JOIN_ROOM`.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, KeyExchangeError> {
    RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| KeyExchangeError::InvalidKey(e.to_string()))
}

/// An RSA key pair, used both as a peer identity and as a room key.
#[derive(Clone)]
pub struct KeyPair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a fresh key pair. CPU-bound; call from a blocking context.
    pub fn generate(bits: usize) -> Result<Self, KeyExchangeError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(KeyExchangeError::KeyGeneration)?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { public, private })
    }

    /// Rebuild a key pair from its PKCS#1 PEM halves.
    pub fn from_pem(public_pem: &str, private_pem: &str) -> Result<Self, KeyExchangeError> {
        let public = parse_public_key_pem(public_pem)?;
        let private = RsaPrivateKey::from_pkcs1_pem(private_pem)
            .map_err(|e| KeyExchangeError::InvalidKey(e.to_string()))?;
        if RsaPublicKey::from(&private) != public {
            return Err(KeyExchangeError::InvalidKey(
                "public key does not belong to private key".to_string(),
            ));
        }
        Ok(Self { public, private })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn modulus_bits(&self) -> usize {
        self.public.n().bits()
    }

    /// PKCS#1 PEM text of the public half.
    pub fn public_key_pem(&self) -> Result<String, KeyExchangeError> {
        self.public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyExchangeError::InvalidKey(e.to_string()))
    }

    /// PKCS#1 PEM text of the private half.
    pub fn private_key_pem(&self) -> Result<String, KeyExchangeError> {
        let pem = self
            .private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyExchangeError::InvalidKey(e.to_string()))?;
        Ok(String::from(pem.as_str()))
    }

    /// Encrypt both PEM halves under `recipient` for delivery in a join reply.
    pub fn seal_for(&self, recipient: &RsaPublicKey) -> Result<SealedKeyPair, KeyExchangeError> {
        Ok(SealedKeyPair {
            public_key: encrypt_to_hex(self.public_key_pem()?.as_bytes(), recipient)?,
            private_key: encrypt_to_hex(self.private_key_pem()?.as_bytes(), recipient)?,
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &self.modulus_bits())
            .finish_non_exhaustive()
    }
}

/// A key pair encrypted for one recipient, as hex ciphertext of each PEM half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl SealedKeyPair {
    /// Decrypt both halves with the recipient's own private key.
    pub fn open(&self, own: &RsaPrivateKey) -> Result<KeyPair, KeyExchangeError> {
        let public_pem = String::from_utf8(decrypt_hex(&self.public_key, own)?)?;
        let private_pem = String::from_utf8(decrypt_hex(&self.private_key, own)?)?;
        KeyPair::from_pem(&public_pem, &private_pem)
    }
}
