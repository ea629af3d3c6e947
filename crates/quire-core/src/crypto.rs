//! Crypto engine
//!
//! Password-based authenticated encryption for record payloads.
//!
//! - Key derivation: PBKDF2-HMAC-SHA256, 100,000 iterations, 256-bit key
//! - Cipher: AES-256-GCM
//! - Every call draws a fresh 16-byte salt and 12-byte nonce
//!
//! The salt and nonce are stored together as a single 28-byte `iv`
//! (`salt || nonce`) next to the ciphertext, so a record can be decrypted
//! from the record itself plus the caller's secret. Keys never persist.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// PBKDF2 iteration count
pub const KDF_ITERATIONS: u32 = 100_000;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the combined `salt || nonce` field
pub const IV_LEN: usize = SALT_LEN + NONCE_LEN;

/// Derived key length (AES-256)
pub const KEY_LEN: usize = 32;

/// A symmetric key derived from a secret and salt
///
/// Usable only by the engine for encrypt/decrypt; the bytes are not
/// exposed outside the crate and are wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(&self.0.into())
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Ciphertext plus the combined salt/nonce needed to decrypt it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
}

/// Stateless encryption engine
#[derive(Debug, Clone, Copy)]
pub struct CryptoEngine {
    iterations: u32,
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self {
            iterations: KDF_ITERATIONS,
        }
    }
}

impl CryptoEngine {
    /// Create an engine using the standard iteration count
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom PBKDF2 iteration count
    ///
    /// Payloads written with one count can only be read with the same count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Get the PBKDF2 iteration count
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive a key from a secret and 16-byte salt
    pub fn derive_key(&self, secret: &str, salt: &[u8; SALT_LEN]) -> Result<DerivedKey> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, self.iterations, &mut key);
        let derived = DerivedKey(key);
        key.zeroize();
        Ok(derived)
    }

    /// Encrypt a string
    pub fn encrypt(&self, plaintext: &str, secret: &str) -> Result<EncryptedPayload> {
        self.encrypt_bytes(plaintext.as_bytes(), secret)
    }

    /// Decrypt to a string
    ///
    /// Non-UTF-8 output is treated as a decryption failure.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8], secret: &str) -> Result<String> {
        let bytes = self.decrypt_bytes(ciphertext, iv, secret)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::DecryptionFailed("plaintext is not valid UTF-8".into()))
    }

    /// Encrypt an opaque byte payload
    pub fn encrypt_bytes(&self, plaintext: &[u8], secret: &str) -> Result<EncryptedPayload> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        fill_random(&mut salt)?;
        fill_random(&mut nonce)?;

        let key = self.derive_key(secret, &salt)?;
        let ciphertext = key
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

        let mut iv = Vec::with_capacity(IV_LEN);
        iv.extend_from_slice(&salt);
        iv.extend_from_slice(&nonce);

        Ok(EncryptedPayload { ciphertext, iv })
    }

    /// Decrypt an opaque byte payload
    pub fn decrypt_bytes(&self, ciphertext: &[u8], iv: &[u8], secret: &str) -> Result<Vec<u8>> {
        if iv.len() != IV_LEN {
            return Err(Error::InvalidIv {
                expected: IV_LEN,
                actual: iv.len(),
            });
        }

        let (salt, nonce) = iv.split_at(SALT_LEN);
        let mut salt_bytes = [0u8; SALT_LEN];
        salt_bytes.copy_from_slice(salt);

        let key = self.derive_key(secret, &salt_bytes)?;
        key.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionFailed("authentication tag mismatch".into()))
    }
}

/// Fill a buffer from the operating system random source
fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::EnvironmentUnavailable(e.to_string()))
}
