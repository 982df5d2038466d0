//! Envelope encryption for stored provider credentials.
//!
//! Uses HKDF to derive a per-store data encryption key (DEK) from a master
//! key, then encrypts the credential JSON with AES-256-GCM.
//!
//! Format of encrypted data: MAGIC (4 bytes) || nonce (12 bytes) || ciphertext

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{AppError, Result};

/// Nonce size for AES-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Master key size (256 bits for AES-256)
const MASTER_KEY_SIZE: usize = 32;

/// Magic bytes to identify encrypted data
const ENCRYPTED_MAGIC: &[u8] = b"ENC1";

/// Holds the master encryption key. Per-store DEKs are derived from it via
/// HKDF so a leaked row never exposes the master key or another store's data.
#[derive(Clone)]
pub struct MasterKey {
    key: [u8; MASTER_KEY_SIZE],
}

impl MasterKey {
    /// Create a MasterKey from a base64-encoded string.
    /// The decoded key must be exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| AppError::Internal(format!("Invalid master key encoding: {}", e)))?;

        if decoded.len() != MASTER_KEY_SIZE {
            return Err(AppError::Internal(format!(
                "Master key must be {} bytes, got {}",
                MASTER_KEY_SIZE,
                decoded.len()
            )));
        }

        let mut key = [0u8; MASTER_KEY_SIZE];
        key.copy_from_slice(&decoded);
        Ok(Self { key })
    }

    /// Generate a new random master key (for initial setup / dev mode).
    /// Returns the key as a base64-encoded string.
    pub fn generate() -> String {
        use rand::RngCore;
        use rand::rngs::OsRng;
        let mut key = [0u8; MASTER_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    pub fn from_bytes(key: [u8; MASTER_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Derive the per-store data encryption key.
    fn derive_dek(&self, store_id: &str) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(Some(b"comptoir-v1"), &self.key);
        let mut dek = [0u8; 32];
        hk.expand(store_id.as_bytes(), &mut dek)
            .expect("HKDF expand should not fail with valid length");
        dek
    }

    /// Encrypt a credential blob for storage.
    /// Returns: MAGIC (4 bytes) || nonce (12 bytes) || ciphertext
    pub fn seal(&self, store_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        use rand::RngCore;
        use rand::rngs::OsRng;

        let dek = self.derive_dek(store_id);
        let cipher = Aes256Gcm::new_from_slice(&dek)
            .map_err(|e| AppError::Internal(format!("Failed to create cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| AppError::Internal("Encryption failed".into()))?;

        let mut out = Vec::with_capacity(ENCRYPTED_MAGIC.len() + NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(ENCRYPTED_MAGIC);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a credential blob produced by [`seal`](Self::seal).
    pub fn open(&self, store_id: &str, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < ENCRYPTED_MAGIC.len() + NONCE_SIZE
            || &sealed[..ENCRYPTED_MAGIC.len()] != ENCRYPTED_MAGIC
        {
            return Err(AppError::Internal("Malformed encrypted payload".into()));
        }

        let nonce_start = ENCRYPTED_MAGIC.len();
        let ct_start = nonce_start + NONCE_SIZE;
        let nonce = Nonce::from_slice(&sealed[nonce_start..ct_start]);

        let dek = self.derive_dek(store_id);
        let cipher = Aes256Gcm::new_from_slice(&dek)
            .map_err(|e| AppError::Internal(format!("Failed to create cipher: {}", e)))?;

        cipher
            .decrypt(nonce, &sealed[ct_start..])
            .map_err(|_| AppError::Internal("Decryption failed (wrong key?)".into()))
    }
}
