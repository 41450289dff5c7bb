use crate::error::StoreError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::Rng;

const NONCE_SIZE: usize = 12;

/// At-rest encryption for message text/metadata, keyed by the configured
/// master encryption key. AES-256-GCM with a random 96-bit nonce prefixed
/// to the ciphertext.
pub struct SecretEncryptor {
    cipher: Aes256Gcm,
}

impl SecretEncryptor {
    pub fn new(master_key: &[u8]) -> Result<Self, StoreError> {
        if master_key.len() != 32 {
            return Err(StoreError::Encryption(format!(
                "master key must be 32 bytes, got {}",
                master_key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(master_key)
            .map_err(|err| StoreError::Encryption(format!("invalid master key: {err:?}")))?;

        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|err| StoreError::Encryption(format!("encrypt failed: {err:?}")))?;
        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.append(&mut ciphertext);
        Ok(output)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, StoreError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(StoreError::Encryption("ciphertext too short".to_string()));
        }

        let (nonce_bytes, payload) = ciphertext.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, payload)
            .map_err(|err| StoreError::Encryption(format!("decrypt failed: {err:?}")))?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0xAB; 32]
    }

    #[test]
    fn roundtrip() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let plaintext = b"hello visitor";
        let ciphertext = encryptor.encrypt(plaintext).unwrap();
        let decrypted = encryptor.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_size_rejected() {
        let err = SecretEncryptor::new(&[0u8; 31]).err().unwrap();
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let mut ciphertext = encryptor.encrypt(b"sensitive data").unwrap();
        let idx = NONCE_SIZE + 1;
        ciphertext[idx] ^= 0xFF;
        assert!(encryptor.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn nonce_uniqueness() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let ct1 = encryptor.encrypt(b"same text").unwrap();
        let ct2 = encryptor.encrypt(b"same text").unwrap();
        assert_ne!(ct1, ct2);
    }
}
