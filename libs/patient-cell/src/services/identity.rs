use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use sha2::{Digest, Sha256};

use shared_config::AppConfig;

use crate::models::PatientError;

/// AES-256-GCM cipher for national-identity fields.
///
/// Stored blobs are `base64(nonce || ciphertext || tag)`. A random nonce per
/// encryption means ciphertexts are not comparable, so uniqueness lookups go
/// through `fingerprint` instead.
pub struct IdentityCipher {
    key: LessSafeKey,
}

impl IdentityCipher {
    pub fn from_config(config: &AppConfig) -> Result<Self, PatientError> {
        if !config.is_identity_encryption_configured() {
            return Err(PatientError::Identity(
                "identity encryption key is not configured".to_string(),
            ));
        }

        let key_bytes = general_purpose::STANDARD
            .decode(&config.identity_encryption_key)
            .map_err(|e| PatientError::Identity(format!("invalid encryption key encoding: {}", e)))?;

        let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
            .map_err(|_| PatientError::Identity("encryption key must be 32 bytes".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, PatientError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| PatientError::Identity("encryption failed".to_string()))?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&in_out);
        Ok(general_purpose::STANDARD.encode(blob))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, PatientError> {
        let blob = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| PatientError::Identity(format!("invalid ciphertext encoding: {}", e)))?;

        if blob.len() <= NONCE_LEN {
            return Err(PatientError::Identity("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| PatientError::Identity("invalid nonce".to_string()))?;

        let mut buf = ciphertext.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut buf)
            .map_err(|_| PatientError::Identity("decryption failed".to_string()))?;

        String::from_utf8(plain.to_vec())
            .map_err(|_| PatientError::Identity("decrypted identity is not valid UTF-8".to_string()))
    }

    /// Deterministic digest of an identity number, for equality lookups.
    pub fn fingerprint(identity: &str) -> String {
        let digest = Sha256::digest(identity.as_bytes());
        format!("{:x}", digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[test]
    fn encrypt_then_decrypt_recovers_identity() {
        let config = TestConfig::default().to_app_config();
        let cipher = IdentityCipher::from_config(&config).expect("cipher");

        let encrypted = cipher.encrypt("29876543210").expect("encrypt");
        assert_ne!(encrypted, "29876543210");

        let decrypted = cipher.decrypt(&encrypted).expect("decrypt");
        assert_eq!(decrypted, "29876543210");
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(
            IdentityCipher::fingerprint("29876543210"),
            IdentityCipher::fingerprint("29876543210")
        );
        assert_ne!(
            IdentityCipher::fingerprint("29876543210"),
            IdentityCipher::fingerprint("29876543211")
        );
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let config = TestConfig::default().to_app_config();
        let cipher = IdentityCipher::from_config(&config).expect("cipher");

        let mut encrypted = cipher.encrypt("29876543210").expect("encrypt");
        encrypted.replace_range(0..1, if encrypted.starts_with('A') { "B" } else { "A" });

        assert!(cipher.decrypt(&encrypted).is_err());
    }
}
