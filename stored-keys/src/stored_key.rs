//! The stored key entity
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::envelope::{self, JWK_CONTENT_TYPE};
use crate::error::{KeyError, KeyResult};
use crate::jwk::JsonWebKey;
use serde::{Deserialize, Serialize};

/// Unique identifier for a stored key, chosen by the caller
pub type KeyId = String;

/// A key record as it is persisted: identity plus an encrypted envelope
///
/// The envelope is the only field derived from key material and it is
/// always ciphertext. Storage backends copy records around but never
/// touch the envelope themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// Key identifier
    pub id: KeyId,
    /// Compact JWE envelope, empty until [`StoredKey::encrypt`] runs
    #[serde(default)]
    pub envelope: Vec<u8>,
    /// `alg` of the sealed key, descriptive only
    #[serde(default)]
    pub algorithm: Option<String>,
    /// When the record was created (unix seconds)
    pub created_at: i64,
}

impl StoredKey {
    pub fn new(id: impl Into<KeyId>) -> Self {
        Self {
            id: id.into(),
            envelope: Vec::new(),
            algorithm: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Whether an envelope is present
    pub fn is_sealed(&self) -> bool {
        !self.envelope.is_empty()
    }

    /// Seal `key` under `kek`, replacing any previous envelope.
    ///
    /// On error the record is left exactly as it was.
    pub fn encrypt(&mut self, key: &JsonWebKey, kek: &[u8]) -> KeyResult<()> {
        envelope::check_kek(kek)?;

        let plaintext = serde_json::to_vec(key)
            .map_err(|e| KeyError::Encryption(format!("Key serialization failed: {}", e)))?;
        let sealed = envelope::seal(&plaintext, kek, Some(JWK_CONTENT_TYPE))?;

        self.envelope = sealed;
        self.algorithm = key.alg.clone();
        Ok(())
    }

    /// Open the envelope with `kek` and recover the key
    pub fn decrypt(&self, kek: &[u8]) -> KeyResult<JsonWebKey> {
        envelope::check_kek(kek)?;
        if !self.is_sealed() {
            return Err(KeyError::Decryption);
        }

        let plaintext = envelope::open(&self.envelope, kek)?;
        serde_json::from_slice(&plaintext).map_err(|_| KeyError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kek(byte: u8) -> Vec<u8> {
        vec![byte; envelope::KEK_LEN]
    }

    fn sample_key() -> JsonWebKey {
        JsonWebKey::new("oct")
            .with_alg("HS256")
            .with_kid("sample")
            .with_param("k", "GawgguFyGrWKav7AX4VKUg")
    }

    #[test]
    fn test_new_is_empty() {
        let key = StoredKey::new("test");
        assert_eq!(key.id, "test");
        assert!(!key.is_sealed());
        assert!(key.algorithm.is_none());
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let mut stored = StoredKey::new("test");
        stored.encrypt(&sample_key(), &kek(1)).unwrap();

        assert!(stored.is_sealed());
        assert_eq!(stored.algorithm.as_deref(), Some("HS256"));
        assert_eq!(stored.decrypt(&kek(1)).unwrap(), sample_key());
    }

    #[test]
    fn test_envelope_holds_no_plaintext() {
        let mut stored = StoredKey::new("test");
        stored.encrypt(&sample_key(), &kek(1)).unwrap();

        let text = String::from_utf8(stored.envelope.clone()).unwrap();
        assert!(!text.contains("GawgguFyGrWKav7AX4VKUg"));
        assert!(!text.contains("HS256"));
    }

    #[test]
    fn test_decrypt_empty_envelope() {
        let stored = StoredKey::new("test");
        assert!(matches!(stored.decrypt(&kek(1)), Err(KeyError::Decryption)));
    }

    #[test]
    fn test_encrypt_with_broken_kek_leaves_record_untouched() {
        let mut stored = StoredKey::new("test");
        stored.encrypt(&sample_key(), &kek(1)).unwrap();
        let before = stored.clone();

        let err = stored.encrypt(&JsonWebKey::new("oct"), b"broken").unwrap_err();
        assert!(matches!(err, KeyError::InvalidKey(_)));
        assert_eq!(stored, before);
    }

    #[test]
    fn test_decrypt_with_other_kek() {
        let mut stored = StoredKey::new("test");
        stored.encrypt(&sample_key(), &kek(1)).unwrap();
        assert!(matches!(stored.decrypt(&kek(2)), Err(KeyError::Decryption)));
    }

    #[test]
    fn test_envelope_sealing_non_jwk_is_rejected() {
        let mut stored = StoredKey::new("test");
        stored.envelope = envelope::seal(b"not json", &kek(1), None).unwrap();
        assert!(matches!(stored.decrypt(&kek(1)), Err(KeyError::Decryption)));
    }

    #[test]
    fn test_json_round_trip_keeps_sealed_key() {
        let mut stored = StoredKey::new("test");
        stored.encrypt(&sample_key(), &kek(1)).unwrap();

        let json = serde_json::to_string(&stored).unwrap();
        let restored: StoredKey = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, stored);
        assert_eq!(restored.decrypt(&kek(1)).unwrap(), sample_key());
    }

    #[test]
    fn test_json_missing_envelope_and_algorithm() {
        let restored: StoredKey = serde_json::from_str(r#"{"id":"abc","created_at":1}"#).unwrap();

        assert_eq!(restored.id, "abc");
        assert_eq!(restored.created_at, 1);
        assert!(restored.envelope.is_empty());
        assert!(restored.algorithm.is_none());
        assert!(!restored.is_sealed());
        assert!(matches!(restored.decrypt(&kek(1)), Err(KeyError::Decryption)));
    }
}
