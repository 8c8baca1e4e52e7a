//! Envelope codec
//!
//! Seals a payload under a key-encryption key (KEK) as a JWE compact
//! serialization (RFC 7516):
//!
//! ```text
//! BASE64URL(header) . BASE64URL(wrapped CEK) . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! A fresh 256-bit content-encryption key (CEK) encrypts the payload with
//! AES-256-GCM (`A256GCM`); the CEK itself is wrapped under the KEK with
//! AES-256-GCM key wrap (`A256GCMKW`), whose IV and tag travel in the
//! protected header. The encoded header is the AAD of the content
//! encryption, so every byte of the envelope is authenticated.
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


use crate::error::{KeyError, KeyResult};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

/// Required KEK length in bytes
pub const KEK_LEN: usize = 32;

/// Key wrap algorithm written to the `alg` header
pub const WRAP_ALGORITHM: &str = "A256GCMKW";

/// Content encryption written to the `enc` header
pub const CONTENT_ENCRYPTION: &str = "A256GCM";

/// Content type of sealed JSON Web Keys
pub const JWK_CONTENT_TYPE: &str = "jwk+json";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const CEK_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    /// Key wrap IV
    iv: String,
    /// Key wrap authentication tag
    tag: String,
}

/// Reject a KEK the wrap algorithm cannot use
pub fn check_kek(kek: &[u8]) -> KeyResult<()> {
    if kek.len() != KEK_LEN {
        return Err(KeyError::InvalidKey(format!(
            "{} requires a {}-byte key, got {} bytes",
            WRAP_ALGORITHM,
            KEK_LEN,
            kek.len()
        )));
    }
    Ok(())
}

fn kek_cipher(kek: &[u8]) -> KeyResult<Aes256Gcm> {
    check_kek(kek)?;
    Aes256Gcm::new_from_slice(kek)
        .map_err(|e| KeyError::InvalidKey(format!("Unusable key-encryption key: {}", e)))
}

fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode(segment: &str) -> KeyResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| KeyError::Decryption)
}

fn decode_exact(segment: &str, len: usize) -> KeyResult<Vec<u8>> {
    let bytes = decode(segment)?;
    if bytes.len() != len {
        return Err(KeyError::Decryption);
    }
    Ok(bytes)
}

/// Seal `plaintext` under `kek`, returning the compact envelope bytes.
///
/// `content_type` goes into the `cty` header. Every call draws a new CEK
/// and new IVs, so sealing the same input twice gives different envelopes.
pub fn seal(plaintext: &[u8], kek: &[u8], content_type: Option<&str>) -> KeyResult<Vec<u8>> {
    let wrap_cipher = kek_cipher(kek)?;

    let cek = Aes256Gcm::generate_key(&mut OsRng);
    let wrap_iv = Aes256Gcm::generate_nonce(&mut OsRng);
    let wrapped = wrap_cipher
        .encrypt(&wrap_iv, cek.as_slice())
        .map_err(|e| KeyError::Encryption(format!("Key wrap failed: {}", e)))?;
    let (encrypted_key, wrap_tag) = wrapped.split_at(CEK_LEN);

    let header = ProtectedHeader {
        alg: WRAP_ALGORITHM.to_string(),
        enc: CONTENT_ENCRYPTION.to_string(),
        cty: content_type.map(str::to_string),
        iv: encode(wrap_iv),
        tag: encode(wrap_tag),
    };
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| KeyError::Encryption(format!("Header serialization failed: {}", e)))?;
    let header_b64 = encode(header_json);

    let content_cipher = Aes256Gcm::new(&cek);
    let iv = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = content_cipher
        .encrypt(
            &iv,
            Payload {
                msg: plaintext,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|e| KeyError::Encryption(format!("Content encryption failed: {}", e)))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let compact = [
        header_b64,
        encode(encrypted_key),
        encode(iv),
        encode(ciphertext),
        encode(tag),
    ]
    .join(".");

    Ok(compact.into_bytes())
}

/// Open an envelope produced by [`seal`].
///
/// A KEK of the wrong length is reported as [`KeyError::InvalidKey`]. Every
/// other failure, including a well-formed but wrong KEK, is
/// [`KeyError::Decryption`] and yields no plaintext.
pub fn open(envelope: &[u8], kek: &[u8]) -> KeyResult<Vec<u8>> {
    let wrap_cipher = kek_cipher(kek)?;

    let compact = std::str::from_utf8(envelope).map_err(|_| KeyError::Decryption)?;
    let segments: Vec<&str> = compact.split('.').collect();
    let &[header_b64, encrypted_key_b64, iv_b64, ciphertext_b64, tag_b64] = segments.as_slice()
    else {
        return Err(KeyError::Decryption);
    };

    let header: ProtectedHeader =
        serde_json::from_slice(&decode(header_b64)?).map_err(|_| KeyError::Decryption)?;
    if header.alg != WRAP_ALGORITHM || header.enc != CONTENT_ENCRYPTION {
        return Err(KeyError::Decryption);
    }

    let wrap_iv = decode_exact(&header.iv, IV_LEN)?;
    let mut wrapped = decode_exact(encrypted_key_b64, CEK_LEN)?;
    wrapped.extend_from_slice(&decode_exact(&header.tag, TAG_LEN)?);
    let cek = wrap_cipher
        .decrypt(Nonce::from_slice(&wrap_iv), wrapped.as_slice())
        .map_err(|_| KeyError::Decryption)?;

    let content_cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| KeyError::Decryption)?;
    let iv = decode_exact(iv_b64, IV_LEN)?;
    let mut sealed = decode(ciphertext_b64)?;
    sealed.extend_from_slice(&decode_exact(tag_b64, TAG_LEN)?);

    content_cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|_| KeyError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEK: [u8; KEK_LEN] = [7u8; KEK_LEN];

    fn segments(envelope: &[u8]) -> Vec<String> {
        std::str::from_utf8(envelope)
            .unwrap()
            .split('.')
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_seal_and_open() {
        let envelope = seal(b"payload", &KEK, None).unwrap();
        assert_eq!(open(&envelope, &KEK).unwrap(), b"payload");
    }

    #[test]
    fn test_empty_payload() {
        let envelope = seal(b"", &KEK, None).unwrap();
        assert!(open(&envelope, &KEK).unwrap().is_empty());
    }

    #[test]
    fn test_compact_layout() {
        let envelope = seal(b"payload", &KEK, Some(JWK_CONTENT_TYPE)).unwrap();
        let parts = segments(&envelope);
        assert_eq!(parts.len(), 5);

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], WRAP_ALGORITHM);
        assert_eq!(header["enc"], CONTENT_ENCRYPTION);
        assert_eq!(header["cty"], JWK_CONTENT_TYPE);
        assert_eq!(URL_SAFE_NO_PAD.decode(header["iv"].as_str().unwrap()).unwrap().len(), IV_LEN);
        assert_eq!(URL_SAFE_NO_PAD.decode(header["tag"].as_str().unwrap()).unwrap().len(), TAG_LEN);

        assert_eq!(URL_SAFE_NO_PAD.decode(&parts[1]).unwrap().len(), CEK_LEN);
        assert_eq!(URL_SAFE_NO_PAD.decode(&parts[2]).unwrap().len(), IV_LEN);
        assert_eq!(URL_SAFE_NO_PAD.decode(&parts[3]).unwrap().len(), b"payload".len());
        assert_eq!(URL_SAFE_NO_PAD.decode(&parts[4]).unwrap().len(), TAG_LEN);
    }

    #[test]
    fn test_kek_length_checked_first() {
        assert!(matches!(seal(b"x", b"broken", None), Err(KeyError::InvalidKey(_))));
        // Garbage envelope, short key: the key is what gets reported
        assert!(matches!(open(b"garbage", &[0u8; 16]), Err(KeyError::InvalidKey(_))));
        assert!(matches!(open(b"garbage", &[0u8; 33]), Err(KeyError::InvalidKey(_))));
    }

    #[test]
    fn test_malformed_envelopes() {
        let envelope = seal(b"payload", &KEK, None).unwrap();
        let parts = segments(&envelope);

        let four = parts[..4].join(".");
        let six = format!("{}.", parts.join("."));
        let padded = format!("{}=", parts.join("."));
        let bad_utf8 = [0xffu8, 0xfe, 0x2e];

        let malformed: [&[u8]; 6] = [
            b"",
            b"....",
            four.as_bytes(),
            six.as_bytes(),
            padded.as_bytes(),
            &bad_utf8,
        ];
        for bad in malformed {
            assert!(matches!(open(bad, &KEK), Err(KeyError::Decryption)));
        }
    }

    #[test]
    fn test_unexpected_algorithm_rejected() {
        let envelope = seal(b"payload", &KEK, None).unwrap();
        let mut parts = segments(&envelope);

        let mut header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&parts[0]).unwrap()).unwrap();
        header["alg"] = "dir".into();
        parts[0] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());

        assert!(matches!(open(parts.join(".").as_bytes(), &KEK), Err(KeyError::Decryption)));
    }

    #[test]
    fn test_swapped_ciphertexts_rejected() {
        // Same KEK, different envelopes: mixing their segments must not open
        let a = segments(&seal(b"first", &KEK, None).unwrap());
        let b = segments(&seal(b"other", &KEK, None).unwrap());
        let mixed = [&a[0], &a[1], &a[2], &b[3], &a[4]]
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(".");
        assert!(matches!(open(mixed.as_bytes(), &KEK), Err(KeyError::Decryption)));
    }
}
