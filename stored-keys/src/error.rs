//! Error types for stored key operations
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


use thiserror::Error;

/// Stored key errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// Key-encryption key has the wrong length or format
    #[error("Invalid key-encryption key: {0}")]
    InvalidKey(String),

    /// Envelope could not be opened. Carries no detail on purpose: a wrong
    /// key and a damaged envelope look the same to the caller.
    #[error("Decryption failed")]
    Decryption,

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid key id: {0}")]
    InvalidId(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error category, for callers that branch on the kind of failure only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyErrorKind {
    InvalidKey,
    Decryption,
    Encryption,
    NotFound,
    Storage,
    InvalidId,
    Configuration,
}

impl KeyError {
    pub fn kind(&self) -> KeyErrorKind {
        match self {
            KeyError::InvalidKey(_) => KeyErrorKind::InvalidKey,
            KeyError::Decryption => KeyErrorKind::Decryption,
            KeyError::Encryption(_) => KeyErrorKind::Encryption,
            KeyError::NotFound(_) => KeyErrorKind::NotFound,
            KeyError::Storage(_) => KeyErrorKind::Storage,
            KeyError::InvalidId(_) => KeyErrorKind::InvalidId,
            KeyError::Configuration(_) => KeyErrorKind::Configuration,
        }
    }
}

impl From<stored_keys_config::UnknownBackend> for KeyError {
    fn from(err: stored_keys_config::UnknownBackend) -> Self {
        KeyError::Configuration(err.to_string())
    }
}

/// Result type for stored key operations
pub type KeyResult<T> = Result<T, KeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_message_has_no_detail() {
        assert_eq!(KeyError::Decryption.to_string(), "Decryption failed");
    }

    #[test]
    fn test_kind() {
        assert_eq!(KeyError::NotFound("abc".into()).kind(), KeyErrorKind::NotFound);
        assert_eq!(KeyError::Storage("io".into()).kind(), KeyErrorKind::Storage);
        assert_eq!(KeyError::InvalidKey("short".into()).kind(), KeyErrorKind::InvalidKey);
    }
}
