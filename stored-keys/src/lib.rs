//! Envelope-encrypted storage for JSON Web Keys
//!
//! Keys are sealed under a caller-supplied key-encryption key (KEK) and
//! stored as opaque envelopes behind the [`StoredKeyService`] interface,
//! with in-memory and relational backends. Plaintext key material never
//! reaches a backend.
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


pub mod envelope;
pub mod error;
pub mod jwk;
pub mod key_store;
pub mod memory_store;
pub mod service;
pub mod service_integration;
pub mod sql_store;
pub mod stored_key;

pub use envelope::KEK_LEN;
pub use error::{KeyError, KeyErrorKind, KeyResult};
pub use jwk::JsonWebKey;
pub use key_store::KeyStore;
pub use memory_store::MemoryStoredKeyService;
pub use service::StoredKeyService;
pub use service_integration::*;
pub use sql_store::SqlStoredKeyService;
pub use stored_key::{KeyId, StoredKey};
pub use stored_keys_config::{BackendKind, StoreConfig};
