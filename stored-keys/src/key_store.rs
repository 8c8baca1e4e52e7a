//! High-level key store interface
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


use crate::error::KeyResult;
use crate::jwk::JsonWebKey;
use crate::service::StoredKeyService;
use crate::stored_key::StoredKey;
use std::sync::Arc;
use tracing::{debug, info};

/// Key store that pairs the envelope codec with a storage backend
pub struct KeyStore {
    backend: Arc<dyn StoredKeyService>,
}

impl KeyStore {
    /// Create a new key store over a storage backend
    pub fn new(backend: Arc<dyn StoredKeyService>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn StoredKeyService> {
        &self.backend
    }

    /// Seal `key` under `kek` and save it as `id`, replacing any record
    /// already there. Returns the saved record.
    pub async fn seal_key(&self, id: &str, key: &JsonWebKey, kek: &[u8]) -> KeyResult<StoredKey> {
        let mut stored = StoredKey::new(id);
        stored.encrypt(key, kek)?;
        self.backend.save(&stored).await?;

        info!(key_id = id, backend = self.backend.backend_name(), "Sealed key stored");
        Ok(stored)
    }

    /// Load `id` and open it with `kek`
    pub async fn open_key(&self, id: &str, kek: &[u8]) -> KeyResult<JsonWebKey> {
        let stored = self.backend.get(id).await?;
        let key = stored.decrypt(kek)?;

        debug!(key_id = id, backend = self.backend.backend_name(), "Sealed key opened");
        Ok(key)
    }

    /// Re-wrap `id` from `old_kek` to `new_kek`.
    ///
    /// Nothing is written unless the old KEK opens the envelope and the new
    /// one is usable.
    pub async fn reseal_key(&self, id: &str, old_kek: &[u8], new_kek: &[u8]) -> KeyResult<StoredKey> {
        let mut stored = self.backend.get(id).await?;
        let key = stored.decrypt(old_kek)?;
        stored.encrypt(&key, new_kek)?;
        self.backend.save(&stored).await?;

        info!(key_id = id, backend = self.backend.backend_name(), "Sealed key re-wrapped");
        Ok(stored)
    }

    /// Fetch the raw record
    pub async fn get(&self, id: &str) -> KeyResult<StoredKey> {
        self.backend.get(id).await
    }

    /// Save a record that was sealed elsewhere
    pub async fn save(&self, record: &StoredKey) -> KeyResult<()> {
        self.backend.save(record).await
    }
}
