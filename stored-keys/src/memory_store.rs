//! In-memory stored key backend
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
use crate::service::{validate_id, StoredKeyService};
use crate::stored_key::{KeyId, StoredKey};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Process-local stored key backend
///
/// Suitable for tests and single-process tools. Data is lost when the
/// process exits. One lock guards the whole map.
#[derive(Default)]
pub struct MemoryStoredKeyService {
    keys: Mutex<HashMap<KeyId, StoredKey>>,
}

impl MemoryStoredKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }
}

#[async_trait]
impl StoredKeyService for MemoryStoredKeyService {
    async fn get(&self, id: &str) -> KeyResult<StoredKey> {
        let keys = self.keys.lock().await;
        keys.get(id)
            .cloned()
            .ok_or_else(|| KeyError::NotFound(id.to_string()))
    }

    async fn save(&self, record: &StoredKey) -> KeyResult<()> {
        validate_id(&record.id)?;

        let mut keys = self.keys.lock().await;
        let replaced = keys.insert(record.id.clone(), record.clone()).is_some();

        debug!(key_id = %record.id, replaced, "Stored key saved in memory");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
