//! Backend construction from configuration
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
use crate::key_store::KeyStore;
use crate::memory_store::MemoryStoredKeyService;
use crate::service::StoredKeyService;
use crate::sql_store::SqlStoredKeyService;
use std::sync::Arc;
use stored_keys_config::{BackendKind, StoreConfig};
use tracing::info;

/// Build the backend `config` names
pub async fn init_stored_key_service(config: &StoreConfig) -> KeyResult<Arc<dyn StoredKeyService>> {
    let kind = config.backend_kind()?;

    info!(backend = %kind, "Initializing stored key service");

    let service: Arc<dyn StoredKeyService> = match kind {
        BackendKind::Memory => Arc::new(MemoryStoredKeyService::new()),
        BackendKind::Sqlite => Arc::new(
            SqlStoredKeyService::connect(
                &config.database_url,
                config.max_connections,
                config.acquire_timeout(),
            )
            .await?,
        ),
    };

    Ok(service)
}

/// Build the backend `config` names and wrap it in a [`KeyStore`]
pub async fn init_key_store(config: &StoreConfig) -> KeyResult<Arc<KeyStore>> {
    let backend = init_stored_key_service(config).await?;
    Ok(Arc::new(KeyStore::new(backend)))
}

/// Reject configurations whose data is gone when the process exits.
///
/// Tools that run one command per process (such as `seal-key`) call this
/// before touching the store: the memory backend and in-memory SQLite URLs
/// would report a successful save that no later run can see.
pub fn ensure_persistent(config: &StoreConfig) -> KeyResult<()> {
    match config.backend_kind()? {
        BackendKind::Memory => Err(KeyError::Configuration(
            "the memory backend does not persist across runs; set STORED_KEYS_BACKEND=sqlite \
             and STORED_KEYS_DATABASE_URL to a database file"
                .to_string(),
        )),
        BackendKind::Sqlite if crate::sql_store::is_in_memory(&config.database_url) => {
            Err(KeyError::Configuration(format!(
                "database {} is in-memory and does not persist across runs",
                config.database_url
            )))
        }
        BackendKind::Sqlite => Ok(()),
    }
}

/// Decode a hex KEK as handed over by operators (env vars, secret files)
pub fn kek_from_hex(encoded: &str) -> KeyResult<Vec<u8>> {
    let kek = hex::decode(encoded.trim())
        .map_err(|e| KeyError::InvalidKey(format!("Key-encryption key is not valid hex: {}", e)))?;
    crate::envelope::check_kek(&kek)?;
    Ok(kek)
}
