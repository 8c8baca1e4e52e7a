//! Stored key service interface
//!
//! Identity-keyed persistence of [`StoredKey`] records. Backends:
//! - In-memory map ([`crate::memory_store::MemoryStoredKeyService`])
//! - Relational store over sqlx ([`crate::sql_store::SqlStoredKeyService`])
//!
//! Backends only ever report the errors the trait documents; store-specific
//! error types stay inside the backend.
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
use crate::stored_key::StoredKey;
use async_trait::async_trait;

/// Trait for stored key backends
///
/// Ids are non-empty strings. Every implementation rejects an empty id
/// before touching its store: `save` fails with [`KeyError::InvalidId`] and
/// writes nothing, `get("")` fails with [`KeyError::NotFound`]. Apart from
/// that, calls fail only with [`KeyError::NotFound`] or [`KeyError::Storage`].
#[async_trait]
pub trait StoredKeyService: Send + Sync {
    /// Fetch the record saved under `id`
    ///
    /// [`KeyError::NotFound`] if nothing is saved under `id` (always for an
    /// empty id).
    async fn get(&self, id: &str) -> KeyResult<StoredKey>;

    /// Insert `record`, or replace the record already saved under its id
    ///
    /// [`KeyError::InvalidId`] if `record.id` is empty. A save that fails
    /// leaves the previously saved record unchanged.
    async fn save(&self, record: &StoredKey) -> KeyResult<()>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Ids must be non-empty before a backend writes them
pub(crate) fn validate_id(id: &str) -> KeyResult<()> {
    if id.is_empty() {
        return Err(KeyError::InvalidId("stored key id must not be empty".to_string()));
    }
    Ok(())
}
