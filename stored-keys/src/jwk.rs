//! JSON Web Key representation of plaintext key material
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


use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Members that only appear on private or symmetric keys (RFC 7518 §6)
const PRIVATE_MEMBERS: [&str; 7] = ["d", "p", "q", "dp", "dq", "qi", "k"];

/// A JWK (RFC 7517)
///
/// Only the members every key shares are typed. Algorithm-specific members
/// (`crv`, `x`, `n`, `d`, `k`, ...) are kept verbatim in `params` so a key
/// survives a seal/open cycle exactly as it went in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type: `EC`, `RSA`, `oct`, `OKP`
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl JsonWebKey {
    pub fn new(kty: impl Into<String>) -> Self {
        Self {
            kty: kty.into(),
            alg: None,
            kid: None,
            key_use: None,
            params: Map::new(),
        }
    }

    pub fn with_alg(mut self, alg: impl Into<String>) -> Self {
        self.alg = Some(alg.into());
        self
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_use(mut self, key_use: impl Into<String>) -> Self {
        self.key_use = Some(key_use.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Whether the key carries private or symmetric material
    pub fn is_private(&self) -> bool {
        PRIVATE_MEMBERS.iter().any(|m| self.params.contains_key(*m))
    }
}
