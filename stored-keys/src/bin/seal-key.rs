//! Operator tool for sealed keys
//!
//! Usage:
//!   seal-key seal <id> <jwk-file>   seal a JWK file and store it as <id>
//!   seal-key check <id>             open <id> and print its public header
//!   seal-key reseal <id>            re-wrap <id> under STORED_KEYS_NEW_KEK
//!
//! The KEK is read hex-encoded from STORED_KEYS_KEK. Backend selection comes
//! from the usual STORED_KEYS_* configuration and must be a persistent
//! database, e.g. STORED_KEYS_BACKEND=sqlite and
//! STORED_KEYS_DATABASE_URL=sqlite://keys.db.

use anyhow::{bail, Context};
use std::env;
use stored_keys::{
    ensure_persistent, init_key_store, kek_from_hex, JsonWebKey, KeyStore, StoreConfig,
};
use tracing::info;

const KEK_VAR: &str = "STORED_KEYS_KEK";
const NEW_KEK_VAR: &str = "STORED_KEYS_NEW_KEK";

fn read_kek(var: &str) -> anyhow::Result<Vec<u8>> {
    let encoded = env::var(var).with_context(|| format!("{} is not set", var))?;
    Ok(kek_from_hex(&encoded)?)
}

fn usage() -> ! {
    eprintln!("usage: seal-key seal <id> <jwk-file> | check <id> | reseal <id>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StoreConfig::from_env().context("Failed to load configuration")?;
    stored_keys_logging::init_console_logging("seal-key", config.log_level());

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, id) = match args.as_slice() {
        [command, id, ..] => (command.as_str(), id.as_str()),
        _ => usage(),
    };

    // Each command is its own process; a memory store would lose every seal
    ensure_persistent(&config)?;

    let key_store = init_key_store(&config).await?;
    info!(backend = %config.backend, "Key store ready");

    match command {
        "seal" => {
            let path = args.get(2).unwrap_or_else(|| usage());
            seal(&key_store, id, path).await
        }
        "check" => check(&key_store, id).await,
        "reseal" => reseal(&key_store, id).await,
        other => bail!("unknown command: {}", other),
    }
}

async fn seal(key_store: &KeyStore, id: &str, path: &str) -> anyhow::Result<()> {
    let kek = read_kek(KEK_VAR)?;
    let raw = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
    let key: JsonWebKey =
        serde_json::from_slice(&raw).with_context(|| format!("{} is not a JWK", path))?;

    let stored = key_store.seal_key(id, &key, &kek).await?;

    println!("✅ Sealed {} ({} byte envelope)", stored.id, stored.envelope.len());
    Ok(())
}

async fn check(key_store: &KeyStore, id: &str) -> anyhow::Result<()> {
    let kek = read_kek(KEK_VAR)?;
    let key = key_store.open_key(id, &kek).await?;

    println!("✅ {} opens with the supplied KEK", id);
    println!("  kty: {}", key.kty);
    println!("  alg: {}", key.alg.as_deref().unwrap_or("-"));
    println!("  kid: {}", key.kid.as_deref().unwrap_or("-"));
    println!("  private: {}", key.is_private());
    Ok(())
}

async fn reseal(key_store: &KeyStore, id: &str) -> anyhow::Result<()> {
    let old_kek = read_kek(KEK_VAR)?;
    let new_kek = read_kek(NEW_KEK_VAR)?;

    key_store.reseal_key(id, &old_kek, &new_kek).await?;

    println!("✅ {} re-wrapped under the new KEK", id);
    Ok(())
}
