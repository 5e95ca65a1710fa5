//! Snapshot file loading
//!
//! Reads `clients.json` / `policies.json` exports (bare arrays or paginated
//! API responses) and runs them through boundary validation.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::services::store::Snapshot;
use crate::services::validator::{parse_clients, parse_policies};
use crate::types::{BrokerstatError, Client, Policy, Result};

pub const CLIENTS_FILE: &str = "clients.json";
pub const POLICIES_FILE: &str = "policies.json";

fn read_json(path: &Path) -> Result<Value> {
    // simd_json parses in place, so it needs an owned mutable buffer
    let mut bytes = fs::read(path)?;
    simd_json::serde::from_slice::<Value>(&mut bytes)
        .map_err(|e| BrokerstatError::Parse(format!("{}: {}", path.display(), e)))
}

pub fn load_clients(path: &Path) -> Result<Vec<Client>> {
    let clients = parse_clients(&read_json(path)?)?;
    debug!(path = %path.display(), count = clients.len(), "loaded clients");
    Ok(clients)
}

pub fn load_policies(path: &Path) -> Result<Vec<Policy>> {
    let policies = parse_policies(&read_json(path)?)?;
    debug!(path = %path.display(), count = policies.len(), "loaded policies");
    Ok(policies)
}

pub fn load_snapshot(clients_path: &Path, policies_path: &Path) -> Result<Snapshot> {
    Ok(Snapshot::new(
        load_clients(clients_path)?,
        load_policies(policies_path)?,
    ))
}

fn write_json<T: Serialize>(path: &Path, records: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(records)
        .map_err(|e| BrokerstatError::Parse(format!("Failed to serialize snapshot: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

/// Write `clients.json` and `policies.json` into `dir`.
pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_json(&dir.join(CLIENTS_FILE), &snapshot.clients)?;
    write_json(&dir.join(POLICIES_FILE), &snapshot.policies)?;
    info!(
        dir = %dir.display(),
        clients = snapshot.clients.len(),
        policies = snapshot.policies.len(),
        "snapshot written"
    );
    Ok(())
}
