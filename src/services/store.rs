//! Latest fetched snapshot of clients and policies
//!
//! The store is owned by the caller and handed to report builders by
//! reference. Every replacement bumps the version, which is how callers
//! learn that a report built earlier is stale.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Client, Policy, RecordId};

/// A fully materialized pair of collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub clients: Vec<Client>,
    pub policies: Vec<Policy>,
}

impl Snapshot {
    pub fn new(clients: Vec<Client>, policies: Vec<Policy>) -> Self {
        Self { clients, policies }
    }

    /// Name of a policy's client, if that client is in the snapshot
    pub fn client_name(&self, client_id: Option<u64>) -> Option<&str> {
        let id = client_id?;
        self.clients
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Client id -> name, for lookups across many policies
    pub fn client_names(&self) -> HashMap<RecordId, &str> {
        self.clients
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshot: Snapshot,
    version: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            version: 1,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.bump();
    }

    pub fn replace_clients(&mut self, clients: Vec<Client>) {
        self.snapshot.clients = clients;
        self.bump();
    }

    pub fn replace_policies(&mut self, policies: Vec<Policy>) {
        self.snapshot.policies = policies;
        self.bump();
    }

    /// Whether something built from `version` must be recomputed
    pub fn is_stale(&self, version: u64) -> bool {
        version != self.version
    }

    fn bump(&mut self) {
        self.version = self.version.saturating_add(1);
        debug!(
            version = self.version,
            clients = self.snapshot.clients.len(),
            policies = self.snapshot.policies.len(),
            "snapshot replaced"
        );
    }
}
