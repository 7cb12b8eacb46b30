//! The registry of deployed proxy / implementation addresses, per network

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use deploy_common::{
    config::write_deployed_addresses,
    types::{DeployedContract, NetworkConfig},
};
use tracing::debug;

use crate::errors::DeployError;

/// Durable storage for a network's deployed addresses
pub trait RegistryStore {
    /// Persist the complete set of entries for a network, replacing what was stored
    fn persist(
        &self,
        network: &str,
        entries: &BTreeMap<String, DeployedContract>,
    ) -> Result<(), DeployError>;
}

/// A [`RegistryStore`] that rewrites the `deployedAddress` section of a network config file
#[derive(Clone, Debug)]
pub struct JsonConfigStore {
    /// The path of the network config file
    path: PathBuf,
}

impl JsonConfigStore {
    /// Create a store over the config file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistryStore for JsonConfigStore {
    fn persist(
        &self,
        network: &str,
        entries: &BTreeMap<String, DeployedContract>,
    ) -> Result<(), DeployError> {
        debug!(
            "writing {} {network} entries to {}",
            entries.len(),
            self.path.display()
        );
        write_deployed_addresses(&self.path, entries)
            .map_err(|e| DeployError::Persistence(e.to_string()))
    }
}

/// The authoritative answer to "is this logical contract deployed on this network"
pub struct DeploymentRegistry<S: RegistryStore> {
    /// The recorded entries, keyed by network then logical name
    entries: HashMap<String, BTreeMap<String, DeployedContract>>,
    /// Where recorded entries are persisted
    store: S,
}

impl<S: RegistryStore> DeploymentRegistry<S> {
    /// Create an empty registry over a store
    pub fn new(store: S) -> Self {
        Self {
            entries: HashMap::new(),
            store,
        }
    }

    /// Create a registry seeded with a network's recorded addresses
    pub fn from_config(config: &NetworkConfig, store: S) -> Self {
        let mut registry = Self::new(store);
        registry
            .entries
            .insert(config.name.clone(), config.deployed_addresses.clone());
        registry
    }

    /// Look up the addresses recorded for a logical contract
    pub fn lookup(&self, network: &str, name: &str) -> Option<DeployedContract> {
        self.entries
            .get(network)
            .and_then(|entries| entries.get(name))
            .copied()
    }

    /// Record the addresses of a logical contract.
    ///
    /// The entry becomes visible to [`DeploymentRegistry::lookup`] only once
    /// it has been persisted; if persisting fails the registry is unchanged.
    pub fn record(
        &mut self,
        network: &str,
        name: &str,
        deployed: DeployedContract,
    ) -> Result<(), DeployError> {
        let mut staged = self.entries.get(network).cloned().unwrap_or_default();
        staged.insert(name.to_string(), deployed);

        self.store.persist(network, &staged)?;
        self.entries.insert(network.to_string(), staged);
        Ok(())
    }

    /// All entries recorded for a network
    pub fn entries(&self, network: &str) -> BTreeMap<String, DeployedContract> {
        self.entries.get(network).cloned().unwrap_or_default()
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}
