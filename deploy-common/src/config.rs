//! Reading and writing the per-network JSON configuration files
//!
//! A config file carries the chain identity, the external default addresses,
//! the addresses recorded by prior deployments, and the contract plan. Only
//! the `deployedAddress` section is ever rewritten; every other key in the
//! file is preserved verbatim.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::Path,
    str::FromStr,
};

use alloy_primitives::Address;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    constants::{
        DEFAULT_EXPLORER_API_PATH, DEPLOYED_ADDRESS_KEY, IMPL_KEY_SUFFIX, JSON_INDENT,
        PROXY_KEY_SUFFIX, STAGING_FILE_EXTENSION,
    },
    errors::ConfigError,
    types::{ContractSpec, DeployedContract, NetworkConfig},
};

/// The on-disk shape of a network config file
#[derive(Deserialize)]
struct RawNetworkConfig {
    /// The chain identity section
    chain: RawChain,
    /// External addresses keyed by role
    #[serde(rename = "defaultAddress", default)]
    default_address: BTreeMap<String, Address>,
    /// Recorded addresses keyed by `<Name>Proxy` / `<Name>Impl`
    #[serde(rename = "deployedAddress", default)]
    deployed_address: BTreeMap<String, String>,
    /// The ordered contract plan
    #[serde(default)]
    contracts: Vec<ContractSpec>,
}

/// The on-disk shape of the chain section
#[derive(Deserialize)]
struct RawChain {
    /// The EIP-155 chain ID
    #[serde(rename = "chainId")]
    chain_id: u64,
    /// The explorer's browser URL
    #[serde(rename = "explorerURL")]
    explorer_url: String,
    /// The explorer's API URL, if it differs from `<explorerURL>/api`
    #[serde(rename = "explorerApiURL", default)]
    explorer_api_url: Option<String>,
}

impl NetworkConfig {
    /// Load a network config from a JSON file, naming the network after the file stem
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                ConfigError::ReadFile(format!("no network name in path {}", path.display()))
            })?;

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(format!("{}: {}", path.display(), e)))?;

        Self::from_json_str(name, &contents)
    }

    /// Parse a network config from a JSON string
    pub fn from_json_str(name: &str, json: &str) -> Result<Self, ConfigError> {
        let raw: RawNetworkConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut seen = HashSet::new();
        for spec in &raw.contracts {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateContract(spec.name.clone()));
            }
        }

        let explorer_api_url = raw.chain.explorer_api_url.unwrap_or_else(|| {
            format!(
                "{}/{}",
                raw.chain.explorer_url.trim_end_matches('/'),
                DEFAULT_EXPLORER_API_PATH
            )
        });

        Ok(NetworkConfig {
            name: name.to_string(),
            chain_id: raw.chain.chain_id,
            explorer_url: raw.chain.explorer_url,
            explorer_api_url,
            default_addresses: raw.default_address,
            deployed_addresses: parse_deployed_addresses(&raw.deployed_address)?,
            contracts: raw.contracts,
        })
    }
}

/// Pair up the flat `<Name>Proxy` / `<Name>Impl` keys into registry entries.
///
/// Empty values count as absent. A name with only one half present is rejected.
pub fn parse_deployed_addresses(
    flat: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, DeployedContract>, ConfigError> {
    let mut halves: BTreeMap<String, (Option<Address>, Option<Address>)> = BTreeMap::new();

    for (key, value) in flat {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let address = Address::from_str(value).map_err(|_| ConfigError::InvalidAddress {
            key: key.clone(),
            value: value.to_string(),
        })?;

        if let Some(name) = key.strip_suffix(PROXY_KEY_SUFFIX) {
            halves.entry(name.to_string()).or_default().0 = Some(address);
        } else if let Some(name) = key.strip_suffix(IMPL_KEY_SUFFIX) {
            halves.entry(name.to_string()).or_default().1 = Some(address);
        } else {
            return Err(ConfigError::UnknownDeployedKey(key.clone()));
        }
    }

    halves
        .into_iter()
        .map(|(name, halves)| match halves {
            (Some(proxy), Some(implementation)) => Ok((
                name,
                DeployedContract {
                    proxy,
                    implementation,
                },
            )),
            _ => Err(ConfigError::InconsistentEntry(name)),
        })
        .collect()
}

/// Flatten registry entries into the `<Name>Proxy` / `<Name>Impl` JSON object
pub fn deployed_addresses_to_json(entries: &BTreeMap<String, DeployedContract>) -> Value {
    let mut object = Map::new();
    for (name, deployed) in entries {
        object.insert(
            format!("{name}{IMPL_KEY_SUFFIX}"),
            Value::String(format!("{:#x}", deployed.implementation)),
        );
        object.insert(
            format!("{name}{PROXY_KEY_SUFFIX}"),
            Value::String(format!("{:#x}", deployed.proxy)),
        );
    }

    Value::Object(object)
}

/// Replace the `deployedAddress` section of the config file at `path`.
///
/// The rewritten file is staged next to the original and renamed over it, so
/// a reader never observes a partially written file.
pub fn write_deployed_addresses(
    path: &Path,
    entries: &BTreeMap<String, DeployedContract>,
) -> Result<(), ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile(format!("{}: {}", path.display(), e)))?;
    let mut parsed_json: Value =
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let object = parsed_json
        .as_object_mut()
        .ok_or_else(|| ConfigError::Parse("config root is not an object".to_string()))?;
    object.insert(
        DEPLOYED_ADDRESS_KEY.to_string(),
        deployed_addresses_to_json(entries),
    );

    let mut serialized = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut serialized, formatter);
    serde::Serialize::serialize(&parsed_json, &mut serializer)
        .map_err(|e| ConfigError::WriteFile(e.to_string()))?;
    serialized.push(b'\n');

    let staging_path = path.with_extension(STAGING_FILE_EXTENSION);
    fs::write(&staging_path, serialized)
        .map_err(|e| ConfigError::WriteFile(format!("{}: {}", staging_path.display(), e)))?;
    fs::rename(&staging_path, path)
        .map_err(|e| ConfigError::WriteFile(format!("{}: {}", path.display(), e)))?;

    Ok(())
}
