//! Implementations of the various deploy scripts

use std::path::Path;

use deploy_common::types::NetworkConfig;
use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    artifacts::ArtifactStore,
    cli::{DeployArgs, UpgradeArgs},
    constants::IMPLEMENTATION_STORAGE_SLOT,
    errors::DeployError,
    orchestrator::{check_chain_id, DeploymentOrchestrator, RunReport},
    registry::{DeploymentRegistry, JsonConfigStore},
    transport::{read_address_slot, ChainClient},
    utils::proxy_contract_name,
    verifier::ForgeExplorerClient,
};

/// Load the artifacts needed to deploy the named contracts of the plan
fn load_artifacts<'a>(
    config: &NetworkConfig,
    artifacts_dir: &Path,
    names: impl IntoIterator<Item = &'a str>,
    with_proxies: bool,
) -> Result<ArtifactStore, DeployError> {
    let specs = names
        .into_iter()
        .filter_map(|name| config.contract(name))
        .collect_vec();

    let mut required = specs.iter().map(|spec| spec.class.name()).collect_vec();
    if with_proxies {
        required.extend(specs.iter().map(|spec| proxy_contract_name(spec.proxy)));
    }

    ArtifactStore::load_dir(artifacts_dir, required.into_iter().unique())
}

/// Deploy every unrecorded contract of the plan and reuse the recorded ones
pub async fn deploy(
    args: DeployArgs,
    client: &impl ChainClient,
    config: &NetworkConfig,
    config_path: &Path,
    artifacts_dir: &Path,
) -> Result<RunReport, DeployError> {
    // Recorded contracts are never redeployed, so their artifacts are not needed
    let undeployed = config
        .contracts
        .iter()
        .map(|spec| spec.name.as_str())
        .filter(|name| !config.deployed_addresses.contains_key(*name));
    let artifacts = load_artifacts(config, artifacts_dir, undeployed, true /* with_proxies */)?;

    let registry = DeploymentRegistry::from_config(config, JsonConfigStore::new(config_path));
    let explorer = ForgeExplorerClient::new(args.explorer_api_key, args.project_root);

    let mut orchestrator =
        DeploymentOrchestrator::new(config, registry, client, &explorer, &artifacts)
            .verify_all(args.verify);
    orchestrator.run().await
}

/// Upgrade the named contracts
pub async fn upgrade(
    args: UpgradeArgs,
    client: &impl ChainClient,
    config: &NetworkConfig,
    config_path: &Path,
    artifacts_dir: &Path,
) -> Result<RunReport, DeployError> {
    let names = args.contracts.iter().map(String::as_str);
    let artifacts = load_artifacts(config, artifacts_dir, names, false /* with_proxies */)?;

    let registry = DeploymentRegistry::from_config(config, JsonConfigStore::new(config_path));
    // Upgrades never verify, so the explorer is never reached
    let explorer = ForgeExplorerClient::new(String::new(), artifacts_dir.to_path_buf());

    let mut orchestrator =
        DeploymentOrchestrator::new(config, registry, client, &explorer, &artifacts);
    orchestrator.upgrade(&args.contracts).await
}

/// Log every contract of the plan alongside its recorded and on-chain state
pub async fn status(client: &impl ChainClient, config: &NetworkConfig) -> Result<(), DeployError> {
    check_chain_id(client, config).await?;

    for spec in &config.contracts {
        let Some(deployed) = config.deployed_addresses.get(&spec.name) else {
            info!("{}: not deployed", spec.name);
            continue;
        };

        let on_chain = read_address_slot(client, deployed.proxy, IMPLEMENTATION_STORAGE_SLOT)
            .await
            .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
        if on_chain == deployed.implementation {
            info!(
                "{}: proxy {:#x}, implementation {:#x}",
                spec.name, deployed.proxy, deployed.implementation
            );
        } else {
            warn!(
                "{}: proxy {:#x} points at {on_chain:#x}, but {:#x} is recorded",
                spec.name, deployed.proxy, deployed.implementation
            );
        }
    }

    Ok(())
}
