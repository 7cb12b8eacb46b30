//! Repointing an existing proxy at a freshly deployed implementation

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use deploy_common::types::{DeploymentAction, DeploymentPath, DeploymentResult, ProxyKind};
use tracing::{debug, info, warn};

use crate::{
    artifacts::ArtifactStore,
    constants::{IMPLEMENTATION_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT},
    deployer::transaction_failure,
    errors::{ChainError, DeployError},
    solidity::{IProxyAdmin, IUUPSUpgradeable},
    transport::{
        deploy_contract, read_address_slot, send_and_confirm, ChainClient, ChainTransaction,
    },
};

/// Where the repoint transaction for a proxy is sent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UpgradeRoute {
    /// `upgradeToAndCall` on the proxy itself
    Uups,
    /// `upgradeAndCall` on the proxy's admin contract
    Transparent {
        /// The address of the `ProxyAdmin`
        admin: Address,
    },
}

/// Deploys new implementations and repoints existing proxies at them
pub struct ProxyUpgrader<'a, C: ChainClient> {
    /// The chain client to upgrade with
    client: &'a C,
    /// The creation bytecode of the implementations
    artifacts: &'a ArtifactStore,
}

impl<'a, C: ChainClient> ProxyUpgrader<'a, C> {
    /// Create an upgrader
    pub fn new(client: &'a C, artifacts: &'a ArtifactStore) -> Self {
        Self { client, artifacts }
    }

    /// Deploy a new implementation of the action's class and repoint
    /// `existing_proxy` at it.
    ///
    /// The proxy is checked before anything is submitted. The returned result
    /// carries the unchanged proxy address and the new implementation.
    pub async fn upgrade(
        &self,
        network: &str,
        action: &DeploymentAction,
        existing_proxy: Address,
    ) -> Result<DeploymentResult, DeployError> {
        let route = self.check_proxy(action, existing_proxy).await?;
        let bytecode = self.artifacts.bytecode(action.class.name())?;

        info!("deploying new {} implementation on {network}", action.name);
        let new_implementation = deploy_contract(self.client, bytecode)
            .await
            .map_err(|e| transaction_failure(&action.name, None, e))?;
        info!(
            "{} implementation deployed at {new_implementation:#x}",
            action.name
        );

        let repoint = match route {
            UpgradeRoute::Uups => ChainTransaction::call(
                existing_proxy,
                IUUPSUpgradeable::upgradeToAndCallCall {
                    newImplementation: new_implementation,
                    data: Bytes::new(),
                }
                .abi_encode()
                .into(),
            ),
            UpgradeRoute::Transparent { admin } => ChainTransaction::call(
                admin,
                IProxyAdmin::upgradeAndCallCall {
                    proxy: existing_proxy,
                    implementation: new_implementation,
                    data: Bytes::new(),
                }
                .abi_encode()
                .into(),
            ),
        };

        // The new implementation is orphaned unless the repoint lands
        let orphaned = |e| {
            warn!(
                "{} implementation {new_implementation:#x} is orphaned",
                action.name
            );
            transaction_failure(&action.name, Some(new_implementation), e)
        };

        debug!("repointing {} proxy {existing_proxy:#x}", action.name);
        send_and_confirm(self.client, repoint).await.map_err(orphaned)?;

        let resolved = read_address_slot(self.client, existing_proxy, IMPLEMENTATION_STORAGE_SLOT)
            .await
            .map_err(orphaned)?;
        if resolved != new_implementation {
            return Err(orphaned(ChainError::ImplementationMismatch {
                expected: new_implementation,
                found: resolved,
            }));
        }
        info!(
            "{} proxy {existing_proxy:#x} now points at {new_implementation:#x}",
            action.name
        );

        Ok(DeploymentResult {
            proxy: existing_proxy,
            implementation: new_implementation,
            path: DeploymentPath::FreshDeploy,
        })
    }

    /// Check that `proxy` is an upgradeable proxy of the action's flavour,
    /// returning where its repoint must be sent
    async fn check_proxy(
        &self,
        action: &DeploymentAction,
        proxy: Address,
    ) -> Result<UpgradeRoute, DeployError> {
        let invalid = |reason: &str| DeployError::InvalidProxyTarget {
            contract: action.name.clone(),
            proxy,
            reason: reason.to_string(),
        };
        let rpc_failure = |e| transaction_failure(&action.name, None, e);

        let code = self.client.code_at(proxy).await.map_err(rpc_failure)?;
        if code.is_empty() {
            return Err(invalid("no code at address"));
        }

        let current = read_address_slot(self.client, proxy, IMPLEMENTATION_STORAGE_SLOT)
            .await
            .map_err(rpc_failure)?;
        if current.is_zero() {
            return Err(invalid("EIP-1967 implementation slot is empty"));
        }
        debug!("{} proxy {proxy:#x} points at {current:#x}", action.name);

        match action.proxy_kind {
            ProxyKind::Uups => {
                let calldata = IUUPSUpgradeable::proxiableUUIDCall {}.abi_encode();
                let returned = self
                    .client
                    .call(current, calldata.into())
                    .await
                    .map_err(|_| invalid("current implementation does not answer proxiableUUID"))?;
                let uuid = IUUPSUpgradeable::proxiableUUIDCall::abi_decode_returns(&returned, true)
                    .map_err(|_| invalid("malformed proxiableUUID reply"))?
                    ._0;
                if uuid != IMPLEMENTATION_STORAGE_SLOT {
                    return Err(invalid("proxiableUUID does not match the implementation slot"));
                }

                Ok(UpgradeRoute::Uups)
            }
            ProxyKind::Transparent => {
                let admin = read_address_slot(self.client, proxy, PROXY_ADMIN_STORAGE_SLOT)
                    .await
                    .map_err(rpc_failure)?;
                if admin.is_zero() {
                    return Err(invalid("EIP-1967 admin slot is empty"));
                }

                Ok(UpgradeRoute::Transparent { admin })
            }
        }
    }
}
