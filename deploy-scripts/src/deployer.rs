//! Fresh deployment of an implementation and the proxy in front of it

use alloy_primitives::Address;
use deploy_common::types::{DeploymentAction, DeploymentPath, DeploymentResult, ProxyKind};
use tracing::{debug, info};

use crate::{
    artifacts::ArtifactStore,
    constants::{IMPLEMENTATION_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT},
    errors::{ChainError, DeployError},
    transport::{deploy_contract, read_address_slot, ChainClient},
    utils::{
        initialize_calldata, proxy_constructor_args, proxy_contract_name, with_constructor_args,
    },
};

/// Wrap a chain failure for the given contract
pub(crate) fn transaction_failure(
    contract: &str,
    orphaned_implementation: Option<Address>,
    reason: ChainError,
) -> DeployError {
    DeployError::TransactionFailure {
        contract: contract.to_string(),
        orphaned_implementation,
        reason,
    }
}

/// Deploys new implementations behind new proxies
pub struct ProxyDeployer<'a, C: ChainClient> {
    /// The chain client to deploy with
    client: &'a C,
    /// The creation bytecode of the implementations and proxies
    artifacts: &'a ArtifactStore,
}

impl<'a, C: ChainClient> ProxyDeployer<'a, C> {
    /// Create a deployer
    pub fn new(client: &'a C, artifacts: &'a ArtifactStore) -> Self {
        Self { client, artifacts }
    }

    /// Deploy the action's implementation and a proxy initialized with the
    /// action's arguments.
    ///
    /// No transaction is submitted if the arguments do not match the class's
    /// initializer, or if an artifact is missing.
    pub async fn deploy_fresh(
        &self,
        network: &str,
        action: &DeploymentAction,
    ) -> Result<DeploymentResult, DeployError> {
        let init_calldata = initialize_calldata(action.class, &action.args)?;
        let implementation_bytecode = self.artifacts.bytecode(action.class.name())?;
        let proxy_bytecode = self
            .artifacts
            .bytecode(proxy_contract_name(action.proxy_kind))?;

        info!("deploying {} implementation on {network}", action.name);
        let implementation = deploy_contract(self.client, implementation_bytecode)
            .await
            .map_err(|e| transaction_failure(&action.name, None, e))?;
        info!("{} implementation deployed at {implementation:#x}", action.name);

        // From here on a failure leaves the implementation orphaned
        let orphaned = |e| transaction_failure(&action.name, Some(implementation), e);

        let constructor_args = proxy_constructor_args(
            action.proxy_kind,
            implementation,
            self.client.sender(),
            init_calldata,
        );
        debug!("deploying {} proxy for {}", action.proxy_kind, action.name);
        let proxy = deploy_contract(
            self.client,
            with_constructor_args(&proxy_bytecode, &constructor_args),
        )
        .await
        .map_err(orphaned)?;

        let resolved = read_address_slot(self.client, proxy, IMPLEMENTATION_STORAGE_SLOT)
            .await
            .map_err(orphaned)?;
        if resolved != implementation {
            return Err(orphaned(ChainError::ImplementationMismatch {
                expected: implementation,
                found: resolved,
            }));
        }
        info!("{} proxy deployed at {proxy:#x}", action.name);

        if action.proxy_kind == ProxyKind::Transparent {
            // The proxy deploys its own admin, recorded only in the EIP-1967 admin slot
            let admin = read_address_slot(self.client, proxy, PROXY_ADMIN_STORAGE_SLOT)
                .await
                .map_err(orphaned)?;
            info!("{} proxy admin deployed at {admin:#x}", action.name);
        }

        Ok(DeploymentResult {
            proxy,
            implementation: resolved,
            path: DeploymentPath::FreshDeploy,
        })
    }
}
