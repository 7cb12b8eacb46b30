//! The top-level driver bringing a network's contract plan to its deployed state
//!
//! For each logical contract the orchestrator consults the registry and either
//! deploys a fresh proxy, or reuses the recorded one and optionally submits it
//! for verification. Upgrades are a separate, explicitly requested action.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Display},
};

use alloy_primitives::{Address, Bytes};
use deploy_common::types::{
    ContractSpec, DeployedContract, DeploymentAction, DeploymentPath, DeploymentResult,
    InitializerArg, NetworkConfig, ParamKind, ResolvedArg,
};
use itertools::Itertools;
use tracing::{error, info, warn};

use crate::{
    artifacts::ArtifactStore,
    deployer::ProxyDeployer,
    errors::DeployError,
    registry::{DeploymentRegistry, RegistryStore},
    transport::ChainClient,
    upgrader::ProxyUpgrader,
    utils::{initialize_calldata, proxy_constructor_args, proxy_contract_name},
    verifier::{ExplorerClient, VerificationAgent, VerificationRequest},
};

// -----------
// | OUTCOME |
// -----------

/// How a contract reached its terminal state in a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// A new implementation and proxy were deployed
    FreshDeploy,
    /// The recorded deployment was reused
    Reused,
    /// The recorded deployment was reused and its source is verified
    ReusedAndVerified,
    /// The recorded proxy was repointed at a new implementation
    Upgraded,
}

impl Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::FreshDeploy => write!(f, "deployed"),
            Completion::Reused => write!(f, "reused"),
            Completion::ReusedAndVerified => write!(f, "reused and verified"),
            Completion::Upgraded => write!(f, "upgraded"),
        }
    }
}

/// The terminal state of a single contract in a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractOutcome {
    /// The contract reached its deployed state
    Done {
        /// The logical name of the contract
        name: String,
        /// How the deployed state was reached
        completion: Completion,
        /// The resulting addresses
        result: DeploymentResult,
    },
    /// The contract failed; independent contracts were still processed
    Failed {
        /// The logical name of the contract
        name: String,
        /// Why the contract failed
        error: DeployError,
    },
}

impl ContractOutcome {
    /// The logical name of the contract
    pub fn name(&self) -> &str {
        match self {
            ContractOutcome::Done { name, .. } | ContractOutcome::Failed { name, .. } => name,
        }
    }
}

/// The per-contract outcomes of a run on one network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// The name of the network
    pub network: String,
    /// The outcomes, in processing order
    pub outcomes: Vec<ContractOutcome>,
}

impl RunReport {
    /// Whether any contract failed
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| matches!(outcome, ContractOutcome::Failed { .. }))
    }

    /// The outcome of the named contract
    pub fn outcome(&self, name: &str) -> Option<&ContractOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name() == name)
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.network)?;
        for outcome in &self.outcomes {
            match outcome {
                ContractOutcome::Done {
                    name,
                    completion,
                    result,
                } => writeln!(
                    f,
                    "  {name}: {completion} (proxy {:#x}, implementation {:#x})",
                    result.proxy, result.implementation
                )?,
                ContractOutcome::Failed { name, error } => {
                    writeln!(f, "  {name}: failed: {error}")?
                }
            }
        }

        Ok(())
    }
}

// ----------------
// | ORCHESTRATOR |
// ----------------

/// Drives deployments, verifications, and upgrades for one network
pub struct DeploymentOrchestrator<'a, C: ChainClient, E: ExplorerClient, S: RegistryStore> {
    /// The network being deployed to
    config: &'a NetworkConfig,
    /// The deployed-address registry
    registry: DeploymentRegistry<S>,
    /// The chain client
    client: &'a C,
    /// The block explorer transport
    explorer: &'a E,
    /// The creation bytecode of every contract in the plan
    artifacts: &'a ArtifactStore,
    /// Whether to verify every reused contract, regardless of its `verify` flag
    verify_all: bool,
}

impl<'a, C: ChainClient, E: ExplorerClient, S: RegistryStore>
    DeploymentOrchestrator<'a, C, E, S>
{
    /// Create an orchestrator
    pub fn new(
        config: &'a NetworkConfig,
        registry: DeploymentRegistry<S>,
        client: &'a C,
        explorer: &'a E,
        artifacts: &'a ArtifactStore,
    ) -> Self {
        Self {
            config,
            registry,
            client,
            explorer,
            artifacts,
            verify_all: false,
        }
    }

    /// Verify every reused contract, regardless of its `verify` flag
    pub fn verify_all(mut self, verify_all: bool) -> Self {
        self.verify_all = verify_all;
        self
    }

    /// The deployed-address registry
    pub fn registry(&self) -> &DeploymentRegistry<S> {
        &self.registry
    }

    /// Validate the whole contract plan and return it in processing order.
    ///
    /// Contracts keep their declared order, except that every contract runs
    /// after the contracts it references.
    pub fn plan(&self) -> Result<Vec<&'a ContractSpec>, DeployError> {
        let config: &'a NetworkConfig = self.config;
        for spec in &config.contracts {
            self.validate_spec(spec)?;
        }

        let order = dependency_order(&config.contracts)?;
        Ok(order.into_iter().map(|i| &config.contracts[i]).collect())
    }

    /// Bring every contract in the plan to its deployed state
    pub async fn run(&mut self) -> Result<RunReport, DeployError> {
        check_chain_id(self.client, self.config).await?;
        let plan = self.plan()?;
        info!(
            "running {} contracts on {}: {}",
            plan.len(),
            self.config.name,
            plan.iter().map(|spec| spec.name.as_str()).join(", ")
        );

        let mut outcomes = Vec::with_capacity(plan.len());
        for spec in plan {
            let outcome = match self.deploy_or_reuse(spec).await {
                Ok((completion, result)) => {
                    info!("{}: {completion}", spec.name);
                    ContractOutcome::Done {
                        name: spec.name.clone(),
                        completion,
                        result,
                    }
                }
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => {
                    error!("{}: {e}", spec.name);
                    ContractOutcome::Failed {
                        name: spec.name.clone(),
                        error: e,
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(RunReport {
            network: self.config.name.clone(),
            outcomes,
        })
    }

    /// Upgrade the named contracts, in the given order
    pub async fn upgrade(&mut self, names: &[String]) -> Result<RunReport, DeployError> {
        check_chain_id(self.client, self.config).await?;
        self.plan()?;

        let config: &'a NetworkConfig = self.config;
        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let spec = config.contract(name).ok_or_else(|| {
                DeployError::Configuration(format!("`{name}` is not in the {} plan", config.name))
            })?;

            let outcome = match self.upgrade_contract(spec).await {
                Ok(result) => {
                    info!("{name}: {}", Completion::Upgraded);
                    ContractOutcome::Done {
                        name: name.clone(),
                        completion: Completion::Upgraded,
                        result,
                    }
                }
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => {
                    error!("{name}: {e}");
                    ContractOutcome::Failed {
                        name: name.clone(),
                        error: e,
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(RunReport {
            network: config.name.clone(),
            outcomes,
        })
    }

    // -----------
    // | HELPERS |
    // -----------

    /// Check a contract's declared arguments against the config and its class
    fn validate_spec(&self, spec: &ContractSpec) -> Result<(), DeployError> {
        let params = spec.class.initializer_params();
        if params.len() != spec.args.len() {
            return Err(DeployError::Configuration(format!(
                "`{}`: {}.initialize takes {} arguments, {} declared",
                spec.name,
                spec.class,
                params.len(),
                spec.args.len()
            )));
        }

        for (i, (param, arg)) in params.iter().zip(&spec.args).enumerate() {
            let kind = match arg {
                InitializerArg::Default(role) => {
                    if self.config.default_address(role).is_none() {
                        return Err(DeployError::Configuration(format!(
                            "`{}` references unknown default address `{role}`",
                            spec.name
                        )));
                    }
                    ParamKind::Address
                }
                InitializerArg::Deployed(dependency) => {
                    let known = self.config.contract(dependency).is_some()
                        || self
                            .registry
                            .lookup(&self.config.name, dependency)
                            .is_some();
                    if !known {
                        return Err(DeployError::Configuration(format!(
                            "`{}` references unknown contract `{dependency}`",
                            spec.name
                        )));
                    }
                    ParamKind::Address
                }
                InitializerArg::Address(_) => ParamKind::Address,
                InitializerArg::Uint(_) => ParamKind::Uint,
            };

            if kind != *param {
                return Err(DeployError::Configuration(format!(
                    "`{}`: argument {i} of {}.initialize must be {param}, got {kind}",
                    spec.name, spec.class
                )));
            }
        }

        Ok(())
    }

    /// Resolve a declared argument against the config and the registry
    fn resolve_arg(
        &self,
        spec: &ContractSpec,
        arg: &InitializerArg,
    ) -> Result<ResolvedArg, DeployError> {
        match arg {
            InitializerArg::Default(role) => self
                .config
                .default_address(role)
                .map(ResolvedArg::Address)
                .ok_or_else(|| {
                    DeployError::Configuration(format!("unknown default address `{role}`"))
                }),
            InitializerArg::Deployed(dependency) => self
                .registry
                .lookup(&self.config.name, dependency)
                .map(|deployed| ResolvedArg::Address(deployed.proxy))
                .ok_or_else(|| DeployError::DependencyUnavailable {
                    contract: spec.name.clone(),
                    dependency: dependency.clone(),
                }),
            InitializerArg::Address(address) => Ok(ResolvedArg::Address(*address)),
            InitializerArg::Uint(value) => Ok(ResolvedArg::Uint(*value)),
        }
    }

    /// Build the deployment action for a contract
    fn build_action(&self, spec: &ContractSpec) -> Result<DeploymentAction, DeployError> {
        let args = spec
            .args
            .iter()
            .map(|arg| self.resolve_arg(spec, arg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DeploymentAction {
            name: spec.name.clone(),
            network: self.config.name.clone(),
            class: spec.class,
            proxy_kind: spec.proxy,
            args,
            verify: spec.verify || self.verify_all,
        })
    }

    /// Deploy a contract if it is not recorded, otherwise reuse it
    async fn deploy_or_reuse(
        &mut self,
        spec: &ContractSpec,
    ) -> Result<(Completion, DeploymentResult), DeployError> {
        let config: &'a NetworkConfig = self.config;
        let network = config.name.as_str();

        // A recorded contract is reused without resolving its arguments, so a
        // dependency failing in this run does not affect it
        if let Some(deployed) = self.registry.lookup(network, &spec.name) {
            info!(
                "{} already deployed on {network} at {:#x}",
                spec.name, deployed.proxy
            );
            let mut result = DeploymentResult {
                proxy: deployed.proxy,
                implementation: deployed.implementation,
                path: DeploymentPath::Reused,
            };
            if !(spec.verify || self.verify_all) {
                return Ok((Completion::Reused, result));
            }

            if !self.verify_recorded(spec, deployed).await {
                warn!("{} left unverified", spec.name);
                return Ok((Completion::Reused, result));
            }

            result.path = DeploymentPath::ReusedAndVerified;
            return Ok((Completion::ReusedAndVerified, result));
        }

        let action = self.build_action(spec)?;
        let result = ProxyDeployer::new(self.client, self.artifacts)
            .deploy_fresh(network, &action)
            .await?;
        self.registry.record(network, &spec.name, result.deployed())?;

        Ok((Completion::FreshDeploy, result))
    }

    /// Submit a recorded deployment for verification, returning whether its
    /// implementation is verified.
    ///
    /// The implementation is submitted first. The proxy follows as a best
    /// effort: its constructor arguments are rebuilt from the current plan and
    /// the recorded implementation, so they only match a proxy that has not
    /// been upgraded since it was deployed.
    async fn verify_recorded(&self, spec: &ContractSpec, deployed: DeployedContract) -> bool {
        let agent = VerificationAgent::new(self.explorer);

        let implementation_request =
            self.verification_request(deployed.implementation, spec.class.name(), Bytes::new());
        if !agent.verify(&implementation_request).await.is_verified() {
            return false;
        }

        let init_calldata = self
            .build_action(spec)
            .and_then(|action| initialize_calldata(action.class, &action.args));
        match init_calldata {
            Ok(init_calldata) => {
                let constructor_args = proxy_constructor_args(
                    spec.proxy,
                    deployed.implementation,
                    self.client.sender(),
                    init_calldata,
                );
                let proxy_request = self.verification_request(
                    deployed.proxy,
                    proxy_contract_name(spec.proxy),
                    constructor_args,
                );
                agent.verify(&proxy_request).await;
            }
            Err(e) => warn!("skipping {} proxy verification: {e}", spec.name),
        }

        true
    }

    /// A verification request for a contract deployed on this network
    fn verification_request(
        &self,
        address: Address,
        contract_name: &str,
        constructor_args: Bytes,
    ) -> VerificationRequest {
        VerificationRequest {
            network: self.config.name.clone(),
            chain_id: self.config.chain_id,
            explorer_api_url: self.config.explorer_api_url.clone(),
            address,
            contract_name: contract_name.to_string(),
            constructor_args,
        }
    }

    /// Repoint a recorded proxy at a new implementation
    async fn upgrade_contract(
        &mut self,
        spec: &ContractSpec,
    ) -> Result<DeploymentResult, DeployError> {
        let network = self.config.name.clone();
        let deployed = self
            .registry
            .lookup(&network, &spec.name)
            .ok_or_else(|| DeployError::NothingToUpgrade(spec.name.clone()))?;

        // Upgrades do not re-run the initializer
        let action = DeploymentAction {
            name: spec.name.clone(),
            network: network.clone(),
            class: spec.class,
            proxy_kind: spec.proxy,
            args: Vec::new(),
            verify: false,
        };

        let result = ProxyUpgrader::new(self.client, self.artifacts)
            .upgrade(&network, &action, deployed.proxy)
            .await?;
        self.registry.record(&network, &spec.name, result.deployed())?;

        Ok(result)
    }
}

/// Refuse to touch a chain other than the one the config describes
pub async fn check_chain_id<C: ChainClient>(
    client: &C,
    config: &NetworkConfig,
) -> Result<(), DeployError> {
    let chain_id = client
        .chain_id()
        .await
        .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;

    if chain_id != config.chain_id {
        return Err(DeployError::Configuration(format!(
            "RPC endpoint is on chain {chain_id}, but {} is chain {}",
            config.name, config.chain_id
        )));
    }

    Ok(())
}

/// Order the plan so every contract follows the contracts it references,
/// otherwise keeping declared order
fn dependency_order(contracts: &[ContractSpec]) -> Result<Vec<usize>, DeployError> {
    let index: HashMap<&str, usize> = contracts
        .iter()
        .enumerate()
        .map(|(i, spec)| (spec.name.as_str(), i))
        .collect();

    let mut pending_deps = vec![0usize; contracts.len()];
    let mut dependents = vec![Vec::new(); contracts.len()];
    for (i, spec) in contracts.iter().enumerate() {
        // References to contracts outside the plan are satisfied by the registry
        for dep in spec.dependencies().unique().filter_map(|name| index.get(name)) {
            pending_deps[i] += 1;
            dependents[*dep].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..contracts.len())
        .filter(|i| pending_deps[*i] == 0)
        .collect();
    let mut order = Vec::with_capacity(contracts.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &dependent in &dependents[i] {
            pending_deps[dependent] -= 1;
            if pending_deps[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != contracts.len() {
        let cycle = contracts
            .iter()
            .enumerate()
            .filter(|(i, _)| pending_deps[*i] > 0)
            .map(|(_, spec)| spec.name.as_str())
            .join(", ");
        return Err(DeployError::Configuration(format!("dependency cycle between {cycle}")));
    }

    Ok(order)
}
