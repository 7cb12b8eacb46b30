//! Common types used throughout the deployment tooling

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    str::FromStr,
};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Deserializer};

// -----------
// | NETWORK |
// -----------

/// The declarative record describing a single network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The name of the network, e.g. `sepolia`
    pub name: String,
    /// The EIP-155 chain ID of the network
    pub chain_id: u64,
    /// The browser URL of the network's block explorer
    pub explorer_url: String,
    /// The API URL of the network's block explorer, used for source verification
    pub explorer_api_url: String,
    /// External addresses the deployed contracts depend on, keyed by role
    pub default_addresses: BTreeMap<String, Address>,
    /// Addresses recorded by prior deployments, keyed by logical contract name
    pub deployed_addresses: BTreeMap<String, DeployedContract>,
    /// The ordered contract plan for this network
    pub contracts: Vec<ContractSpec>,
}

impl NetworkConfig {
    /// Look up an external dependency address by role
    pub fn default_address(&self, role: &str) -> Option<Address> {
        self.default_addresses.get(role).copied()
    }

    /// Look up a contract in the plan by logical name
    pub fn contract(&self, name: &str) -> Option<&ContractSpec> {
        self.contracts.iter().find(|spec| spec.name == name)
    }
}

/// The addresses backing a deployed logical contract
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The address of the proxy, which callers use
    pub proxy: Address,
    /// The address of the implementation the proxy delegates to
    pub implementation: Address,
}

// ---------------------
// | CONTRACT CLASSES |
// ---------------------

/// The contract classes this tooling knows how to deploy behind a proxy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum ContractClass {
    /// The `GatewaySend` contract, deployed on EVM chains
    GatewaySend,
    /// The `GatewayCrossChain` contract, deployed on ZetaChain
    GatewayCrossChain,
    /// The `GatewayTransferNative` contract, deployed on ZetaChain
    GatewayTransferNative,
}

impl ContractClass {
    /// The name of the contract as it appears in compilation artifacts
    pub const fn name(&self) -> &'static str {
        match self {
            ContractClass::GatewaySend => "GatewaySend",
            ContractClass::GatewayCrossChain => "GatewayCrossChain",
            ContractClass::GatewayTransferNative => "GatewayTransferNative",
        }
    }

    /// The parameter kinds of the contract's `initialize` method, in order
    pub const fn initializer_params(&self) -> &'static [ParamKind] {
        use ParamKind::{Address, Uint};
        match self {
            // gateway, DODO route proxy, DODO approve, gas limit
            ContractClass::GatewaySend => &[Address, Address, Address, Uint],
            // gateway, multisig, DODO route proxy, DODO approve, fee percent, slippage, gas limit
            ContractClass::GatewayCrossChain | ContractClass::GatewayTransferNative => {
                &[Address, Address, Address, Address, Uint, Uint, Uint]
            }
        }
    }
}

impl Display for ContractClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The ABI kind of an initializer parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// An `address` parameter
    Address,
    /// A `uint256` parameter
    Uint,
}

impl Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Address => write!(f, "address"),
            ParamKind::Uint => write!(f, "uint256"),
        }
    }
}

/// The flavour of upgradeable proxy placed in front of an implementation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    /// An `ERC1967Proxy`, upgraded by calling `upgradeToAndCall` on the proxy itself
    #[default]
    Uups,
    /// A `TransparentUpgradeableProxy`, upgraded through its `ProxyAdmin`
    Transparent,
}

impl Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Uups => write!(f, "uups"),
            ProxyKind::Transparent => write!(f, "transparent"),
        }
    }
}

// -----------------
// | CONTRACT PLAN |
// -----------------

/// A single entry of a network's contract plan
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ContractSpec {
    /// The logical name of the contract, e.g. `GatewaySend`
    pub name: String,
    /// The class of the implementation contract
    pub class: ContractClass,
    /// The proxy flavour to deploy in front of the implementation
    #[serde(default)]
    pub proxy: ProxyKind,
    /// The arguments passed to the implementation's `initialize` method, in order
    #[serde(default)]
    pub args: Vec<InitializerArg>,
    /// Whether to submit the contract for source verification when it is reused
    #[serde(default)]
    pub verify: bool,
}

impl ContractSpec {
    /// The logical names of the contracts this contract's arguments reference
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            InitializerArg::Deployed(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// A declared initializer argument, resolved against the network config at deploy time
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitializerArg {
    /// A default address, looked up by role
    Default(String),
    /// The proxy address of another logical contract in the plan
    Deployed(String),
    /// A literal address
    Address(Address),
    /// A literal `uint256`, given as a decimal or `0x`-prefixed string, or a JSON number
    Uint(#[serde(deserialize_with = "deserialize_uint")] U256),
}

/// Deserialize a `uint256` from either a JSON number or a string
fn deserialize_uint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    /// The accepted representations of a `uint256` literal
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UintRepr {
        /// A JSON number
        Number(u64),
        /// A decimal or `0x`-prefixed string
        Text(String),
    }

    match UintRepr::deserialize(deserializer)? {
        UintRepr::Number(n) => Ok(U256::from(n)),
        UintRepr::Text(s) => U256::from_str(s.trim()).map_err(serde::de::Error::custom),
    }
}

/// An initializer argument after resolution to a concrete value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedArg {
    /// An address value
    Address(Address),
    /// A `uint256` value
    Uint(U256),
}

impl ResolvedArg {
    /// The ABI kind of this value
    pub const fn kind(&self) -> ParamKind {
        match self {
            ResolvedArg::Address(_) => ParamKind::Address,
            ResolvedArg::Uint(_) => ParamKind::Uint,
        }
    }

    /// The address held by this value, if it is one
    pub const fn as_address(&self) -> Option<Address> {
        match self {
            ResolvedArg::Address(addr) => Some(*addr),
            ResolvedArg::Uint(_) => None,
        }
    }

    /// The integer held by this value, if it is one
    pub const fn as_uint(&self) -> Option<U256> {
        match self {
            ResolvedArg::Uint(value) => Some(*value),
            ResolvedArg::Address(_) => None,
        }
    }
}

impl Display for ResolvedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedArg::Address(addr) => write!(f, "{addr:#x}"),
            ResolvedArg::Uint(value) => write!(f, "{value}"),
        }
    }
}

// -----------
// | ACTIONS |
// -----------

/// A request to bring a single logical contract to its deployed state on a network
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentAction {
    /// The logical name of the contract
    pub name: String,
    /// The name of the target network
    pub network: String,
    /// The class of the implementation contract
    pub class: ContractClass,
    /// The proxy flavour
    pub proxy_kind: ProxyKind,
    /// The resolved initializer arguments, in order
    pub args: Vec<ResolvedArg>,
    /// Whether to attempt verification if the contract is reused
    pub verify: bool,
}

/// The path a deployment action took
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentPath {
    /// A new implementation was deployed
    FreshDeploy,
    /// The recorded addresses were reused
    Reused,
    /// The recorded addresses were reused and the explorer confirmed verification
    ReusedAndVerified,
}

impl Display for DeploymentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentPath::FreshDeploy => write!(f, "fresh deploy"),
            DeploymentPath::Reused => write!(f, "reused"),
            DeploymentPath::ReusedAndVerified => write!(f, "reused and verified"),
        }
    }
}

/// The outcome of a successful deployment action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeploymentResult {
    /// The address of the proxy
    pub proxy: Address,
    /// The address of the implementation backing the proxy
    pub implementation: Address,
    /// The path taken to arrive at these addresses
    pub path: DeploymentPath,
}

impl DeploymentResult {
    /// The registry entry corresponding to this result
    pub const fn deployed(&self) -> DeployedContract {
        DeployedContract {
            proxy: self.proxy,
            implementation: self.implementation,
        }
    }
}
