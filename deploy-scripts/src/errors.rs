//! Definitions of errors that can occur during deployment of the contracts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::{Address, TxHash};
use deploy_common::errors::ConfigError;

/// Errors that can occur while deploying, upgrading, or verifying a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// The network config or contract plan is invalid
    Configuration(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// A transaction for the given contract failed on chain
    TransactionFailure {
        /// The logical name of the contract
        contract: String,
        /// An implementation that landed on chain but is not referenced by any proxy
        orphaned_implementation: Option<Address>,
        /// The underlying failure
        reason: ChainError,
    },
    /// The address given as a proxy is not an upgradeable proxy
    InvalidProxyTarget {
        /// The logical name of the contract
        contract: String,
        /// The address that failed the check
        proxy: Address,
        /// Why the address was rejected
        reason: String,
    },
    /// An upgrade was requested for a contract that was never deployed
    NothingToUpgrade(String),
    /// A contract references another contract that is unavailable in this run
    DependencyUnavailable {
        /// The logical name of the contract
        contract: String,
        /// The logical name of the unavailable dependency
        dependency: String,
    },
    /// Error persisting the deployed-address registry
    Persistence(String),
}

impl DeployError {
    /// Whether the error should abort the whole run, rather than just the contract at hand
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            DeployError::Configuration(_)
                | DeployError::ArtifactParsing(_)
                | DeployError::ClientInitialization(_)
                | DeployError::Persistence(_)
        )
    }
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::Configuration(s) => write!(f, "configuration error: {}", s),
            DeployError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            DeployError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            DeployError::TransactionFailure {
                contract,
                orphaned_implementation,
                reason,
            } => {
                write!(f, "transaction for `{}` failed: {}", contract, reason)?;
                if let Some(implementation) = orphaned_implementation {
                    write!(f, " (orphaned implementation at {:#x})", implementation)?;
                }
                Ok(())
            }
            DeployError::InvalidProxyTarget {
                contract,
                proxy,
                reason,
            } => write!(
                f,
                "{:#x} is not a valid proxy for `{}`: {}",
                proxy, contract, reason
            ),
            DeployError::NothingToUpgrade(name) => {
                write!(f, "`{}` has no recorded deployment to upgrade", name)
            }
            DeployError::DependencyUnavailable {
                contract,
                dependency,
            } => write!(
                f,
                "`{}` depends on `{}`, which is unavailable",
                contract, dependency
            ),
            DeployError::Persistence(s) => write!(f, "error persisting deployments: {}", s),
        }
    }
}

impl Error for DeployError {}

impl From<ConfigError> for DeployError {
    fn from(e: ConfigError) -> Self {
        DeployError::Configuration(e.to_string())
    }
}

/// Errors reported by the chain transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Error communicating with the RPC endpoint
    Rpc(String),
    /// The transaction was mined but reverted
    Reverted(TxHash),
    /// No receipt appeared for the transaction within the polling budget
    ConfirmationTimeout(TxHash),
    /// A creation transaction's receipt carries no contract address
    MissingContractAddress(TxHash),
    /// The proxy's implementation slot does not hold the expected address
    ImplementationMismatch {
        /// The implementation that should be in the slot
        expected: Address,
        /// The implementation found in the slot
        found: Address,
    },
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Rpc(s) => write!(f, "rpc error: {}", s),
            ChainError::Reverted(hash) => write!(f, "transaction {:#x} reverted", hash),
            ChainError::ConfirmationTimeout(hash) => {
                write!(f, "no receipt for transaction {:#x}", hash)
            }
            ChainError::MissingContractAddress(hash) => {
                write!(f, "transaction {:#x} created no contract", hash)
            }
            ChainError::ImplementationMismatch { expected, found } => write!(
                f,
                "implementation slot holds {:#x}, expected {:#x}",
                found, expected
            ),
        }
    }
}

impl Error for ChainError {}
