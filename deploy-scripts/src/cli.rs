//! Definitions of CLI arguments and commands for deploy scripts

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use deploy_common::types::NetworkConfig;

use crate::{
    commands::{deploy, status, upgrade},
    errors::DeployError,
    orchestrator::RunReport,
    transport::ChainClient,
};

#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Path to the network config file, e.g. `config/arb_sepolia.json`.
    ///
    /// The network is named after the file stem, and the file's `deployedAddress`
    /// section is rewritten as contracts are deployed.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory of compilation artifacts, in either the Foundry
    /// (`<Name>.sol/<Name>.json`) or Hardhat (`<Name>.json`) layout
    #[arg(short, long, default_value = "out")]
    pub artifacts: PathBuf,

    /// Milliseconds between transaction receipt polls
    #[arg(long, default_value_t = 500)]
    pub receipt_poll_interval_ms: u64,

    /// Receipt polls before a transaction is considered unconfirmed
    #[arg(long, default_value_t = 120)]
    pub receipt_poll_attempts: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy every contract in the network's plan that is not yet recorded,
    /// reusing the ones that are
    Deploy(DeployArgs),
    /// Repoint recorded proxies at freshly deployed implementations
    Upgrade(UpgradeArgs),
    /// Compare the recorded deployments against the chain
    Status,
}

impl Command {
    /// Run the command, returning the run's report if it produced one
    pub async fn run(
        self,
        client: &impl ChainClient,
        config: &NetworkConfig,
        config_path: &Path,
        artifacts_dir: &Path,
    ) -> Result<Option<RunReport>, DeployError> {
        match self {
            Command::Deploy(args) => deploy(args, client, config, config_path, artifacts_dir)
                .await
                .map(Some),
            Command::Upgrade(args) => upgrade(args, client, config, config_path, artifacts_dir)
                .await
                .map(Some),
            Command::Status => status(client, config).await.map(|_| None),
        }
    }
}

/// Deploy or reuse the network's contracts.
///
/// Recorded contracts are reused as-is. With `verify` set (or a contract's own
/// `verify` flag in the config), reused contracts are also submitted to the
/// network's block explorer through `forge verify-contract`.
#[derive(Args)]
pub struct DeployArgs {
    /// Submit every reused contract for source verification
    #[arg(long)]
    pub verify: bool,

    /// API key of the network's block explorer
    #[arg(long, env = "EXPLORER_API_KEY", default_value = "")]
    pub explorer_api_key: String,

    /// Root of the Foundry project holding the contract sources
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,
}

/// Upgrade recorded contracts.
///
/// Each proxy is checked before anything is submitted. UUPS proxies are
/// upgraded through `upgradeToAndCall` on the proxy, transparent proxies
/// through their `ProxyAdmin`.
#[derive(Args)]
pub struct UpgradeArgs {
    /// Logical names of the contracts to upgrade, e.g. `GatewaySend`
    #[arg(long = "contract", required = true)]
    pub contracts: Vec<String>,
}
