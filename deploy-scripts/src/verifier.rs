//! Source verification of deployed contracts on a block explorer

use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use alloy_primitives::{hex, Address, Bytes};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::constants::{
    BLOCKSCOUT_ALREADY_VERIFIED, ETHERSCAN_ALREADY_VERIFIED, FORGE_ALREADY_VERIFIED_MARKER,
    FORGE_COMMAND, FORGE_DETAILS_PREFIX, VERIFY_CONTRACT_SUBCOMMAND,
};

/// A request to verify the source of a deployed contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The name of the network the contract is deployed on
    pub network: String,
    /// The EIP-155 chain ID of the network
    pub chain_id: u64,
    /// The explorer's verification API URL
    pub explorer_api_url: String,
    /// The address of the deployed contract
    pub address: Address,
    /// The name of the contract in its compilation artifacts
    pub contract_name: String,
    /// The ABI-encoded constructor arguments
    pub constructor_args: Bytes,
}

/// The explorer's reason for rejecting a verification request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorerError(pub String);

impl Display for ExplorerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transport that submits verification requests to a block explorer
#[allow(async_fn_in_trait)]
pub trait ExplorerClient {
    /// Submit the request, returning the explorer's reason if it is not accepted
    async fn submit_verification(&self, request: &VerificationRequest)
        -> Result<(), ExplorerError>;
}

/// The outcome of a verification attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The explorer accepted and verified the source
    Verified,
    /// The explorer already had the source verified
    AlreadyVerified,
    /// Verification failed for the given reason
    Failed(String),
}

impl VerificationStatus {
    /// Whether the contract's source is verified after the attempt
    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Verified | VerificationStatus::AlreadyVerified
        )
    }
}

/// Whether an explorer reply means the contract is already verified
pub fn is_already_verified(reason: &str) -> bool {
    reason == ETHERSCAN_ALREADY_VERIFIED || reason == BLOCKSCOUT_ALREADY_VERIFIED
}

/// Submits deployed contracts for verification and classifies the reply
pub struct VerificationAgent<'a, E: ExplorerClient> {
    /// The explorer transport
    explorer: &'a E,
}

impl<'a, E: ExplorerClient> VerificationAgent<'a, E> {
    /// Create an agent over an explorer transport
    pub fn new(explorer: &'a E) -> Self {
        Self { explorer }
    }

    /// Submit a single verification request. Failures are reported, never retried.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationStatus {
        debug!(
            "verifying {} at {:#x} on {}",
            request.contract_name, request.address, request.network
        );

        let status = match self.explorer.submit_verification(request).await {
            Ok(()) => VerificationStatus::Verified,
            Err(ExplorerError(reason)) if is_already_verified(&reason) => {
                VerificationStatus::AlreadyVerified
            }
            Err(ExplorerError(reason)) => VerificationStatus::Failed(reason),
        };

        match &status {
            VerificationStatus::Verified => {
                info!("{} at {:#x} verified", request.contract_name, request.address)
            }
            VerificationStatus::AlreadyVerified => info!(
                "{} at {:#x} already verified",
                request.contract_name, request.address
            ),
            VerificationStatus::Failed(reason) => warn!(
                "verification of {} at {:#x} failed: {reason}",
                request.contract_name, request.address
            ),
        }

        status
    }
}

// ---------
// | FORGE |
// ---------

/// An [`ExplorerClient`] that shells out to `forge verify-contract`
#[derive(Clone, Debug)]
pub struct ForgeExplorerClient {
    /// The API key of the explorer
    api_key: String,
    /// The Foundry project root holding the contract sources
    project_root: PathBuf,
}

impl ForgeExplorerClient {
    /// Create a client verifying sources from the Foundry project at `project_root`
    pub fn new(api_key: String, project_root: PathBuf) -> Self {
        Self {
            api_key,
            project_root,
        }
    }

    /// The arguments passed to `forge` for a request
    pub fn command_args(&self, request: &VerificationRequest) -> Vec<String> {
        let mut args = vec![
            VERIFY_CONTRACT_SUBCOMMAND.to_string(),
            "--chain".to_string(),
            request.chain_id.to_string(),
            "--verifier-url".to_string(),
            request.explorer_api_url.clone(),
            "--etherscan-api-key".to_string(),
            self.api_key.clone(),
            "--watch".to_string(),
        ];
        if !request.constructor_args.is_empty() {
            args.push("--constructor-args".to_string());
            args.push(hex::encode_prefixed(&request.constructor_args));
        }
        args.push(format!("{:#x}", request.address));
        args.push(request.contract_name.clone());

        args
    }
}

/// Classify the output of a `forge verify-contract` invocation
pub fn classify_forge_output(
    success: bool,
    stdout: &str,
    stderr: &str,
) -> Result<(), ExplorerError> {
    let already_verified = [stdout, stderr]
        .iter()
        .any(|output| output.contains(FORGE_ALREADY_VERIFIED_MARKER));
    if already_verified {
        return Err(ExplorerError(ETHERSCAN_ALREADY_VERIFIED.to_string()));
    }
    if success {
        return Ok(());
    }

    // Prefer the explorer's own reason over forge's wrapping of it
    let reason = stderr
        .lines()
        .chain(stdout.lines())
        .find_map(|line| {
            line.trim()
                .strip_prefix(FORGE_DETAILS_PREFIX)
                .map(|details| details.trim_end_matches('`').to_string())
        })
        .unwrap_or_else(|| stderr.trim().to_string());

    Err(ExplorerError(reason))
}

impl ExplorerClient for ForgeExplorerClient {
    async fn submit_verification(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), ExplorerError> {
        let output = Command::new(FORGE_COMMAND)
            .args(self.command_args(request))
            .current_dir(&self.project_root)
            .output()
            .await
            .map_err(|e| ExplorerError(format!("failed to run {FORGE_COMMAND}: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{FORGE_COMMAND} {VERIFY_CONTRACT_SUBCOMMAND} output: {stdout}");

        classify_forge_output(output.status.success(), &stdout, &stderr)
    }
}
