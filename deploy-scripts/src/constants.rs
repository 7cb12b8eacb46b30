//! Constants used in the deploy scripts

use std::time::Duration;

use alloy_primitives::{b256, B256};

/// The storage slot containing the implementation address in an upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The storage slot containing the proxy admin contract address in an upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The name of the UUPS proxy contract artifact
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Proxy.sol
pub const ERC1967_PROXY_CONTRACT_NAME: &str = "ERC1967Proxy";

/// The name of the transparent proxy contract artifact
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const TRANSPARENT_PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The extension of a compilation artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The directory extension Foundry gives each source file's artifacts
pub const FOUNDRY_SOURCE_DIR_EXTENSION: &str = "sol";

/// The default interval between transaction receipt polls
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The default number of receipt polls before a transaction is considered unconfirmed
pub const DEFAULT_RECEIPT_POLL_ATTEMPTS: usize = 120;

/// The reply Etherscan-compatible explorers give for an already verified contract
pub const ETHERSCAN_ALREADY_VERIFIED: &str = "Contract source code already verified";

/// The reply Blockscout gives for an already verified contract
pub const BLOCKSCOUT_ALREADY_VERIFIED: &str = "Smart-contract already verified.";

/// The command used to submit contracts for source verification
pub const FORGE_COMMAND: &str = "forge";

/// The `forge` subcommand used to submit contracts for source verification
pub const VERIFY_CONTRACT_SUBCOMMAND: &str = "verify-contract";

/// The marker `forge verify-contract` prints when it skips an already verified contract
pub const FORGE_ALREADY_VERIFIED_MARKER: &str = "already verified";

/// The prefix `forge verify-contract` gives the explorer's reason when verification fails
pub const FORGE_DETAILS_PREFIX: &str = "Details: `";
