//! Utilities for the deploy scripts.

use std::str::FromStr;

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use deploy_common::types::{ContractClass, ProxyKind, ResolvedArg};
use itertools::Itertools;

use crate::{
    constants::{ERC1967_PROXY_CONTRACT_NAME, TRANSPARENT_PROXY_CONTRACT_NAME},
    errors::DeployError,
    solidity::{IGatewayCrossChain, IGatewaySend, IGatewayTransferNative},
    transport::AlloyChainClient,
};

/// Sets up the chain client with which to deploy contracts,
/// signing with the given private key against the given RPC url.
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<AlloyChainClient, DeployError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
    let sender = signer.address();

    let url =
        Url::parse(rpc_url).map_err(|e| DeployError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    Ok(AlloyChainClient::new(DynProvider::new(provider), sender))
}

/// Check resolved initializer arguments against the class's `initialize` signature
pub fn validate_initializer_args(
    class: ContractClass,
    args: &[ResolvedArg],
) -> Result<(), DeployError> {
    let params = class.initializer_params();
    if params.len() != args.len() {
        return Err(DeployError::Configuration(format!(
            "{class}.initialize takes {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    for (i, (param, arg)) in params.iter().zip(args).enumerate() {
        if *param != arg.kind() {
            return Err(DeployError::Configuration(format!(
                "{class}.initialize argument {i} must be {param}, got {}",
                arg.kind()
            )));
        }
    }

    Ok(())
}

/// Take the address at position `i`, assuming the arguments are validated
fn address_arg(args: &[ResolvedArg], i: usize) -> Result<Address, DeployError> {
    args.get(i)
        .and_then(ResolvedArg::as_address)
        .ok_or_else(|| DeployError::Configuration(format!("argument {i} must be an address")))
}

/// Take the integer at position `i`, assuming the arguments are validated
fn uint_arg(args: &[ResolvedArg], i: usize) -> Result<U256, DeployError> {
    args.get(i)
        .and_then(ResolvedArg::as_uint)
        .ok_or_else(|| DeployError::Configuration(format!("argument {i} must be a uint256")))
}

/// Prepare calldata for a contract's `initialize` method
pub fn initialize_calldata(
    class: ContractClass,
    args: &[ResolvedArg],
) -> Result<Bytes, DeployError> {
    validate_initializer_args(class, args)?;

    let calldata = match class {
        ContractClass::GatewaySend => IGatewaySend::initializeCall {
            gateway: address_arg(args, 0)?,
            dodoRouteProxy: address_arg(args, 1)?,
            dodoApprove: address_arg(args, 2)?,
            gasLimit: uint_arg(args, 3)?,
        }
        .abi_encode(),
        ContractClass::GatewayCrossChain => IGatewayCrossChain::initializeCall {
            gateway: address_arg(args, 0)?,
            feeRecipient: address_arg(args, 1)?,
            dodoRouteProxy: address_arg(args, 2)?,
            dodoApprove: address_arg(args, 3)?,
            feePercent: uint_arg(args, 4)?,
            slippage: uint_arg(args, 5)?,
            gasLimit: uint_arg(args, 6)?,
        }
        .abi_encode(),
        ContractClass::GatewayTransferNative => IGatewayTransferNative::initializeCall {
            gateway: address_arg(args, 0)?,
            feeRecipient: address_arg(args, 1)?,
            dodoRouteProxy: address_arg(args, 2)?,
            dodoApprove: address_arg(args, 3)?,
            feePercent: uint_arg(args, 4)?,
            slippage: uint_arg(args, 5)?,
            gasLimit: uint_arg(args, 6)?,
        }
        .abi_encode(),
    };

    Ok(calldata.into())
}

/// The name of the proxy contract artifact for a proxy flavour
pub const fn proxy_contract_name(kind: ProxyKind) -> &'static str {
    match kind {
        ProxyKind::Uups => ERC1967_PROXY_CONTRACT_NAME,
        ProxyKind::Transparent => TRANSPARENT_PROXY_CONTRACT_NAME,
    }
}

/// ABI-encode the constructor arguments of a proxy pointing at `implementation`
pub fn proxy_constructor_args(
    kind: ProxyKind,
    implementation: Address,
    owner: Address,
    init_calldata: Bytes,
) -> Bytes {
    match kind {
        ProxyKind::Uups => (implementation, init_calldata).abi_encode_params(),
        ProxyKind::Transparent => (implementation, owner, init_calldata).abi_encode_params(),
    }
    .into()
}

/// Append ABI-encoded constructor arguments to creation bytecode
pub fn with_constructor_args(bytecode: &Bytes, args: &Bytes) -> Bytes {
    bytecode.iter().chain(args.iter()).copied().collect_vec().into()
}
