use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use deploy_common::types::{ContractSpec, DeployedContract, DeploymentPath, ProxyKind};
use deploy_scripts::{
    constants::{
        BLOCKSCOUT_ALREADY_VERIFIED, ERC1967_PROXY_CONTRACT_NAME, ETHERSCAN_ALREADY_VERIFIED,
        TRANSPARENT_PROXY_CONTRACT_NAME,
    },
    orchestrator::{Completion, ContractOutcome, RunReport},
    solidity::IGatewaySend,
    transport::ChainClient,
};
use eyre::{eyre, Result};
use tests::{
    fixtures::{
        gateway_send_spec, CHAIN_ID, DODO_APPROVE, DODO_ROUTE_PROXY, GATEWAY, GAS_LIMIT, NETWORK,
    },
    mock_explorer::MockExplorer,
    utils::TestEnv,
};

/// The contract every test verifies
const NAME: &str = "GatewaySend";

/// The recorded deployment of [`NAME`]
fn recorded() -> DeployedContract {
    DeployedContract {
        proxy: Address::repeat_byte(0x11),
        implementation: Address::repeat_byte(0x22),
    }
}

/// A network with [`NAME`] recorded, optionally flagged for verification
fn recorded_env(verify: bool, explorer: MockExplorer) -> TestEnv {
    let mut spec: ContractSpec = gateway_send_spec(NAME);
    spec.verify = verify;
    TestEnv::with_deployed(
        vec![spec],
        BTreeMap::from([(NAME.to_string(), recorded())]),
        explorer,
    )
}

/// The completion of [`NAME`] in a report
fn completion(report: &RunReport) -> Result<Completion> {
    match report.outcome(NAME) {
        Some(ContractOutcome::Done { completion, .. }) => Ok(*completion),
        other => Err(eyre!("unexpected outcome: {other:?}")),
    }
}

#[tokio::test]
async fn test_accepted_verification() -> Result<()> {
    let env = recorded_env(true, MockExplorer::accepting());

    let report = env.orchestrator().run().await?;

    assert_eq!(completion(&report)?, Completion::ReusedAndVerified);
    match report.outcome(NAME) {
        Some(ContractOutcome::Done { result, .. }) => {
            assert_eq!(result.path, DeploymentPath::ReusedAndVerified);
            assert_eq!(result.deployed(), recorded());
        }
        other => return Err(eyre!("unexpected outcome: {other:?}")),
    }
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}

#[tokio::test]
async fn test_already_verified_counts_as_verified() -> Result<()> {
    for reason in [ETHERSCAN_ALREADY_VERIFIED, BLOCKSCOUT_ALREADY_VERIFIED] {
        let env = recorded_env(true, MockExplorer::rejecting(reason));

        let report = env.orchestrator().run().await?;

        assert_eq!(completion(&report)?, Completion::ReusedAndVerified, "{reason}");
    }

    Ok(())
}

#[tokio::test]
async fn test_near_miss_rejection_is_not_verified() -> Result<()> {
    let reason = ETHERSCAN_ALREADY_VERIFIED.to_lowercase();
    let env = recorded_env(true, MockExplorer::rejecting(&reason));

    let report = env.orchestrator().run().await?;

    assert_eq!(completion(&report)?, Completion::Reused);

    Ok(())
}

#[tokio::test]
async fn test_rejection_does_not_fail_run() -> Result<()> {
    let env = recorded_env(true, MockExplorer::rejecting("rate limited"));

    let report = env.orchestrator().run().await?;

    assert!(!report.has_failures());
    assert_eq!(completion(&report)?, Completion::Reused);
    match report.outcome(NAME) {
        Some(ContractOutcome::Done { result, .. }) => {
            assert_eq!(result.path, DeploymentPath::Reused)
        }
        other => return Err(eyre!("unexpected outcome: {other:?}")),
    }

    Ok(())
}

#[tokio::test]
async fn test_unflagged_contract_skips_explorer() -> Result<()> {
    let env = recorded_env(false, MockExplorer::accepting());

    let report = env.orchestrator().run().await?;

    assert_eq!(completion(&report)?, Completion::Reused);
    assert!(env.explorer.requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_verify_all_overrides_flag() -> Result<()> {
    let env = recorded_env(false, MockExplorer::accepting());

    let report = env.orchestrator().verify_all(true).run().await?;

    assert_eq!(completion(&report)?, Completion::ReusedAndVerified);
    assert_eq!(env.explorer.requests().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_requests_describe_implementation_then_proxy() -> Result<()> {
    let env = recorded_env(true, MockExplorer::accepting());

    env.orchestrator().run().await?;

    let requests = env.explorer.requests();
    let [implementation, proxy] = requests.as_slice() else {
        return Err(eyre!("expected two requests, got {}", requests.len()));
    };

    assert_eq!(implementation.network, NETWORK);
    assert_eq!(implementation.chain_id, CHAIN_ID);
    assert_eq!(
        implementation.explorer_api_url,
        "https://api-sepolia.arbiscan.io/api"
    );
    assert_eq!(implementation.address, recorded().implementation);
    assert_eq!(implementation.contract_name, NAME);
    assert!(implementation.constructor_args.is_empty());

    assert_eq!(proxy.address, recorded().proxy);
    assert_eq!(proxy.contract_name, ERC1967_PROXY_CONTRACT_NAME);
    let (proxied, init_calldata) =
        <(Address, Bytes)>::abi_decode_params(&proxy.constructor_args, true)?;
    assert_eq!(proxied, recorded().implementation);

    let init = IGatewaySend::initializeCall::abi_decode(&init_calldata, true)?;
    assert_eq!(init.gateway, GATEWAY);
    assert_eq!(init.dodoRouteProxy, DODO_ROUTE_PROXY);
    assert_eq!(init.dodoApprove, DODO_APPROVE);
    assert_eq!(init.gasLimit, U256::from(GAS_LIMIT));

    Ok(())
}

#[tokio::test]
async fn test_transparent_proxy_request_names_owner() -> Result<()> {
    let mut spec = gateway_send_spec(NAME);
    spec.proxy = ProxyKind::Transparent;
    spec.verify = true;
    let env = TestEnv::with_deployed(
        vec![spec],
        BTreeMap::from([(NAME.to_string(), recorded())]),
        MockExplorer::accepting(),
    );

    env.orchestrator().run().await?;

    let requests = env.explorer.requests();
    let proxy = requests
        .last()
        .ok_or_else(|| eyre!("no verification requests"))?;
    assert_eq!(proxy.contract_name, TRANSPARENT_PROXY_CONTRACT_NAME);
    let (proxied, owner, _init) =
        <(Address, Address, Bytes)>::abi_decode_params(&proxy.constructor_args, true)?;
    assert_eq!(proxied, recorded().implementation);
    assert_eq!(owner, env.chain.sender());

    Ok(())
}

#[tokio::test]
async fn test_rejected_implementation_skips_proxy() -> Result<()> {
    let env = recorded_env(true, MockExplorer::rejecting("rate limited"));

    env.orchestrator().run().await?;

    let requests = env.explorer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].address, recorded().implementation);

    Ok(())
}

#[tokio::test]
async fn test_fresh_deploy_is_not_verified() -> Result<()> {
    let mut spec = gateway_send_spec(NAME);
    spec.verify = true;
    let env = TestEnv::new(vec![spec]);

    let report = env.orchestrator().verify_all(true).run().await?;

    assert_eq!(completion(&report)?, Completion::FreshDeploy);
    assert!(env.explorer.requests().is_empty());

    Ok(())
}
