use std::{collections::BTreeMap, env, fs};

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use deploy_common::types::{
    ContractClass, DeployedContract, DeploymentPath, InitializerArg, NetworkConfig, ProxyKind,
};
use deploy_scripts::{
    errors::{ChainError, DeployError},
    orchestrator::{Completion, ContractOutcome},
    registry::JsonConfigStore,
    solidity::{IGatewayCrossChain, IGatewaySend},
};
use eyre::{eyre, Result};
use rand::Rng;
use tests::{
    fixtures::{
        default, gateway_send_spec, uint, zeta_spec, CHAIN_ID, DODO_APPROVE, DODO_ROUTE_PROXY,
        GAS_LIMIT, GATEWAY, NETWORK,
    },
    memory_store::MemoryStore,
    mock_chain::MockChain,
    mock_explorer::MockExplorer,
    utils::TestEnv,
};

/// Unwrap a successful outcome
fn done(outcome: Option<&ContractOutcome>) -> Result<(Completion, Address, Address)> {
    match outcome {
        Some(ContractOutcome::Done {
            completion, result, ..
        }) => Ok((*completion, result.proxy, result.implementation)),
        other => Err(eyre!("expected a successful outcome, got {other:?}")),
    }
}

/// Unwrap a failed outcome
fn failed(outcome: Option<&ContractOutcome>) -> Result<DeployError> {
    match outcome {
        Some(ContractOutcome::Failed { error, .. }) => Ok(error.clone()),
        other => Err(eyre!("expected a failed outcome, got {other:?}")),
    }
}

// ------------------
// | FRESH DEPLOYS |
// ------------------

#[tokio::test]
async fn test_fresh_deploy_gateway_send() -> Result<()> {
    let env = TestEnv::new(vec![gateway_send_spec("GatewaySend")]);
    let mut orchestrator = env.orchestrator();

    let report = orchestrator.run().await?;
    let (completion, proxy, implementation) = done(report.outcome("GatewaySend"))?;

    assert_eq!(completion, Completion::FreshDeploy);
    assert!(!proxy.is_zero());
    assert!(!implementation.is_zero());
    assert_ne!(proxy, implementation);
    assert_eq!(env.chain.implementation_of(proxy), implementation);

    // Implementation and proxy creations only
    assert_eq!(env.chain.num_submitted(), 2);

    let recorded = orchestrator.registry().lookup(NETWORK, "GatewaySend");
    assert_eq!(
        recorded,
        Some(DeployedContract {
            proxy,
            implementation
        })
    );

    let snapshots = orchestrator.registry().store().snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].0, NETWORK);

    let init = env
        .chain
        .initializer_of(proxy)
        .ok_or_else(|| eyre!("proxy was not initialized"))?;
    let call = IGatewaySend::initializeCall::abi_decode(&init, true)?;
    assert_eq!(call.gateway, GATEWAY);
    assert_eq!(call.dodoRouteProxy, DODO_ROUTE_PROXY);
    assert_eq!(call.dodoApprove, DODO_APPROVE);
    assert_eq!(call.gasLimit, U256::from(GAS_LIMIT));

    Ok(())
}

#[tokio::test]
async fn test_fresh_deploy_transparent_proxy() -> Result<()> {
    let mut spec = gateway_send_spec("GatewaySend");
    spec.proxy = ProxyKind::Transparent;
    let env = TestEnv::new(vec![spec]);

    let report = env.orchestrator().run().await?;
    let (completion, proxy, implementation) = done(report.outcome("GatewaySend"))?;

    assert_eq!(completion, Completion::FreshDeploy);
    assert_eq!(env.chain.implementation_of(proxy), implementation);
    assert!(!env.chain.admin_of(proxy).is_zero());

    Ok(())
}

#[tokio::test]
async fn test_second_run_is_all_reused() -> Result<()> {
    let plan = vec![
        gateway_send_spec("GatewaySend"),
        zeta_spec(
            "GatewayCrossChain",
            ContractClass::GatewayCrossChain,
            default("Gateway"),
        ),
    ];
    let first = TestEnv::new(plan.clone());
    let mut orchestrator = first.orchestrator();
    orchestrator.run().await?;
    let recorded = orchestrator.registry().entries(NETWORK);
    assert_eq!(recorded.len(), 2);

    let second = TestEnv::with_deployed(plan, recorded.clone(), MockExplorer::accepting());
    let mut orchestrator = second.orchestrator();
    let report = orchestrator.run().await?;

    for outcome in &report.outcomes {
        let (completion, proxy, implementation) = done(Some(outcome))?;
        assert_eq!(completion, Completion::Reused);
        assert_eq!(
            recorded.get(outcome.name()),
            Some(&DeployedContract {
                proxy,
                implementation
            })
        );
    }
    assert_eq!(second.chain.num_submitted(), 0);
    assert!(orchestrator.registry().store().snapshots().is_empty());

    Ok(())
}

// ----------------
// | DEPENDENCIES |
// ----------------

#[tokio::test]
async fn test_dependency_deployed_first() -> Result<()> {
    // Declared before the contract it references
    let dependent = zeta_spec(
        "GatewayTransferNative",
        ContractClass::GatewayTransferNative,
        InitializerArg::Deployed("GatewayCrossChain".to_string()),
    );
    let dependency = zeta_spec(
        "GatewayCrossChain",
        ContractClass::GatewayCrossChain,
        default("Gateway"),
    );
    let env = TestEnv::new(vec![dependent, dependency]);

    let report = env.orchestrator().run().await?;
    let names = report.outcomes.iter().map(|o| o.name()).collect::<Vec<_>>();
    assert_eq!(names, vec!["GatewayCrossChain", "GatewayTransferNative"]);

    let (_, dependency_proxy, _) = done(report.outcome("GatewayCrossChain"))?;
    let (_, dependent_proxy, _) = done(report.outcome("GatewayTransferNative"))?;

    let init = env
        .chain
        .initializer_of(dependent_proxy)
        .ok_or_else(|| eyre!("proxy was not initialized"))?;
    // Both ZetaChain contracts share an initializer signature
    let call = IGatewayCrossChain::initializeCall::abi_decode(&init, true)?;
    assert_eq!(call.gateway, dependency_proxy);

    Ok(())
}

#[tokio::test]
async fn test_dependent_of_failed_contract_fails() -> Result<()> {
    let dependency = gateway_send_spec("GatewaySend");
    let dependent = zeta_spec(
        "GatewayCrossChain",
        ContractClass::GatewayCrossChain,
        InitializerArg::Deployed("GatewaySend".to_string()),
    );
    let env = TestEnv::new(vec![dependency, dependent]);
    env.chain.fail_creation(1);

    let report = env.orchestrator().run().await?;

    assert!(report.has_failures());
    assert!(matches!(
        failed(report.outcome("GatewaySend"))?,
        DeployError::TransactionFailure { .. }
    ));
    assert_eq!(
        failed(report.outcome("GatewayCrossChain"))?,
        DeployError::DependencyUnavailable {
            contract: "GatewayCrossChain".to_string(),
            dependency: "GatewaySend".to_string(),
        }
    );
    // Only the failed implementation creation reached the chain
    assert_eq!(env.chain.num_submitted(), 1);

    Ok(())
}

#[tokio::test]
async fn test_recorded_dependent_of_failed_contract_is_reused() -> Result<()> {
    let dependency = gateway_send_spec("GatewaySend");
    let dependent = zeta_spec(
        "GatewayCrossChain",
        ContractClass::GatewayCrossChain,
        InitializerArg::Deployed("GatewaySend".to_string()),
    );
    let recorded = DeployedContract {
        proxy: Address::repeat_byte(0x11),
        implementation: Address::repeat_byte(0x22),
    };
    let env = TestEnv::with_deployed(
        vec![dependency, dependent],
        BTreeMap::from([("GatewayCrossChain".to_string(), recorded)]),
        MockExplorer::accepting(),
    );
    env.chain.fail_creation(1);

    let report = env.orchestrator().run().await?;

    assert!(matches!(
        failed(report.outcome("GatewaySend"))?,
        DeployError::TransactionFailure { .. }
    ));
    assert_eq!(
        done(report.outcome("GatewayCrossChain"))?,
        (Completion::Reused, recorded.proxy, recorded.implementation)
    );

    Ok(())
}

// ------------
// | FAILURES |
// ------------

#[tokio::test]
async fn test_failed_deploy_does_not_block_independent_contract() -> Result<()> {
    let env = TestEnv::new(vec![
        gateway_send_spec("GatewaySend"),
        zeta_spec(
            "GatewayTransferNative",
            ContractClass::GatewayTransferNative,
            default("Gateway"),
        ),
    ]);
    env.chain.fail_creation(1);

    let mut orchestrator = env.orchestrator();
    let report = orchestrator.run().await?;

    assert_eq!(
        failed(report.outcome("GatewaySend"))?,
        DeployError::TransactionFailure {
            contract: "GatewaySend".to_string(),
            orphaned_implementation: None,
            reason: ChainError::Reverted(failed_tx_hash(1)),
        }
    );
    let (completion, ..) = done(report.outcome("GatewayTransferNative"))?;
    assert_eq!(completion, Completion::FreshDeploy);

    let recorded = orchestrator.registry().entries(NETWORK);
    assert!(!recorded.contains_key("GatewaySend"));
    assert!(recorded.contains_key("GatewayTransferNative"));

    Ok(())
}

/// The hash the mock chain gives its `n`th transaction
fn failed_tx_hash(n: u64) -> alloy_primitives::TxHash {
    alloy_primitives::TxHash::left_padding_from(&n.to_be_bytes())
}

#[tokio::test]
async fn test_failed_proxy_reports_orphaned_implementation() -> Result<()> {
    let env = TestEnv::new(vec![gateway_send_spec("GatewaySend")]);
    env.chain.fail_creation(2);

    let mut orchestrator = env.orchestrator();
    let report = orchestrator.run().await?;

    match failed(report.outcome("GatewaySend"))? {
        DeployError::TransactionFailure {
            orphaned_implementation: Some(implementation),
            ..
        } => assert!(env.chain.has_code(implementation)),
        other => return Err(eyre!("unexpected error: {other}")),
    }
    assert_eq!(orchestrator.registry().lookup(NETWORK, "GatewaySend"), None);
    assert!(orchestrator.registry().store().snapshots().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_confirmation_timeout_fails_contract() -> Result<()> {
    let env = TestEnv::new(vec![gateway_send_spec("GatewaySend")]);
    env.chain.withhold_receipts();

    let report = env.orchestrator().run().await?;

    assert!(matches!(
        failed(report.outcome("GatewaySend"))?,
        DeployError::TransactionFailure {
            reason: ChainError::ConfirmationTimeout(_),
            ..
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_persistence_failure_aborts_run() -> Result<()> {
    let env = TestEnv::new(vec![
        gateway_send_spec("GatewaySend"),
        zeta_spec(
            "GatewayTransferNative",
            ContractClass::GatewayTransferNative,
            default("Gateway"),
        ),
    ]);
    let mut orchestrator = env.orchestrator_with_store(MemoryStore::failing());

    let res = orchestrator.run().await;

    assert!(matches!(res, Err(DeployError::Persistence(_))));
    assert_eq!(orchestrator.registry().lookup(NETWORK, "GatewaySend"), None);
    // The second contract never started
    assert_eq!(env.chain.num_submitted(), 2);

    Ok(())
}

// -----------------
// | CONFIGURATION |
// -----------------

#[tokio::test]
async fn test_arity_mismatch_submits_nothing() -> Result<()> {
    let mut spec = gateway_send_spec("GatewaySend");
    spec.args.pop();
    let env = TestEnv::new(vec![spec]);

    let res = env.orchestrator().run().await;

    assert!(matches!(res, Err(DeployError::Configuration(_))));
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}

#[tokio::test]
async fn test_kind_mismatch_submits_nothing() -> Result<()> {
    let mut spec = gateway_send_spec("GatewaySend");
    spec.args[0] = uint(1);
    let env = TestEnv::new(vec![gateway_send_spec("Other"), spec]);

    let res = env.orchestrator().run().await;

    assert!(matches!(res, Err(DeployError::Configuration(_))));
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_references_submit_nothing() -> Result<()> {
    let mut unknown_role = gateway_send_spec("GatewaySend");
    unknown_role.args[0] = default("Router");
    let unknown_contract = zeta_spec(
        "GatewayCrossChain",
        ContractClass::GatewayCrossChain,
        InitializerArg::Deployed("Missing".to_string()),
    );

    for spec in [unknown_role, unknown_contract] {
        let env = TestEnv::new(vec![spec]);
        let res = env.orchestrator().run().await;

        assert!(matches!(res, Err(DeployError::Configuration(_))));
        assert_eq!(env.chain.num_submitted(), 0);
    }

    Ok(())
}

#[tokio::test]
async fn test_dependency_cycle_submits_nothing() -> Result<()> {
    let a = zeta_spec(
        "GatewayCrossChain",
        ContractClass::GatewayCrossChain,
        InitializerArg::Deployed("GatewayTransferNative".to_string()),
    );
    let b = zeta_spec(
        "GatewayTransferNative",
        ContractClass::GatewayTransferNative,
        InitializerArg::Deployed("GatewayCrossChain".to_string()),
    );
    let env = TestEnv::new(vec![gateway_send_spec("GatewaySend"), a, b]);

    let res = env.orchestrator().run().await;

    assert!(matches!(res, Err(DeployError::Configuration(_))));
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}

#[tokio::test]
async fn test_chain_id_mismatch_submits_nothing() -> Result<()> {
    let mut env = TestEnv::new(vec![gateway_send_spec("GatewaySend")]);
    env.chain = MockChain::new(CHAIN_ID + 1);

    let res = env.orchestrator().run().await;

    assert!(matches!(res, Err(DeployError::Configuration(_))));
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}

// ---------------
// | PERSISTENCE |
// ---------------

#[tokio::test]
async fn test_json_store_records_deployment() -> Result<()> {
    let path = env::temp_dir().join(format!(
        "{NETWORK}-{}.json",
        rand::thread_rng().gen::<u64>()
    ));
    let config_json = serde_json::json!({
        "chain": { "chainId": CHAIN_ID, "explorerURL": "https://sepolia.arbiscan.io" },
        "defaultAddress": {
            "Gateway": format!("{GATEWAY:#x}"),
            "DODORouteProxy": format!("{DODO_ROUTE_PROXY:#x}"),
            "DODOApprove": format!("{DODO_APPROVE:#x}"),
        },
        "deployedAddress": {},
        "contracts": [{
            "name": "GatewaySend",
            "class": "GatewaySend",
            "args": [
                { "default": "Gateway" },
                { "default": "DODORouteProxy" },
                { "default": "DODOApprove" },
                { "uint": GAS_LIMIT },
            ],
        }],
        "notes": "kept across rewrites",
    });
    fs::write(&path, serde_json::to_string_pretty(&config_json)?)?;

    let loaded = NetworkConfig::load(&path)?;
    let mut env = TestEnv::new(Vec::new());
    env.config = loaded;

    let report = env
        .orchestrator_with_store(JsonConfigStore::new(&path))
        .run()
        .await?;
    let (_, proxy, implementation) = done(report.outcome("GatewaySend"))?;

    let reloaded = NetworkConfig::load(&path)?;
    let rewritten: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    fs::remove_file(&path)?;

    assert_eq!(
        reloaded.deployed_addresses,
        BTreeMap::from([(
            "GatewaySend".to_string(),
            DeployedContract {
                proxy,
                implementation
            }
        )])
    );
    assert_eq!(rewritten["notes"], "kept across rewrites");
    assert_eq!(
        rewritten["deployedAddress"]["GatewaySendProxy"],
        format!("{proxy:#x}")
    );

    Ok(())
}

#[tokio::test]
async fn test_recorded_path_is_reused() -> Result<()> {
    let recorded = DeployedContract {
        proxy: Address::repeat_byte(0x11),
        implementation: Address::repeat_byte(0x22),
    };
    let env = TestEnv::with_deployed(
        vec![gateway_send_spec("GatewaySend")],
        BTreeMap::from([("GatewaySend".to_string(), recorded)]),
        MockExplorer::accepting(),
    );

    let report = env.orchestrator().run().await?;

    match report.outcome("GatewaySend") {
        Some(ContractOutcome::Done { result, .. }) => {
            assert_eq!(result.path, DeploymentPath::Reused);
            assert_eq!(result.deployed(), recorded);
        }
        other => return Err(eyre!("unexpected outcome: {other:?}")),
    }
    assert_eq!(env.chain.num_submitted(), 0);

    Ok(())
}
