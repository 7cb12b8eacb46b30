//! Definitions of Solidity functions called during deployment

use alloy_sol_types::sol;

sol! {
    /// The initializer of the `GatewaySend` contract
    interface IGatewaySend {
        function initialize(address gateway, address dodoRouteProxy, address dodoApprove, uint256 gasLimit) external;
    }

    /// The initializer of the `GatewayCrossChain` contract
    interface IGatewayCrossChain {
        function initialize(address gateway, address feeRecipient, address dodoRouteProxy, address dodoApprove, uint256 feePercent, uint256 slippage, uint256 gasLimit) external;
    }

    /// The initializer of the `GatewayTransferNative` contract
    interface IGatewayTransferNative {
        function initialize(address gateway, address feeRecipient, address dodoRouteProxy, address dodoApprove, uint256 feePercent, uint256 slippage, uint256 gasLimit) external;
    }

    /// The upgrade surface of a UUPS implementation, reached through its `ERC1967Proxy`
    interface IUUPSUpgradeable {
        function upgradeToAndCall(address newImplementation, bytes data) external payable;
        function proxiableUUID() external view returns (bytes32);
    }

    /// The admin contract of a `TransparentUpgradeableProxy`
    interface IProxyAdmin {
        function upgradeAndCall(address proxy, address implementation, bytes data) external payable;
    }
}
