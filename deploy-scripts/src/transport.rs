//! The chain transport used by the deployer, upgrader, and orchestrator

use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
};
use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use tracing::{debug, trace};

use crate::{
    constants::{
        DEFAULT_RECEIPT_POLL_ATTEMPTS, DEFAULT_RECEIPT_POLL_INTERVAL, NUM_BYTES_ADDRESS,
        NUM_BYTES_STORAGE_SLOT,
    },
    errors::ChainError,
};

/// A transaction to be signed and submitted by a [`ChainClient`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTransaction {
    /// The recipient of the transaction, or `None` for a contract creation
    pub to: Option<Address>,
    /// The calldata, or the creation bytecode for a contract creation
    pub input: Bytes,
}

impl ChainTransaction {
    /// A contract creation transaction with the given creation bytecode
    pub fn create(bytecode: Bytes) -> Self {
        Self {
            to: None,
            input: bytecode,
        }
    }

    /// A call to the contract at `to` with the given calldata
    pub fn call(to: Address, input: Bytes) -> Self {
        Self {
            to: Some(to),
            input,
        }
    }
}

/// The mined status of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// The hash of the transaction
    pub tx_hash: TxHash,
    /// Whether the transaction executed without reverting
    pub success: bool,
    /// The address of the contract created by the transaction, if any
    pub contract_address: Option<Address>,
    /// The block in which the transaction was included
    pub block_number: Option<u64>,
}

/// The chain capabilities needed to deploy and upgrade proxies.
///
/// Implementations sign with a single sender identity. Every submission is
/// expected to be followed by [`ChainClient::await_confirmation`] before any
/// dependent submission.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// The address transactions are sent from
    fn sender(&self) -> Address;

    /// The EIP-155 chain ID of the connected network
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Sign and submit a transaction, returning its hash
    async fn submit(&self, tx: ChainTransaction) -> Result<TxHash, ChainError>;

    /// Wait until the transaction is mined
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ChainError>;

    /// Read a storage slot of a contract
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError>;

    /// Read the runtime code at an address
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Execute a read-only call against a contract
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError>;
}

// -----------
// | HELPERS |
// -----------

/// Submit a transaction and wait for it to succeed
pub async fn send_and_confirm<C: ChainClient>(
    client: &C,
    tx: ChainTransaction,
) -> Result<Confirmation, ChainError> {
    let tx_hash = client.submit(tx).await?;
    let confirmation = client.await_confirmation(tx_hash).await?;
    if !confirmation.success {
        return Err(ChainError::Reverted(tx_hash));
    }

    Ok(confirmation)
}

/// Deploy a contract from its creation bytecode, returning its address
pub async fn deploy_contract<C: ChainClient>(
    client: &C,
    bytecode: Bytes,
) -> Result<Address, ChainError> {
    let confirmation = send_and_confirm(client, ChainTransaction::create(bytecode)).await?;
    confirmation
        .contract_address
        .ok_or(ChainError::MissingContractAddress(confirmation.tx_hash))
}

/// Read an address stored in the low-order bytes of a storage slot
pub async fn read_address_slot<C: ChainClient>(
    client: &C,
    address: Address,
    slot: B256,
) -> Result<Address, ChainError> {
    let word = client.storage_at(address, slot).await?;
    Ok(Address::from_slice(
        &word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
    ))
}

// ---------
// | ALLOY |
// ---------

/// A [`ChainClient`] backed by a signing alloy provider
#[derive(Clone)]
pub struct AlloyChainClient {
    /// The signing provider
    provider: DynProvider,
    /// The address of the provider's signer
    sender: Address,
    /// The interval between receipt polls
    poll_interval: Duration,
    /// The number of receipt polls before giving up on a transaction
    max_attempts: usize,
}

impl AlloyChainClient {
    /// Create a client over a provider that signs as `sender`
    pub fn new(provider: DynProvider, sender: Address) -> Self {
        Self {
            provider,
            sender,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            max_attempts: DEFAULT_RECEIPT_POLL_ATTEMPTS,
        }
    }

    /// Override the receipt polling schedule
    pub fn with_receipt_polling(mut self, poll_interval: Duration, max_attempts: usize) -> Self {
        self.poll_interval = poll_interval;
        self.max_attempts = max_attempts;
        self
    }
}

/// Convert an alloy transport error into a [`ChainError`]
fn rpc_error(e: impl ToString) -> ChainError {
    ChainError::Rpc(e.to_string())
}

impl ChainClient for AlloyChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(rpc_error)
    }

    async fn submit(&self, tx: ChainTransaction) -> Result<TxHash, ChainError> {
        let request = match tx.to {
            Some(to) => TransactionRequest::default()
                .with_to(to)
                .with_input(tx.input),
            None => TransactionRequest::default().with_deploy_code(tx.input),
        }
        .with_from(self.sender);

        let pending_tx = self
            .provider
            .send_transaction(request)
            .await
            .map_err(rpc_error)?;
        let tx_hash = *pending_tx.tx_hash();
        debug!("submitted transaction {tx_hash:#x}");

        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ChainError> {
        // Poll for the receipt rather than watching the pending transaction,
        // which is unreliable over HTTP
        let mut remaining_attempts = self.max_attempts;
        while remaining_attempts > 0 {
            match self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(rpc_error)?
            {
                Some(receipt) => {
                    trace!("receipt for {tx_hash:#x}: {receipt:?}");
                    return Ok(Confirmation {
                        tx_hash,
                        success: receipt.status(),
                        contract_address: receipt.contract_address,
                        block_number: receipt.block_number,
                    });
                }
                None => {
                    tokio::time::sleep(self.poll_interval).await;
                    remaining_attempts -= 1;
                }
            }
        }

        Err(ChainError::ConfirmationTimeout(tx_hash))
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let value = self
            .provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map_err(rpc_error)?;

        Ok(B256::from(value.to_be_bytes::<32>()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider.get_code_at(address).await.map_err(rpc_error)
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_input(input);

        self.provider.call(&request).await.map_err(rpc_error)
    }
}
