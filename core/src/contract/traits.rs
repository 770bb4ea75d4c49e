use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::contract::descriptor::ContractDescriptor;
use crate::error::ChainResult;
use crate::model::{Address, Task, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notifications the contract emits. The client re-reads instead of
/// consuming them, but receipts still carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContractEvent {
    TaskCreated {
        task_id: TaskId,
        title: String,
        description: String,
        owner: Address,
    },
    TaskUpdated {
        task_id: TaskId,
        title: String,
        description: String,
        status: TaskStatus,
    },
    TaskDeleted {
        task_id: TaskId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub from: Address,
    pub events: Vec<ContractEvent>,
}

/// The identity a contract handle signs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub account: Address,
    pub chain_id: u64,
}

pub trait PendingTransaction: Send {
    fn hash(&self) -> &TxHash;

    /// Blocks until the transaction is confirmed. No timeout is applied here.
    fn wait(self: Box<Self>) -> ChainResult<Receipt>;
}

/// A callable `TaskManager` proxy bound to one signer.
pub trait TaskContract: Send + Sync {
    fn signer(&self) -> &Address;

    fn add_task(&self, title: &str, description: &str) -> ChainResult<Box<dyn PendingTransaction>>;
    fn edit_task(
        &self,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> ChainResult<Box<dyn PendingTransaction>>;
    fn mark_task_completed(&self, id: TaskId) -> ChainResult<Box<dyn PendingTransaction>>;
    fn delete_task(&self, id: TaskId) -> ChainResult<Box<dyn PendingTransaction>>;

    fn get_task(&self) -> ChainResult<Vec<Task>>;
    fn get_task_counter(&self) -> ChainResult<u64>;
}

pub type AccountsListener = Box<dyn Fn(Vec<Address>) + Send + Sync>;

/// The injected wallet: brokers the user's accounts and signs transactions.
pub trait WalletProvider: Send + Sync {
    fn chain_id(&self) -> u64;

    /// May prompt the user, who may refuse.
    fn request_accounts(&self) -> ChainResult<Vec<Address>>;

    fn bind_contract(
        &self,
        descriptor: &ContractDescriptor,
        signer: Signer,
    ) -> ChainResult<Arc<dyn TaskContract>>;

    /// The listener stays registered for the lifetime of the provider.
    fn on_accounts_changed(&self, listener: AccountsListener);
}
