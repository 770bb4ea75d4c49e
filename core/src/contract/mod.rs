pub mod descriptor;
pub mod traits;

pub use descriptor::ContractDescriptor;
pub use traits::{
    AccountsListener, ContractEvent, PendingTransaction, Receipt, Signer, TaskContract, TxHash,
    WalletProvider,
};
