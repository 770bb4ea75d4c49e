pub mod config;
pub mod contract;
pub mod devnet;
pub mod error;
pub mod model;
pub mod service;

pub use config::AppConfig;
pub use contract::{ContractDescriptor, PendingTransaction, Receipt, TaskContract, WalletProvider};
pub use error::{ChainError, ChainResult};
pub use model::{Address, Task, TaskId, TaskStatus};
pub use service::{
    ConnectOutcome, DispatchOutcome, Notifier, SessionManager, SessionSnapshot, TaskCommand,
    TaskDispatcher, Toast, ToastBoard, ToastKind,
};
