pub mod chain;
pub mod wallet;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::ChainResult;

pub use chain::{Call, DevChain, DevPendingTx};
pub use wallet::{dev_accounts, DevContract, DevWallet, DEV_ACCOUNTS};

/// Starts a local chain and a wallet over its dev accounts.
pub fn launch(config: &AppConfig) -> ChainResult<Arc<DevWallet>> {
    let chain = DevChain::new(
        config.network.chain_id,
        Duration::from_millis(config.network.block_time_ms),
    );
    let accounts = dev_accounts(config.wallet.accounts)?;
    Ok(DevWallet::new(chain, accounts))
}
