use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::contract::{
    AccountsListener, ContractDescriptor, PendingTransaction, Signer, TaskContract, WalletProvider,
};
use crate::devnet::chain::{Call, DevChain};
use crate::error::{ChainError, ChainResult};
use crate::model::{Address, Task, TaskId};

/// Accounts derived from the standard local-node test mnemonic.
pub const DEV_ACCOUNTS: [&str; 10] = [
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
    "0x90F79bf6EB2c4f870365E785982E1f101E93b906",
    "0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65",
    "0x9965507D1a55bcC2695C58ba16FB37d819B0A4dc",
    "0x976EA74026E726554dB657fA54763abd0C3a0aa9",
    "0x14dC79964da2C08b23698B3D3cc7Ca32193d9955",
    "0x23618e81E3f5cdF7f54C3d65f7FBc0aBf5B21E8f",
    "0xa0Ee7A142d267C1f36714E4a8F75612F20a79720",
];

pub fn dev_accounts(count: usize) -> ChainResult<Vec<Address>> {
    DEV_ACCOUNTS
        .iter()
        .take(count.clamp(1, DEV_ACCOUNTS.len()))
        .map(|a| Address::parse(a))
        .collect()
}

struct WalletState {
    selected: usize,
    authorized: bool,
    reject_next_connect: bool,
    authorization_requests: usize,
}

/// Wallet over the dev accounts, signing for a [`DevChain`].
pub struct DevWallet {
    chain: Arc<DevChain>,
    accounts: Vec<Address>,
    state: Mutex<WalletState>,
    reject_signing: Arc<AtomicBool>,
    listeners: Mutex<Vec<Arc<dyn Fn(Vec<Address>) + Send + Sync>>>,
}

impl DevWallet {
    pub fn new(chain: Arc<DevChain>, accounts: Vec<Address>) -> Arc<Self> {
        Arc::new(Self {
            chain,
            accounts,
            state: Mutex::new(WalletState {
                selected: 0,
                authorized: false,
                reject_next_connect: false,
                authorization_requests: 0,
            }),
            reject_signing: Arc::new(AtomicBool::new(false)),
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn chain(&self) -> &Arc<DevChain> {
        &self.chain
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn selected_account(&self) -> Option<&Address> {
        self.accounts.get(self.lock().selected)
    }

    pub fn authorization_requests(&self) -> usize {
        self.lock().authorization_requests
    }

    pub fn reject_next_connect(&self) {
        self.lock().reject_next_connect = true;
    }

    pub fn set_reject_signing(&self, reject: bool) {
        self.reject_signing.store(reject, Ordering::SeqCst);
    }

    // Selected account first, like the injected wallets report it.
    fn ordered_accounts(&self, selected: usize) -> Vec<Address> {
        let mut ordered = Vec::with_capacity(self.accounts.len());
        ordered.push(self.accounts[selected].clone());
        ordered.extend(
            self.accounts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != selected)
                .map(|(_, a)| a.clone()),
        );
        ordered
    }

    /// Switches the active account and notifies listeners if the site is authorized.
    pub fn select_account(&self, index: usize) -> Option<Address> {
        let (selected, notify) = {
            let mut state = self.lock();
            if index >= self.accounts.len() {
                return None;
            }
            state.selected = index;
            (self.accounts[index].clone(), state.authorized)
        };
        info!(account = %selected, "dev wallet switched account");
        if notify {
            self.emit(self.ordered_accounts(index));
        }
        Some(selected)
    }

    pub fn select_next_account(&self) -> Option<Address> {
        let next = (self.lock().selected + 1) % self.accounts.len().max(1);
        self.select_account(next)
    }

    /// Disconnects the site from every account.
    pub fn revoke_all(&self) {
        self.lock().authorized = false;
        info!("dev wallet revoked all accounts");
        self.emit(Vec::new());
    }

    fn emit(&self, accounts: Vec<Address>) {
        // Listeners may call back into the wallet, so run them unlocked.
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            listener(accounts.clone());
        }
    }
}

impl WalletProvider for DevWallet {
    fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    fn request_accounts(&self) -> ChainResult<Vec<Address>> {
        let mut state = self.lock();
        state.authorization_requests += 1;
        if std::mem::take(&mut state.reject_next_connect) {
            return Err(ChainError::ConnectionRejected(
                "User rejected the request.".to_string(),
            ));
        }
        if self.accounts.is_empty() {
            return Ok(Vec::new());
        }
        state.authorized = true;
        debug!(selected = state.selected, "dev wallet authorized accounts");
        Ok(self.ordered_accounts(state.selected))
    }

    fn bind_contract(
        &self,
        descriptor: &ContractDescriptor,
        signer: Signer,
    ) -> ChainResult<Arc<dyn TaskContract>> {
        if signer.chain_id != self.chain.chain_id() {
            return Err(ChainError::ConnectionRejected(format!(
                "signer is on chain {} but the wallet is on chain {}",
                signer.chain_id,
                self.chain.chain_id()
            )));
        }
        if !self.accounts.contains(&signer.account) {
            return Err(ChainError::ConnectionRejected(format!(
                "unknown account {}",
                signer.account
            )));
        }
        debug!(contract = %descriptor.address, account = %signer.account, "contract bound");
        Ok(Arc::new(DevContract {
            chain: Arc::clone(&self.chain),
            from: signer.account,
            reject_signing: Arc::clone(&self.reject_signing),
        }))
    }

    fn on_accounts_changed(&self, listener: AccountsListener) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::from(listener));
    }
}

/// `TaskManager` proxy signing as one dev account.
pub struct DevContract {
    chain: Arc<DevChain>,
    from: Address,
    reject_signing: Arc<AtomicBool>,
}

impl DevContract {
    fn send(&self, call: Call) -> ChainResult<Box<dyn PendingTransaction>> {
        if self.reject_signing.load(Ordering::SeqCst) {
            return Err(ChainError::CallRejected("user rejected transaction".to_string()));
        }
        Ok(Box::new(self.chain.submit(self.from.clone(), call)))
    }
}

impl TaskContract for DevContract {
    fn signer(&self) -> &Address {
        &self.from
    }

    fn add_task(&self, title: &str, description: &str) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(Call::AddTask {
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    fn edit_task(
        &self,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(Call::EditTask {
            id,
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    fn mark_task_completed(&self, id: TaskId) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(Call::MarkTaskCompleted { id })
    }

    fn delete_task(&self, id: TaskId) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(Call::DeleteTask { id })
    }

    fn get_task(&self) -> ChainResult<Vec<Task>> {
        Ok(self.chain.tasks())
    }

    fn get_task_counter(&self) -> ChainResult<u64> {
        Ok(self.chain.task_counter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wallet() -> Arc<DevWallet> {
        let chain = DevChain::new(31337, Duration::ZERO);
        DevWallet::new(chain, dev_accounts(3).unwrap())
    }

    #[test]
    fn test_dev_accounts_clamped() {
        assert_eq!(dev_accounts(0).unwrap().len(), 1);
        assert_eq!(dev_accounts(50).unwrap().len(), 10);
    }

    #[test]
    fn test_request_accounts_selected_first() {
        let wallet = wallet();
        wallet.select_account(2);
        let accounts = wallet.request_accounts().unwrap();
        assert_eq!(accounts[0], wallet.accounts()[2]);
        assert_eq!(accounts.len(), 3);
        assert_eq!(wallet.authorization_requests(), 1);
    }

    #[test]
    fn test_reject_next_connect_is_one_shot() {
        let wallet = wallet();
        wallet.reject_next_connect();
        assert!(matches!(wallet.request_accounts(), Err(ChainError::ConnectionRejected(_))));
        assert!(wallet.request_accounts().is_ok());
    }

    #[test]
    fn test_listeners_only_fire_when_authorized() {
        let wallet = wallet();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        wallet.on_accounts_changed(Box::new(move |accounts| sink.lock().unwrap().push(accounts)));

        wallet.select_account(1);
        assert!(seen.lock().unwrap().is_empty());

        wallet.request_accounts().unwrap();
        wallet.select_account(2);
        wallet.revoke_all();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0], wallet.accounts()[2]);
        assert!(seen[1].is_empty());
    }

    #[test]
    fn test_signing_rejection() {
        let wallet = wallet();
        let descriptor = ContractDescriptor::task_manager_default().unwrap();
        let signer = Signer {
            account: wallet.accounts()[0].clone(),
            chain_id: 31337,
        };
        let contract = wallet.bind_contract(&descriptor, signer).unwrap();

        wallet.set_reject_signing(true);
        let err = contract.add_task("a", "b").err().unwrap();
        assert_eq!(err, ChainError::CallRejected("user rejected transaction".into()));
        assert_eq!(wallet.chain().submitted(), 0);
    }

    #[test]
    fn test_bind_rejects_foreign_signer() {
        let wallet = wallet();
        let descriptor = ContractDescriptor::task_manager_default().unwrap();
        let signer = Signer {
            account: Address::parse("0x0000000000000000000000000000000000000001").unwrap(),
            chain_id: 31337,
        };
        assert!(wallet.bind_contract(&descriptor, signer).is_err());
    }
}
