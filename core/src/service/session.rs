use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, info, warn};

use crate::contract::{ContractDescriptor, Signer, TaskContract, WalletProvider};
use crate::error::{ChainError, ChainResult};
use crate::model::{Address, Task, TaskId};
use crate::service::notify::Notifier;

pub enum SessionState {
    Disconnected,
    Connecting,
    Connected {
        account: Address,
        contract: Arc<dyn TaskContract>,
    },
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("Disconnected"),
            SessionState::Connecting => f.write_str("Connecting"),
            SessionState::Connected { account, .. } => {
                f.debug_struct("Connected").field("account", account).finish()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(Address),
    AlreadyConnected,
    InProgress,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub account: Option<Address>,
    pub connecting: bool,
    pub tasks: Vec<Task>,
}

/// A contract handle plus the session generation it was taken from.
#[derive(Clone)]
pub struct Binding {
    pub contract: Arc<dyn TaskContract>,
    pub generation: u64,
}

struct Inner {
    state: SessionState,
    tasks: Vec<Task>,
    // Bumped whenever a session is established or torn down.
    generation: u64,
    listening: bool,
    // Latest account list reported while a connect is in flight.
    pending_accounts: Option<Vec<Address>>,
}

/// Owns the one link between the UI and the wallet's signing identity.
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    descriptor: ContractDescriptor,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        descriptor: ContractDescriptor,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            descriptor,
            notifier,
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                tasks: Vec::new(),
                generation: 0,
                listening: false,
                pending_accounts: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn connect(self: &Arc<Self>) -> ChainResult<ConnectOutcome> {
        {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Connecting => {
                    debug!("connect already in progress, ignoring");
                    return Ok(ConnectOutcome::InProgress);
                }
                SessionState::Connected { .. } => return Ok(ConnectOutcome::AlreadyConnected),
                SessionState::Disconnected => {
                    inner.state = SessionState::Connecting;
                    inner.pending_accounts = None;
                }
            }
        }

        let result = self.establish().and_then(|(provider, account, contract, tasks)| {
            let account = self.commit(provider.as_ref(), account, contract, tasks)?;
            Ok((provider, account))
        });

        match result {
            Ok((provider, account)) => {
                let register = !std::mem::replace(&mut self.lock().listening, true);
                if register {
                    let weak: Weak<SessionManager> = Arc::downgrade(self);
                    provider.on_accounts_changed(Box::new(move |accounts| {
                        if let Some(session) = weak.upgrade() {
                            session.on_accounts_changed(accounts);
                        }
                    }));
                }

                info!(account = %account, "wallet connected");
                self.notifier.success("Wallet connected successfully!");
                Ok(ConnectOutcome::Connected(account))
            }
            Err(err) => {
                {
                    let mut inner = self.lock();
                    inner.state = SessionState::Disconnected;
                    inner.pending_accounts = None;
                    inner.tasks.clear();
                }
                error!(error = %err, "error connecting wallet");
                self.notifier.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Installs the established session, first applying any account change the
    /// provider reported while the connect was in flight.
    fn commit(
        &self,
        provider: &dyn WalletProvider,
        mut account: Address,
        mut contract: Arc<dyn TaskContract>,
        tasks: Vec<Task>,
    ) -> ChainResult<Address> {
        loop {
            let mut inner = self.lock();
            let Some(accounts) = inner.pending_accounts.take() else {
                inner.state = SessionState::Connected {
                    account: account.clone(),
                    contract,
                };
                inner.tasks = tasks;
                inner.generation += 1;
                return Ok(account);
            };

            let Some(next) = accounts.into_iter().next() else {
                info!(account = %account, "wallet revoked all accounts while connecting");
                return Err(ChainError::ConnectionRejected(
                    "No accounts were authorized".to_string(),
                ));
            };
            if next == account {
                continue;
            }

            // The provider may report again while binding, so bind unlocked.
            drop(inner);
            debug!(from = %account, to = %next, "account changed while connecting");
            contract = self.bind(provider, &next)?;
            account = next;
        }
    }

    #[allow(clippy::type_complexity)]
    fn establish(
        &self,
    ) -> ChainResult<(Arc<dyn WalletProvider>, Address, Arc<dyn TaskContract>, Vec<Task>)> {
        let provider = self.provider.clone().ok_or(ChainError::ProviderUnavailable)?;

        let accounts = provider.request_accounts()?;
        let account = accounts.into_iter().next().ok_or_else(|| {
            ChainError::ConnectionRejected("No accounts were authorized".to_string())
        })?;

        let contract = self.bind(provider.as_ref(), &account)?;
        let tasks = contract.get_task()?;
        debug!(count = tasks.len(), "loaded initial tasks");

        Ok((provider, account, contract, tasks))
    }

    fn bind(
        &self,
        provider: &dyn WalletProvider,
        account: &Address,
    ) -> ChainResult<Arc<dyn TaskContract>> {
        let signer = Signer {
            account: account.clone(),
            chain_id: provider.chain_id(),
        };
        provider.bind_contract(&self.descriptor, signer)
    }

    /// Called by the provider whenever the authorized account list changes.
    pub fn on_accounts_changed(&self, accounts: Vec<Address>) {
        let mut inner = self.lock();

        if matches!(inner.state, SessionState::Connecting) {
            debug!(count = accounts.len(), "accounts changed while connecting");
            inner.pending_accounts = Some(accounts);
            return;
        }

        let current = match &inner.state {
            SessionState::Connected { account, .. } => account.clone(),
            _ => {
                debug!("ignoring accounts change without a session");
                return;
            }
        };

        let Some(next) = accounts.into_iter().next() else {
            info!(account = %current, "wallet revoked all accounts, session closed");
            inner.state = SessionState::Disconnected;
            inner.tasks.clear();
            inner.generation += 1;
            return;
        };

        if next == current {
            return;
        }

        let Some(provider) = self.provider.as_ref() else {
            return;
        };

        match self.bind(provider.as_ref(), &next) {
            Ok(contract) => {
                info!(from = %current, to = %next, "account changed, contract rebound");
                inner.state = SessionState::Connected {
                    account: next,
                    contract,
                };
            }
            Err(err) => {
                warn!(error = %err, "failed to rebind contract after account change");
                inner.state = SessionState::Disconnected;
                inner.tasks.clear();
                inner.generation += 1;
                drop(inner);
                self.notifier.error(&err.to_string());
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        let (account, connecting) = match &inner.state {
            SessionState::Disconnected => (None, false),
            SessionState::Connecting => (None, true),
            SessionState::Connected { account, .. } => (Some(account.clone()), false),
        };
        SessionSnapshot {
            account,
            connecting,
            tasks: inner.tasks.clone(),
        }
    }

    pub fn account(&self) -> Option<Address> {
        match &self.lock().state {
            SessionState::Connected { account, .. } => Some(account.clone()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.lock().state, SessionState::Connected { .. })
    }

    pub fn binding(&self) -> Option<Binding> {
        let inner = self.lock();
        match &inner.state {
            SessionState::Connected { contract, .. } => Some(Binding {
                contract: Arc::clone(contract),
                generation: inner.generation,
            }),
            _ => None,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn find_task(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Installs a full read of the task collection. Returns false, leaving the
    /// list alone, when the session it was read for is gone.
    pub fn replace_tasks(&self, generation: u64, tasks: Vec<Task>) -> bool {
        let mut inner = self.lock();
        let live = matches!(inner.state, SessionState::Connected { .. });
        if !live || inner.generation != generation {
            debug!(generation, current = inner.generation, "discarding stale task refresh");
            return false;
        }
        inner.tasks = tasks;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AccountsListener, PendingTransaction};
    use crate::service::notify::{ToastBoard, ToastKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    struct StaticContract {
        signer: Address,
        tasks: Vec<Task>,
    }

    impl TaskContract for StaticContract {
        fn signer(&self) -> &Address {
            &self.signer
        }

        fn add_task(&self, _: &str, _: &str) -> ChainResult<Box<dyn PendingTransaction>> {
            unimplemented!()
        }

        fn edit_task(
            &self,
            _: TaskId,
            _: &str,
            _: &str,
        ) -> ChainResult<Box<dyn PendingTransaction>> {
            unimplemented!()
        }

        fn mark_task_completed(&self, _: TaskId) -> ChainResult<Box<dyn PendingTransaction>> {
            unimplemented!()
        }

        fn delete_task(&self, _: TaskId) -> ChainResult<Box<dyn PendingTransaction>> {
            unimplemented!()
        }

        fn get_task(&self) -> ChainResult<Vec<Task>> {
            Ok(self.tasks.clone())
        }

        fn get_task_counter(&self) -> ChainResult<u64> {
            Ok(self.tasks.len() as u64)
        }
    }

    struct MockWallet {
        accounts: Vec<Address>,
        requests: AtomicUsize,
        reject: bool,
        gate: Option<Arc<Barrier>>,
        listeners: Mutex<Vec<AccountsListener>>,
        tasks: Vec<Task>,
        // Reported to the listeners from inside the next bind_contract call.
        emit_on_bind: Mutex<Option<Vec<Address>>>,
    }

    impl MockWallet {
        fn new(accounts: Vec<Address>) -> Self {
            Self {
                accounts,
                requests: AtomicUsize::new(0),
                reject: false,
                gate: None,
                listeners: Mutex::new(Vec::new()),
                tasks: Vec::new(),
                emit_on_bind: Mutex::new(None),
            }
        }

        fn emit(&self, accounts: Vec<Address>) {
            for listener in self.listeners.lock().unwrap().iter() {
                listener(accounts.clone());
            }
        }
    }

    impl WalletProvider for MockWallet {
        fn chain_id(&self) -> u64 {
            31337
        }

        fn request_accounts(&self) -> ChainResult<Vec<Address>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                // Hold the first connect inside the provider until the second caller has run.
                gate.wait();
                gate.wait();
            }
            if self.reject {
                return Err(ChainError::ConnectionRejected("User rejected the request.".into()));
            }
            Ok(self.accounts.clone())
        }

        fn bind_contract(
            &self,
            _: &ContractDescriptor,
            signer: Signer,
        ) -> ChainResult<Arc<dyn TaskContract>> {
            let emit = self.emit_on_bind.lock().unwrap().take();
            if let Some(accounts) = emit {
                self.emit(accounts);
            }
            Ok(Arc::new(StaticContract {
                signer: signer.account,
                tasks: self.tasks.clone(),
            }))
        }

        fn on_accounts_changed(&self, listener: AccountsListener) {
            self.listeners.lock().unwrap().push(listener);
        }
    }

    fn manager(wallet: Option<Arc<MockWallet>>) -> (Arc<SessionManager>, Arc<ToastBoard>) {
        let board = Arc::new(ToastBoard::new());
        let provider = wallet.map(|w| w as Arc<dyn WalletProvider>);
        let descriptor = ContractDescriptor::task_manager(addr(0xee));
        (SessionManager::new(provider, descriptor, board.clone()), board)
    }

    #[test]
    fn test_connect_without_provider() {
        let (session, board) = manager(None);
        assert_eq!(session.connect(), Err(ChainError::ProviderUnavailable));
        assert!(!session.is_connected());
        let toasts = board.history();
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(toasts[0].message, "Please install a wallet provider to use this app");
    }

    #[test]
    fn test_connect_rejected_returns_to_disconnected() {
        let mut wallet = MockWallet::new(vec![addr(1)]);
        wallet.reject = true;
        let (session, board) = manager(Some(Arc::new(wallet)));

        let err = session.connect().unwrap_err();
        assert_eq!(err, ChainError::ConnectionRejected("User rejected the request.".into()));
        assert!(!session.snapshot().connecting);
        assert_eq!(board.history()[0].message, "User rejected the request.");
    }

    #[test]
    fn test_connect_loads_tasks_and_is_idempotent() {
        let mut wallet = MockWallet::new(vec![addr(1)]);
        wallet.tasks = vec![Task::new(TaskId(1), "a".into(), "b".into(), addr(1))];
        let wallet = Arc::new(wallet);
        let (session, _) = manager(Some(wallet.clone()));

        assert_eq!(session.connect().unwrap(), ConnectOutcome::Connected(addr(1)));
        assert_eq!(session.connect().unwrap(), ConnectOutcome::AlreadyConnected);
        assert_eq!(wallet.requests.load(Ordering::SeqCst), 1);
        assert_eq!(session.snapshot().tasks.len(), 1);
        assert_eq!(wallet.listeners.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_connect_sends_one_request() {
        let gate = Arc::new(Barrier::new(2));
        let mut wallet = MockWallet::new(vec![addr(1)]);
        wallet.gate = Some(gate.clone());
        let wallet = Arc::new(wallet);
        let (session, _) = manager(Some(wallet.clone()));

        let first = {
            let session = session.clone();
            thread::spawn(move || session.connect())
        };

        // First connect is now parked inside request_accounts.
        gate.wait();
        assert!(session.snapshot().connecting);
        assert_eq!(session.connect().unwrap(), ConnectOutcome::InProgress);
        gate.wait();

        assert_eq!(first.join().unwrap().unwrap(), ConnectOutcome::Connected(addr(1)));
        assert_eq!(wallet.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_revoke_during_reconnect_ends_disconnected() {
        let mut wallet = MockWallet::new(vec![addr(1)]);
        wallet.tasks = vec![Task::new(TaskId(1), "a".into(), "b".into(), addr(1))];
        let wallet = Arc::new(wallet);
        let (session, board) = manager(Some(wallet.clone()));
        session.connect().unwrap();
        wallet.emit(vec![]);
        assert_eq!(session.account(), None);

        *wallet.emit_on_bind.lock().unwrap() = Some(vec![]);
        let err = session.connect().unwrap_err();

        assert!(matches!(err, ChainError::ConnectionRejected(_)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.account, None);
        assert!(!snapshot.connecting);
        assert!(snapshot.tasks.is_empty());
        assert!(session.binding().is_none());
        let last = board.history().pop().unwrap();
        assert_eq!(last.kind, ToastKind::Error);
    }

    #[test]
    fn test_account_switch_during_reconnect_rebinds() {
        let wallet = Arc::new(MockWallet::new(vec![addr(1), addr(2)]));
        let (session, _) = manager(Some(wallet.clone()));
        session.connect().unwrap();
        wallet.emit(vec![]);

        *wallet.emit_on_bind.lock().unwrap() = Some(vec![addr(2)]);
        assert_eq!(session.connect().unwrap(), ConnectOutcome::Connected(addr(2)));

        assert_eq!(session.account(), Some(addr(2)));
        assert_eq!(session.binding().unwrap().contract.signer(), &addr(2));
        assert_eq!(wallet.listeners.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_accounts_tears_down_session() {
        let mut wallet = MockWallet::new(vec![addr(1)]);
        wallet.tasks = vec![
            Task::new(TaskId(1), "a".into(), "".into(), addr(1)),
            Task::new(TaskId(2), "b".into(), "".into(), addr(2)),
        ];
        let wallet = Arc::new(wallet);
        let (session, _) = manager(Some(wallet.clone()));
        session.connect().unwrap();
        let generation = session.binding().unwrap().generation;

        wallet.emit(vec![]);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.account, None);
        assert!(snapshot.tasks.is_empty());
        assert!(session.binding().is_none());
        assert!(!session.replace_tasks(generation, vec![]));
    }

    #[test]
    fn test_account_swap_rebinds_signer() {
        let wallet = Arc::new(MockWallet::new(vec![addr(1), addr(2)]));
        let (session, _) = manager(Some(wallet.clone()));
        session.connect().unwrap();
        let before = session.binding().unwrap();
        assert_eq!(before.contract.signer(), &addr(1));

        wallet.emit(vec![addr(2), addr(1)]);

        assert_eq!(session.account(), Some(addr(2)));
        let after = session.binding().unwrap();
        assert_eq!(after.contract.signer(), &addr(2));
        assert_eq!(after.generation, before.generation);
    }

    #[test]
    fn test_accounts_change_before_connect_is_ignored() {
        let (session, _) = manager(Some(Arc::new(MockWallet::new(vec![addr(1)]))));
        session.on_accounts_changed(vec![addr(3)]);
        assert_eq!(session.account(), None);
    }
}
