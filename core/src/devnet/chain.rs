use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::contract::{ContractEvent, PendingTransaction, Receipt, TxHash};
use crate::error::{ChainError, ChainResult};
use crate::model::{Address, Task, TaskId, TaskStatus};

/// A mutating `TaskManager` call waiting in the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddTask {
        title: String,
        description: String,
    },
    EditTask {
        id: TaskId,
        title: String,
        description: String,
    },
    MarkTaskCompleted {
        id: TaskId,
    },
    DeleteTask {
        id: TaskId,
    },
}

struct QueuedCall {
    hash: TxHash,
    from: Address,
    call: Call,
}

#[derive(Default)]
struct ChainState {
    tasks: BTreeMap<TaskId, Task>,
    counter: u64,
    mempool: VecDeque<QueuedCall>,
    receipts: HashMap<TxHash, ChainResult<Receipt>>,
    block_number: u64,
    events: Vec<ContractEvent>,
    submitted: usize,
    drop_next: bool,
}

impl ChainState {
    fn owned_task(&mut self, id: TaskId, from: &Address) -> Result<&mut Task, String> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| "Task does not exist".to_string())?;
        if &task.owner != from {
            return Err("Not the task owner".to_string());
        }
        Ok(task)
    }

    fn execute(&mut self, from: &Address, call: Call) -> Result<ContractEvent, String> {
        match call {
            Call::AddTask { title, description } => {
                self.counter += 1;
                let id = TaskId(self.counter);
                let task = Task::new(id, title.clone(), description.clone(), from.clone());
                self.tasks.insert(id, task);
                Ok(ContractEvent::TaskCreated {
                    task_id: id,
                    title,
                    description,
                    owner: from.clone(),
                })
            }
            Call::EditTask {
                id,
                title,
                description,
            } => {
                let task = self.owned_task(id, from)?;
                task.title = title;
                task.description = description;
                Ok(updated(task))
            }
            Call::MarkTaskCompleted { id } => {
                let task = self.owned_task(id, from)?;
                if task.status == TaskStatus::Completed {
                    return Err("Task already completed".to_string());
                }
                task.status = TaskStatus::Completed;
                Ok(updated(task))
            }
            Call::DeleteTask { id } => {
                self.owned_task(id, from)?;
                self.tasks.remove(&id);
                Ok(ContractEvent::TaskDeleted { task_id: id })
            }
        }
    }

    /// Mines every queued call into one block, in submission order.
    fn mine(&mut self) {
        if self.mempool.is_empty() {
            return;
        }
        self.block_number += 1;
        let block_number = self.block_number;

        while let Some(QueuedCall { hash, from, call }) = self.mempool.pop_front() {
            let outcome = if std::mem::take(&mut self.drop_next) {
                Err(ChainError::ConfirmationFailure(format!(
                    "transaction {} was dropped",
                    hash
                )))
            } else {
                match self.execute(&from, call) {
                    Ok(event) => {
                        self.events.push(event.clone());
                        Ok(Receipt {
                            tx_hash: hash.clone(),
                            block_number,
                            from,
                            events: vec![event],
                        })
                    }
                    Err(reason) => Err(ChainError::ExecutionReverted(format!(
                        "execution reverted: {}",
                        reason
                    ))),
                }
            };
            trace!(tx = %hash, block = block_number, ok = outcome.is_ok(), "mined");
            self.receipts.insert(hash, outcome);
        }
    }
}

fn updated(task: &Task) -> ContractEvent {
    ContractEvent::TaskUpdated {
        task_id: task.id,
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status,
    }
}

fn new_tx_hash() -> TxHash {
    TxHash(format!(
        "0x{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    ))
}

/// In-process chain hosting one `TaskManager` deployment.
pub struct DevChain {
    chain_id: u64,
    block_time: Duration,
    state: Mutex<ChainState>,
}

impl DevChain {
    pub fn new(chain_id: u64, block_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            block_time,
            state: Mutex::new(ChainState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn submit(self: &Arc<Self>, from: Address, call: Call) -> DevPendingTx {
        let hash = new_tx_hash();
        debug!(tx = %hash, from = %from, call = ?call, "queued transaction");
        let mut state = self.lock();
        state.submitted += 1;
        state.mempool.push_back(QueuedCall {
            hash: hash.clone(),
            from,
            call,
        });
        DevPendingTx {
            chain: Arc::clone(self),
            hash,
        }
    }

    /// `getTask()`: every task across all owners, in id order.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.values().cloned().collect()
    }

    pub fn task_counter(&self) -> u64 {
        self.lock().counter
    }

    pub fn block_number(&self) -> u64 {
        self.lock().block_number
    }

    pub fn events(&self) -> Vec<ContractEvent> {
        self.lock().events.clone()
    }

    /// Number of mutating calls ever submitted.
    pub fn submitted(&self) -> usize {
        self.lock().submitted
    }

    pub fn drop_next_transaction(&self) {
        self.lock().drop_next = true;
    }
}

pub struct DevPendingTx {
    chain: Arc<DevChain>,
    hash: TxHash,
}

impl PendingTransaction for DevPendingTx {
    fn hash(&self) -> &TxHash {
        &self.hash
    }

    fn wait(self: Box<Self>) -> ChainResult<Receipt> {
        if !self.chain.block_time.is_zero() {
            thread::sleep(self.chain.block_time);
        }
        let mut state = self.chain.lock();
        state.mine();
        state.receipts.remove(&self.hash).unwrap_or_else(|| {
            Err(ChainError::ConfirmationFailure(format!(
                "transaction {} not found",
                self.hash
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn add(chain: &Arc<DevChain>, from: u8, title: &str) -> ChainResult<Receipt> {
        let call = Call::AddTask {
            title: title.into(),
            description: String::new(),
        };
        Box::new(chain.submit(addr(from), call)).wait()
    }

    #[test]
    fn test_add_assigns_monotonic_ids() {
        let chain = DevChain::new(31337, Duration::ZERO);
        add(&chain, 1, "a").unwrap();
        let receipt = add(&chain, 2, "b").unwrap();

        assert_eq!(receipt.block_number, 2);
        assert_eq!(receipt.from, addr(2));
        let tasks = chain.tasks();
        assert_eq!(tasks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![TaskId(1), TaskId(2)]);
        assert_eq!(tasks[1].owner, addr(2));
    }

    #[test]
    fn test_foreign_task_reverts() {
        let chain = DevChain::new(31337, Duration::ZERO);
        add(&chain, 1, "mine").unwrap();

        let call = Call::DeleteTask { id: TaskId(1) };
        let err = Box::new(chain.submit(addr(2), call)).wait().unwrap_err();
        assert_eq!(
            err,
            ChainError::ExecutionReverted("execution reverted: Not the task owner".into())
        );

        let call = Call::MarkTaskCompleted { id: TaskId(9) };
        let err = Box::new(chain.submit(addr(1), call)).wait().unwrap_err();
        assert_eq!(
            err,
            ChainError::ExecutionReverted("execution reverted: Task does not exist".into())
        );
        assert_eq!(chain.tasks().len(), 1);
    }

    #[test]
    fn test_double_completion_reverts() {
        let chain = DevChain::new(31337, Duration::ZERO);
        add(&chain, 1, "a").unwrap();
        let complete = || {
            let call = Call::MarkTaskCompleted { id: TaskId(1) };
            Box::new(chain.submit(addr(1), call)).wait()
        };

        complete().unwrap();
        assert!(matches!(complete(), Err(ChainError::ExecutionReverted(_))));
    }

    #[test]
    fn test_delete_keeps_counter() {
        let chain = DevChain::new(31337, Duration::ZERO);
        add(&chain, 1, "a").unwrap();
        Box::new(chain.submit(addr(1), Call::DeleteTask { id: TaskId(1) }))
            .wait()
            .unwrap();

        assert!(chain.tasks().is_empty());
        assert_eq!(chain.task_counter(), 1);
        add(&chain, 1, "b").unwrap();
        assert_eq!(chain.tasks()[0].id, TaskId(2));
        assert!(matches!(chain.events()[1], ContractEvent::TaskDeleted { task_id: TaskId(1) }));
    }

    #[test]
    fn test_pending_calls_mine_in_order() {
        let chain = DevChain::new(31337, Duration::ZERO);
        let first = chain.submit(
            addr(1),
            Call::AddTask {
                title: "a".into(),
                description: "".into(),
            },
        );
        let second = chain.submit(addr(1), Call::EditTask {
            id: TaskId(1),
            title: "a2".into(),
            description: "d".into(),
        });

        // Waiting on the later call mines the earlier one too.
        Box::new(second).wait().unwrap();
        Box::new(first).wait().unwrap();
        assert_eq!(chain.tasks()[0].title, "a2");
        assert_eq!(chain.block_number(), 1);
    }

    #[test]
    fn test_dropped_transaction() {
        let chain = DevChain::new(31337, Duration::ZERO);
        chain.drop_next_transaction();
        assert!(matches!(add(&chain, 1, "a"), Err(ChainError::ConfirmationFailure(_))));
        assert!(chain.tasks().is_empty());
        add(&chain, 1, "b").unwrap();
        assert_eq!(chain.tasks().len(), 1);
    }
}
