use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use taskchain_core::{SessionManager, TaskCommand, TaskDispatcher};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    Connect,
    Task(TaskCommand),
    Shutdown,
}

/// Runs wallet and contract calls off the UI thread so waiting for a
/// confirmation never freezes the screen. Commands run one at a time.
pub struct RuntimeBridge {
    tx: Sender<RuntimeCommand>,
    handle: Option<JoinHandle<()>>,
}

impl RuntimeBridge {
    pub fn spawn(session: Arc<SessionManager>, connect_pending: Arc<AtomicBool>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<RuntimeCommand>();
        let dispatcher = TaskDispatcher::new(session);

        let handle = thread::Builder::new()
            .name("taskchain-runtime".to_string())
            .spawn(move || {
                for command in rx {
                    debug!(?command, "runtime command");
                    match command {
                        // Failures are already logged and toasted by the session/dispatcher.
                        RuntimeCommand::Connect => {
                            let _ = dispatcher.session().connect();
                            connect_pending.store(false, Ordering::SeqCst);
                        }
                        RuntimeCommand::Task(task) => {
                            let _ = dispatcher.dispatch(task);
                        }
                        RuntimeCommand::Shutdown => break,
                    }
                }
                info!("runtime stopped");
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, command: RuntimeCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("runtime thread is gone"))
    }

    /// Drains commands queued before this call, then joins the thread.
    pub fn shutdown(mut self) {
        let _ = self.tx.send(RuntimeCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
