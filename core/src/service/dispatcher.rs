use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::contract::{PendingTransaction, Receipt, TaskContract};
use crate::error::ChainResult;
use crate::model::TaskId;
use crate::service::notify::LoadingGuard;
use crate::service::session::{Binding, SessionManager};

pub const ALREADY_DONE_MESSAGE: &str = "Task is already done";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    Add {
        title: String,
        description: String,
    },
    Edit {
        id: TaskId,
        title: String,
        description: String,
    },
    Complete {
        id: TaskId,
    },
    Delete {
        id: TaskId,
    },
}

impl TaskCommand {
    /// Builds an edit only when both new fields are filled in.
    pub fn edit(id: TaskId, title: &str, description: &str) -> Option<Self> {
        if title.is_empty() || description.is_empty() {
            return None;
        }
        Some(TaskCommand::Edit {
            id,
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        match self {
            TaskCommand::Add { .. } => "addTask",
            TaskCommand::Edit { .. } => "editTask",
            TaskCommand::Complete { .. } => "markTaskCompleted",
            TaskCommand::Delete { .. } => "deleteTask",
        }
    }

    fn pending_message(&self) -> &'static str {
        match self {
            TaskCommand::Add { .. } => "Adding task...",
            TaskCommand::Edit { .. } => "Updating task...",
            TaskCommand::Complete { .. } => "Completing task...",
            TaskCommand::Delete { .. } => "Deleting task...",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            TaskCommand::Add { .. } => "Task added successfully!",
            TaskCommand::Edit { .. } => "Task updated!",
            TaskCommand::Complete { .. } => "Task completed!",
            TaskCommand::Delete { .. } => "Task deleted!",
        }
    }

    fn submit(&self, contract: &dyn TaskContract) -> ChainResult<Box<dyn PendingTransaction>> {
        match self {
            TaskCommand::Add { title, description } => contract.add_task(title, description),
            TaskCommand::Edit {
                id,
                title,
                description,
            } => contract.edit_task(*id, title, description),
            TaskCommand::Complete { id } => contract.mark_task_completed(*id),
            TaskCommand::Delete { id } => contract.delete_task(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No session; nothing was sent.
    Skipped,
    /// The cached task was already completed; nothing was sent.
    AlreadyCompleted,
    Confirmed(Receipt),
}

/// Runs task mutations against the session's contract handle, one at a time,
/// and resynchronizes the task list after each confirmed one.
pub struct TaskDispatcher {
    session: Arc<SessionManager>,
    in_flight: Mutex<()>,
}

impl TaskDispatcher {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            in_flight: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn dispatch(&self, command: TaskCommand) -> ChainResult<DispatchOutcome> {
        let _serial = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(binding) = self.session.binding() else {
            debug!(command = command.name(), "not connected, skipping");
            return Ok(DispatchOutcome::Skipped);
        };

        let notifier = self.session.notifier();

        if let TaskCommand::Complete { id } = &command {
            let done = self
                .session
                .find_task(*id)
                .map(|t| t.is_completed())
                .unwrap_or(false);
            if done {
                notifier.error(ALREADY_DONE_MESSAGE);
                return Ok(DispatchOutcome::AlreadyCompleted);
            }
        }

        match self.execute(&binding, &command) {
            Ok((receipt, refreshed)) => {
                info!(
                    command = command.name(),
                    tx = %receipt.tx_hash,
                    block = receipt.block_number,
                    "transaction confirmed"
                );
                if refreshed {
                    notifier.success(command.success_message());
                } else {
                    debug!(command = command.name(), "session gone, no success toast");
                }
                Ok(DispatchOutcome::Confirmed(receipt))
            }
            Err(err) => {
                error!(command = command.name(), error = %err, "task command failed");
                notifier.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Returns the receipt and whether the refreshed list was installed.
    fn execute(&self, binding: &Binding, command: &TaskCommand) -> ChainResult<(Receipt, bool)> {
        let contract = binding.contract.as_ref();
        let pending = command.submit(contract)?;
        debug!(command = command.name(), tx = %pending.hash(), "submitted");

        let notifier = self.session.notifier().as_ref();
        let loading = LoadingGuard::show(notifier, command.pending_message());
        let receipt = pending.wait()?;

        let tasks = contract.get_task()?;
        let refreshed = self.session.replace_tasks(binding.generation, tasks);
        loading.dismiss();

        Ok((receipt, refreshed))
    }

    pub fn add_task(&self, title: &str, description: &str) -> ChainResult<DispatchOutcome> {
        self.dispatch(TaskCommand::Add {
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    pub fn edit_task(
        &self,
        id: TaskId,
        title: &str,
        description: &str,
    ) -> ChainResult<DispatchOutcome> {
        self.dispatch(TaskCommand::Edit {
            id,
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    pub fn complete_task(&self, id: TaskId) -> ChainResult<DispatchOutcome> {
        self.dispatch(TaskCommand::Complete { id })
    }

    pub fn delete_task(&self, id: TaskId) -> ChainResult<DispatchOutcome> {
        self.dispatch(TaskCommand::Delete { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_requires_both_fields() {
        assert!(TaskCommand::edit(TaskId(1), "title", "").is_none());
        assert!(TaskCommand::edit(TaskId(1), "", "desc").is_none());
        // Only an empty answer cancels; whitespace is a value.
        assert!(TaskCommand::edit(TaskId(1), "  ", "desc").is_some());
        assert_eq!(
            TaskCommand::edit(TaskId(1), "t", "d"),
            Some(TaskCommand::Edit {
                id: TaskId(1),
                title: "t".into(),
                description: "d".into()
            })
        );
    }

    #[test]
    fn test_messages() {
        let cmd = TaskCommand::Delete { id: TaskId(3) };
        assert_eq!(cmd.pending_message(), "Deleting task...");
        assert_eq!(cmd.success_message(), "Task deleted!");
        assert_eq!(cmd.name(), "deleteTask");
    }
}
