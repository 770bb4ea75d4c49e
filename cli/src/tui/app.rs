use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use ratatui::widgets::TableState;
use taskchain_core::devnet::DevWallet;
use taskchain_core::{SessionManager, SessionSnapshot, Task, TaskCommand, TaskId, Toast, ToastBoard};

use crate::tui::runtime::RuntimeCommand;

const TOAST_TTL_SECS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStep {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Adding(FormField),
    Editing { id: TaskId, step: EditStep },
}

/// A single-line text buffer with a char-indexed cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value.chars().take(chars).map(|c| c.len_utf8()).sum()
    }

    pub fn insert(&mut self, c: char) {
        let idx = self.byte_index(self.cursor);
        self.value.insert(idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let idx = self.byte_index(self.cursor - 1);
            self.value.remove(idx);
            self.cursor -= 1;
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }
}

pub struct App {
    pub session: Arc<SessionManager>,
    pub toasts: Arc<ToastBoard>,
    pub wallet: Option<Arc<DevWallet>>,
    pub network: String,
    pub snapshot: SessionSnapshot,
    pub visible_toasts: Vec<Toast>,
    pub state: TableState,
    pub input_mode: InputMode,
    pub title: TextInput,
    pub description: TextInput,
    pub should_quit: bool,
    outbox: Vec<RuntimeCommand>,
    // Set when a connect is queued, cleared by the runtime once it returns.
    connect_pending: Arc<AtomicBool>,
}

impl App {
    pub fn new(
        session: Arc<SessionManager>,
        toasts: Arc<ToastBoard>,
        wallet: Option<Arc<DevWallet>>,
        network: String,
    ) -> App {
        App {
            session,
            toasts,
            wallet,
            network,
            snapshot: SessionSnapshot::default(),
            visible_toasts: Vec::new(),
            state: TableState::default(),
            input_mode: InputMode::Normal,
            title: TextInput::default(),
            description: TextInput::default(),
            should_quit: false,
            outbox: Vec::new(),
            connect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pulls the latest session state and toasts. Called every frame.
    pub fn sync(&mut self) {
        self.snapshot = self.session.snapshot();

        self.toasts
            .expire(Utc::now(), Duration::seconds(TOAST_TTL_SECS));
        self.visible_toasts = self.toasts.active();

        if self.snapshot.account.is_none() && self.input_mode != InputMode::Normal {
            self.input_mode = InputMode::Normal;
        }

        let len = self.snapshot.tasks.len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            None => self.state.select(Some(0)),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            Some(_) => {}
        }
    }

    pub fn connect_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connect_pending)
    }

    pub fn take_commands(&mut self) -> Vec<RuntimeCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.account.is_some()
    }

    pub fn is_connecting(&self) -> bool {
        self.connect_pending.load(Ordering::SeqCst) || self.snapshot.connecting
    }

    pub fn tasks(&self) -> &[Task] {
        &self.snapshot.tasks
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.snapshot.tasks.get(i))
    }

    pub fn connect(&mut self) {
        if self.is_connected() || self.is_connecting() {
            return;
        }
        self.connect_pending.store(true, Ordering::SeqCst);
        self.outbox.push(RuntimeCommand::Connect);
    }

    pub fn next(&mut self) {
        let len = self.snapshot.tasks.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.snapshot.tasks.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn complete_selected(&mut self) {
        if let Some(task) = self.selected_task() {
            let id = task.id;
            self.outbox.push(RuntimeCommand::Task(TaskCommand::Complete { id }));
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(task) = self.selected_task() {
            let id = task.id;
            self.outbox.push(RuntimeCommand::Task(TaskCommand::Delete { id }));
        }
    }

    pub fn enter_add_mode(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.title.clear();
        self.description.clear();
        self.input_mode = InputMode::Adding(FormField::Title);
    }

    /// Completed tasks can't be edited.
    pub fn enter_edit_mode(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        if task.is_completed() {
            return;
        }
        let id = task.id;
        let (title, description) = (task.title.clone(), task.description.clone());
        self.title = TextInput::with_value(&title);
        self.description = TextInput::with_value(&description);
        self.input_mode = InputMode::Editing {
            id,
            step: EditStep::Title,
        };
    }

    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn active_input(&mut self) -> Option<&mut TextInput> {
        match self.input_mode {
            InputMode::Normal => None,
            InputMode::Adding(FormField::Title)
            | InputMode::Editing {
                step: EditStep::Title,
                ..
            } => Some(&mut self.title),
            InputMode::Adding(FormField::Description)
            | InputMode::Editing {
                step: EditStep::Description,
                ..
            } => Some(&mut self.description),
        }
    }

    pub fn toggle_field(&mut self) {
        if let InputMode::Adding(field) = self.input_mode {
            self.input_mode = InputMode::Adding(match field {
                FormField::Title => FormField::Description,
                FormField::Description => FormField::Title,
            });
        }
    }

    pub fn submit(&mut self) {
        match self.input_mode {
            InputMode::Normal => {}
            InputMode::Adding(_) => {
                if self.title.value.trim().is_empty() {
                    return;
                }
                self.outbox.push(RuntimeCommand::Task(TaskCommand::Add {
                    title: self.title.value.clone(),
                    description: self.description.value.clone(),
                }));
                self.title.clear();
                self.description.clear();
                self.exit_input_mode();
            }
            InputMode::Editing {
                id,
                step: EditStep::Title,
            } => {
                self.input_mode = InputMode::Editing {
                    id,
                    step: EditStep::Description,
                };
            }
            InputMode::Editing {
                id,
                step: EditStep::Description,
            } => {
                if let Some(command) =
                    TaskCommand::edit(id, &self.title.value, &self.description.value)
                {
                    self.outbox.push(RuntimeCommand::Task(command));
                }
                self.exit_input_mode();
            }
        }
    }

    pub fn switch_account(&mut self) {
        if let Some(wallet) = &self.wallet {
            wallet.select_next_account();
        }
    }

    pub fn revoke_accounts(&mut self) {
        if let Some(wallet) = &self.wallet {
            wallet.revoke_all();
        }
    }
}
