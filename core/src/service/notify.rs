use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Older toasts fall off the history past this many.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Transient user notifications.
pub trait Notifier: Send + Sync {
    fn loading(&self, message: &str) -> ToastId;
    fn dismiss(&self, id: ToastId);
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Default)]
struct Toasts {
    active: Vec<Toast>,
    history: Vec<Toast>,
}

/// In-memory toast stack shared between whoever raises toasts and whoever
/// renders them.
#[derive(Default)]
pub struct ToastBoard {
    next_id: AtomicU64,
    toasts: Mutex<Toasts>,
}

impl ToastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, kind: ToastKind, message: &str) -> ToastId {
        let id = ToastId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let toast = Toast {
            id,
            kind,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        let mut toasts = self.lock();
        if toasts.history.len() >= HISTORY_LIMIT {
            toasts.history.remove(0);
        }
        toasts.history.push(toast.clone());
        toasts.active.push(toast);
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Toasts> {
        // A panic while holding the lock cannot leave the toast lists invalid.
        self.toasts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active(&self) -> Vec<Toast> {
        self.lock().active.clone()
    }

    pub fn history(&self) -> Vec<Toast> {
        self.lock().history.clone()
    }

    /// Drops finished toasts older than `ttl`. Loading toasts stay until dismissed.
    pub fn expire(&self, now: DateTime<Utc>, ttl: Duration) {
        self.lock()
            .active
            .retain(|t| t.kind == ToastKind::Loading || now - t.created_at < ttl);
    }
}

impl Notifier for ToastBoard {
    fn loading(&self, message: &str) -> ToastId {
        self.push(ToastKind::Loading, message)
    }

    fn dismiss(&self, id: ToastId) {
        self.lock().active.retain(|t| t.id != id);
    }

    fn success(&self, message: &str) {
        self.push(ToastKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(ToastKind::Error, message);
    }
}

/// Dismisses its loading toast when dropped, whichever way the caller exits.
pub struct LoadingGuard<'a> {
    notifier: &'a dyn Notifier,
    id: Option<ToastId>,
}

impl<'a> LoadingGuard<'a> {
    pub fn show(notifier: &'a dyn Notifier, message: &str) -> Self {
        let id = notifier.loading(message);
        Self {
            notifier,
            id: Some(id),
        }
    }

    pub fn dismiss(mut self) {
        if let Some(id) = self.id.take() {
            self.notifier.dismiss(id);
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.notifier.dismiss(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismiss_removes_only_target() {
        let board = ToastBoard::new();
        let loading = board.loading("Adding task...");
        board.success("Wallet connected successfully!");
        board.dismiss(loading);

        let active = board.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Success);
        assert_eq!(board.history().len(), 2);
    }

    #[test]
    fn test_expire_keeps_loading() {
        let board = ToastBoard::new();
        board.loading("Deleting task...");
        board.error("boom");

        board.expire(Utc::now() + Duration::seconds(10), Duration::seconds(3));
        let active = board.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, ToastKind::Loading);
    }

    #[test]
    fn test_history_is_capped() {
        let board = ToastBoard::new();
        for i in 0..HISTORY_LIMIT + 5 {
            board.success(&format!("toast {}", i));
        }

        let history = board.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].message, "toast 5");
        assert_eq!(board.active().len(), HISTORY_LIMIT + 5);
    }

    #[test]
    fn test_guard_dismisses_on_drop() {
        let board = ToastBoard::new();
        {
            let _guard = LoadingGuard::show(&board, "Completing task...");
            assert_eq!(board.active().len(), 1);
        }
        assert!(board.active().is_empty());
    }
}
