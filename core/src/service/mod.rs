pub mod dispatcher;
pub mod notify;
pub mod session;


pub use dispatcher::{DispatchOutcome, TaskCommand, TaskDispatcher};
pub use notify::{LoadingGuard, Notifier, Toast, ToastBoard, ToastId, ToastKind};
pub use session::{Binding, ConnectOutcome, SessionManager, SessionSnapshot, SessionState};
