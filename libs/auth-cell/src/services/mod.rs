pub mod identity;
pub mod notifier;
pub mod password;
pub mod tokens;

pub use identity::IdentityService;
pub use notifier::{Notice, NoticeKind, Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use password::PasswordService;
