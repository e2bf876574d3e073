pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::IdentityError;
pub use models::{NewUser, UserProfile, UserRecord};
pub use services::{IdentityService, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use store::{MemoryUserStore, SupabaseUserStore, UserStore};
