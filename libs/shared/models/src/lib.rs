pub mod auth;
pub mod error;

pub use auth::{User, UserRole};
pub use error::AppError;
