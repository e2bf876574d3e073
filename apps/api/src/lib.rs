pub mod router;
pub mod services;
