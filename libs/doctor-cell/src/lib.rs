pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::DoctorError;
pub use models::{Doctor, DoctorProfile, DoctorSummary};
pub use services::DoctorService;
pub use store::{DoctorStore, MemoryDoctorStore, SupabaseDoctorStore};
