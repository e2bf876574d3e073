pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::PatientError;
pub use models::{Patient, PatientContact, PatientProfile};
pub use services::PatientService;
pub use store::{MemoryPatientStore, PatientStore, SupabasePatientStore};
