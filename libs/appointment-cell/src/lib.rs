pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::{SlotError, SlotValidationError};
pub use models::{Slot, SlotStatus, SlotView};
pub use services::{SlotService, SlotSettings};
pub use store::{MemorySlotStore, SlotStore, SupabaseSlotStore};
