pub mod slots;
pub mod validation;

pub use slots::{SlotService, SlotSettings};
