use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SlotError;
use crate::models::{BookingOutcome, Slot, SlotChanges, SlotFilter, UpdateGuard};

mod memory;
mod supabase;

pub use memory::MemorySlotStore;
pub use supabase::SupabaseSlotStore;

/// Persistence for appointment slots. Every write is a single atomic step:
/// the conditions a method documents are checked and applied together, so
/// two racing callers can never both succeed.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Inserts the whole batch or nothing. Fails with `Overlap` when any
    /// slot intersects a stored slot of the same doctor.
    async fn insert_batch(&self, slots: Vec<Slot>) -> Result<Vec<Slot>, SlotError>;

    async fn find(&self, id: Uuid) -> Result<Option<Slot>, SlotError>;

    /// Matching slots ordered by start time.
    async fn list(&self, filter: &SlotFilter) -> Result<Vec<Slot>, SlotError>;

    /// Books the slot for `patient_id` if it is unbooked, not started and
    /// not held by someone else, and the patient has no booked slot with
    /// the same doctor ending after `now`.
    async fn book(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<BookingOutcome, SlotError>;

    /// Clears the booking when `patient_id` holds it. `None` otherwise.
    async fn cancel(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError>;

    /// Applies `changes` if the row still satisfies `guard`. `None` when the
    /// slot is missing or the guard no longer holds.
    async fn update(
        &self,
        id: Uuid,
        changes: &SlotChanges,
        guard: UpdateGuard,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError>;

    /// Deletes the slot if it is unbooked. Returns whether a row was removed.
    async fn delete_unbooked(&self, id: Uuid) -> Result<bool, SlotError>;

    /// Places or refreshes a hold, dropping any other active hold the
    /// patient has with the same doctor. `None` when the slot is booked,
    /// started or held by another patient.
    async fn reserve(
        &self,
        id: Uuid,
        patient_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError>;

    /// Drops the hold of `patient_id`. `None` when they do not hold it.
    async fn release(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError>;
}
