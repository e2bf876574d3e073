use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SlotError, SlotValidationError};
use crate::models::{BookingOutcome, Slot, SlotChanges, SlotFilter, UpdateGuard};

use super::SlotStore;

/// In-process store. All checks run under the write lock, which gives the
/// same all-or-nothing behaviour as the database constraints.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<Uuid, Slot>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn first_conflict<'a>(
    slots: &'a HashMap<Uuid, Slot>,
    doctor_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ignore: Option<Uuid>,
) -> Option<&'a Slot> {
    slots.values().find(|s| {
        s.doctor_id == doctor_id && Some(s.id) != ignore && s.overlaps(start, end)
    })
}

fn guard_holds(slot: &Slot, guard: UpdateGuard) -> bool {
    match guard {
        UpdateGuard::Unbooked => slot.patient_id.is_none(),
        UpdateGuard::BookedBy(patient_id) => slot.patient_id == Some(patient_id),
        UpdateGuard::Any => true,
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn insert_batch(&self, batch: Vec<Slot>) -> Result<Vec<Slot>, SlotError> {
        let mut slots = self.slots.write().await;

        for (i, slot) in batch.iter().enumerate() {
            if let Some(existing) = first_conflict(&slots, slot.doctor_id, slot.start_time, slot.end_time, None) {
                return Err(SlotError::Overlap { conflicting_slot: Some(existing.id) });
            }
            if batch[..i]
                .iter()
                .any(|other| other.doctor_id == slot.doctor_id && other.overlaps(slot.start_time, slot.end_time))
            {
                return Err(SlotError::Overlap { conflicting_slot: None });
            }
        }

        for slot in &batch {
            slots.insert(slot.id, slot.clone());
        }
        Ok(batch)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Slot>, SlotError> {
        Ok(self.slots.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &SlotFilter) -> Result<Vec<Slot>, SlotError> {
        let mut found: Vec<Slot> = self.slots
            .read()
            .await
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.start_time, s.id));
        Ok(found)
    }

    async fn book(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<BookingOutcome, SlotError> {
        let mut slots = self.slots.write().await;

        let Some(doctor_id) = slots
            .get(&id)
            .filter(|s| s.is_bookable_by(patient_id, now))
            .map(|s| s.doctor_id)
        else {
            return Ok(BookingOutcome::Unavailable);
        };

        let has_upcoming = slots.values().any(|s| {
            s.doctor_id == doctor_id && s.patient_id == Some(patient_id) && s.end_time > now
        });
        if has_upcoming {
            return Ok(BookingOutcome::AlreadyHasAppointment);
        }

        let Some(slot) = slots.get_mut(&id) else {
            return Ok(BookingOutcome::Unavailable);
        };
        slot.patient_id = Some(patient_id);
        slot.booked_at = Some(now);
        slot.reserved_by = None;
        slot.reserved_until = None;
        slot.updated_at = now;
        Ok(BookingOutcome::Booked(slot.clone()))
    }

    async fn cancel(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError> {
        let mut slots = self.slots.write().await;
        Ok(slots
            .get_mut(&id)
            .filter(|s| s.patient_id == Some(patient_id))
            .map(|slot| {
                slot.patient_id = None;
                slot.booked_at = None;
                slot.reason = None;
                slot.patient_notes = None;
                slot.updated_at = now;
                slot.clone()
            }))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &SlotChanges,
        guard: UpdateGuard,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError> {
        let mut slots = self.slots.write().await;

        let Some(current) = slots.get(&id).filter(|s| guard_holds(s, guard)) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        changes.apply(&mut updated, now);

        if changes.changes_times() {
            if updated.start_time >= updated.end_time {
                return Err(SlotValidationError::EndNotAfterStart { index: 0 }.into());
            }
            if let Some(existing) = first_conflict(&slots, updated.doctor_id, updated.start_time, updated.end_time, Some(id)) {
                return Err(SlotError::Overlap { conflicting_slot: Some(existing.id) });
            }
        }

        slots.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_unbooked(&self, id: Uuid) -> Result<bool, SlotError> {
        let mut slots = self.slots.write().await;
        if slots.get(&id).is_some_and(|s| s.patient_id.is_none()) {
            slots.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn reserve(
        &self,
        id: Uuid,
        patient_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError> {
        let mut slots = self.slots.write().await;
        let Some(doctor_id) = slots
            .get(&id)
            .filter(|s| s.is_bookable_by(patient_id, now))
            .map(|s| s.doctor_id)
        else {
            return Ok(None);
        };

        // One active hold per patient and doctor: the new hold replaces the old.
        for other in slots.values_mut().filter(|s| {
            s.id != id && s.doctor_id == doctor_id && s.reserved_by == Some(patient_id) && s.has_active_hold(now)
        }) {
            other.reserved_by = None;
            other.reserved_until = None;
            other.updated_at = now;
        }

        Ok(slots.get_mut(&id).map(|slot| {
            slot.reserved_by = Some(patient_id);
            slot.reserved_until = Some(until);
            slot.updated_at = now;
            slot.clone()
        }))
    }

    async fn release(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError> {
        let mut slots = self.slots.write().await;
        Ok(slots
            .get_mut(&id)
            .filter(|s| s.reserved_by == Some(patient_id))
            .map(|slot| {
                slot.reserved_by = None;
                slot.reserved_until = None;
                slot.updated_at = now;
                slot.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use assert_matches::assert_matches;

    fn slot(doctor_id: Uuid, start: DateTime<Utc>, minutes: i64, now: DateTime<Utc>) -> Slot {
        Slot::new(doctor_id, start, start + Duration::minutes(minutes), now)
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = MemorySlotStore::new();
        let now = Utc::now();
        let doctor = Uuid::new_v4();
        let base = now + Duration::days(1);

        let existing = slot(doctor, base, 30, now);
        store.insert_batch(vec![existing.clone()]).await.unwrap();

        let result = store
            .insert_batch(vec![
                slot(doctor, base + Duration::hours(2), 30, now),
                slot(doctor, base + Duration::minutes(15), 30, now),
            ])
            .await;

        assert_matches!(result, Err(SlotError::Overlap { conflicting_slot: Some(id) }) if id == existing.id);
        assert_eq!(store.list(&SlotFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_doctors_do_not_conflict() {
        let store = MemorySlotStore::new();
        let now = Utc::now();
        let base = now + Duration::days(1);

        store.insert_batch(vec![slot(Uuid::new_v4(), base, 30, now)]).await.unwrap();
        store.insert_batch(vec![slot(Uuid::new_v4(), base, 30, now)]).await.unwrap();

        assert_eq!(store.list(&SlotFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_respects_guard_and_overlap() {
        let store = MemorySlotStore::new();
        let now = Utc::now();
        let doctor = Uuid::new_v4();
        let base = now + Duration::days(1);
        let first = slot(doctor, base, 30, now);
        let second = slot(doctor, base + Duration::hours(1), 30, now);
        store.insert_batch(vec![first.clone(), second.clone()]).await.unwrap();

        let moved = SlotChanges {
            start_time: Some(base + Duration::minutes(45)),
            end_time: Some(base + Duration::minutes(75)),
            ..SlotChanges::default()
        };
        assert_matches!(
            store.update(first.id, &moved, UpdateGuard::Unbooked, now).await,
            Err(SlotError::Overlap { conflicting_slot: Some(id) }) if id == second.id
        );

        let notes = SlotChanges { reason: Some(Some("x".into())), ..SlotChanges::default() };
        let patient = Uuid::new_v4();
        assert_eq!(store.update(first.id, &notes, UpdateGuard::BookedBy(patient), now).await.unwrap(), None);
    }
}
