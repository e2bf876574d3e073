use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_utils::clock::Clock;

use crate::error::{SlotError, SlotValidationError};
use crate::models::{
    AvailableSlot, BookingOutcome, DoctorSlotView, PatientSlotView, Slot, SlotCandidate, SlotChanges,
    SlotFilter, SlotUpdate, SlotView, UpdateGuard,
};
use crate::services::validation::{
    envelope, find_persisted_overlap, validate_available_range, validate_batch, validate_times,
    validate_window,
};
use crate::store::SlotStore;

/// Limits the engine applies, read from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SlotSettings {
    pub hold: Duration,
    pub max_slots_per_batch: usize,
    pub availability_horizon_days: i64,
    pub max_query_window_days: i64,
}

impl SlotSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let hold = Duration::try_minutes(config.slot_hold_minutes)
            .filter(|hold| *hold > Duration::zero())
            .unwrap_or_else(|| Duration::minutes(AppConfig::default().slot_hold_minutes));
        Self {
            hold,
            max_slots_per_batch: config.max_slots_per_batch,
            availability_horizon_days: config.availability_horizon_days,
            max_query_window_days: config.max_query_window_days,
        }
    }
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The slot lifecycle engine. Every operation reads the clock once and
/// performs at most one write against the store.
pub struct SlotService {
    store: Arc<dyn SlotStore>,
    doctors: Arc<DoctorService>,
    patients: Arc<PatientService>,
    clock: Arc<dyn Clock>,
    settings: SlotSettings,
}

impl SlotService {
    pub fn new(
        store: Arc<dyn SlotStore>,
        doctors: Arc<DoctorService>,
        patients: Arc<PatientService>,
        clock: Arc<dyn Clock>,
        settings: SlotSettings,
    ) -> Self {
        Self { store, doctors, patients, clock, settings }
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    /// Open slots of a doctor inside `[after, before]`, never in the past.
    #[instrument(skip(self))]
    pub async fn available(
        &self,
        doctor_id: Uuid,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<AvailableSlot>, SlotError> {
        let now = self.clock.now();
        let after = validate_available_range(after, before, now, self.settings.availability_horizon_days)?;

        let doctor = self.doctors.find_doctor(doctor_id).await?;
        if !doctor.active {
            debug!("Doctor {} is inactive, no availability", doctor_id);
            return Ok(Vec::new());
        }

        let filter = SlotFilter {
            doctor_id: Some(doctor_id),
            unbooked_only: true,
            start_from: Some(after),
            end_until: Some(before),
            ..SlotFilter::default()
        };

        Ok(self.store
            .list(&filter)
            .await?
            .iter()
            .filter(|slot| slot.start_time > now && !slot.has_active_hold(now))
            .map(AvailableSlot::from)
            .collect())
    }

    /// Slots of the calling doctor starting in `[after, before)`, with the
    /// booking patient's contact details.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_doctor_slots(
        &self,
        user: &User,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<DoctorSlotView>, SlotError> {
        validate_window(after, before, self.settings.max_query_window_days)?;
        let doctor = self.doctors.assert_is_doctor(user.id).await?;
        let now = self.clock.now();

        let slots = self.store
            .list(&SlotFilter {
                doctor_id: Some(doctor.id),
                start_from: Some(after),
                start_before: Some(before),
                ..SlotFilter::default()
            })
            .await?;

        let patient_ids: Vec<Uuid> = slots
            .iter()
            .filter_map(|s| s.patient_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let contacts = self.patients.patient_contacts(&patient_ids).await?;

        Ok(slots
            .into_iter()
            .map(|slot| {
                let patient = slot.patient_id.and_then(|id| contacts.get(&id).cloned());
                DoctorSlotView { slot: SlotView::from_slot(slot, now), patient }
            })
            .collect())
    }

    /// Appointments of the calling patient starting in `[after, before)`,
    /// with the doctor's public details.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_patient_bookings(
        &self,
        user: &User,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<PatientSlotView>, SlotError> {
        validate_window(after, before, self.settings.max_query_window_days)?;
        let patient = self.patients.assert_is_patient(user.id).await?;
        let now = self.clock.now();

        let slots = self.store
            .list(&SlotFilter {
                patient_id: Some(patient.id),
                start_from: Some(after),
                start_before: Some(before),
                ..SlotFilter::default()
            })
            .await?;

        let doctor_ids: Vec<Uuid> = slots
            .iter()
            .map(|s| s.doctor_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let summaries = self.doctors.doctor_summaries(&doctor_ids).await?;

        Ok(slots
            .into_iter()
            .map(|slot| {
                let doctor = summaries.get(&slot.doctor_id).cloned();
                PatientSlotView { slot: SlotView::from_slot(slot, now).for_patient(), doctor }
            })
            .collect())
    }

    /// A single slot, visible to its doctor, its patient and admins.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_slot(&self, user: &User, slot_id: Uuid) -> Result<SlotView, SlotError> {
        let slot = self.find_slot(slot_id).await?;
        let now = self.clock.now();

        match user.role {
            UserRole::Admin => Ok(SlotView::from_slot(slot, now)),
            UserRole::Doctor => {
                let doctor = self.doctors.assert_is_doctor(user.id).await?;
                if slot.doctor_id != doctor.id {
                    return Err(SlotError::Forbidden("Slot belongs to another doctor".to_string()));
                }
                Ok(SlotView::from_slot(slot, now))
            }
            UserRole::Patient => {
                let patient = self.patients.assert_is_patient(user.id).await?;
                if slot.patient_id != Some(patient.id) {
                    return Err(SlotError::Forbidden("Slot is not booked by you".to_string()));
                }
                Ok(SlotView::from_slot(slot, now).for_patient())
            }
        }
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    /// Creates a batch of slots for the calling doctor, all or none.
    #[instrument(skip(self, user, candidates), fields(user_id = %user.id, count = candidates.len()))]
    pub async fn create_slots(&self, user: &User, candidates: Vec<SlotCandidate>) -> Result<Vec<SlotView>, SlotError> {
        let doctor = self.doctors.assert_is_doctor(user.id).await?;
        let now = self.clock.now();

        validate_batch(&candidates, now, self.settings.max_slots_per_batch)?;

        if let Some((start, end)) = envelope(&candidates) {
            let existing = self.store
                .list(&SlotFilter {
                    doctor_id: Some(doctor.id),
                    start_before: Some(end),
                    end_after: Some(start),
                    ..SlotFilter::default()
                })
                .await?;

            if let Some(conflict) = find_persisted_overlap(&candidates, &existing) {
                info!("Batch overlaps existing slot {}", conflict.id);
                return Err(SlotError::Overlap { conflicting_slot: Some(conflict.id) });
            }
        }

        let slots = candidates
            .iter()
            .map(|c| Slot::new(doctor.id, c.start_time, c.end_time, now))
            .collect();

        let created = self.store.insert_batch(slots).await?;
        info!("Doctor {} created {} slots", doctor.id, created.len());

        Ok(created.into_iter().map(|slot| SlotView::from_slot(slot, now)).collect())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn book_slot(&self, user: &User, slot_id: Uuid) -> Result<SlotView, SlotError> {
        let patient = self.patients.assert_is_patient(user.id).await?;
        let now = self.clock.now();

        let slot = self.find_slot(slot_id).await?;
        if !slot.is_bookable_by(patient.id, now) {
            debug!("Slot {} is not bookable at {}", slot_id, now);
            return Err(SlotError::slot_not_found());
        }

        self.doctors.assert_is_doctor_active(slot.doctor_id).await?;

        match self.store.book(slot_id, patient.id, now).await? {
            BookingOutcome::Booked(slot) => {
                info!("Patient {} booked slot {}", patient.id, slot.id);
                Ok(SlotView::from_slot(slot, now).for_patient())
            }
            BookingOutcome::Unavailable => {
                info!("Slot {} was taken before the booking was written", slot_id);
                Err(SlotError::slot_not_found())
            }
            BookingOutcome::AlreadyHasAppointment => Err(SlotError::AlreadyHasAppointment),
        }
    }

    /// Returns a booked slot to the open pool.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel_slot(&self, user: &User, slot_id: Uuid) -> Result<SlotView, SlotError> {
        let patient = self.patients.assert_is_patient(user.id).await?;
        let now = self.clock.now();

        let slot = self.find_slot(slot_id).await?;
        if slot.patient_id != Some(patient.id) {
            return Err(SlotError::Forbidden("Only the booking patient can cancel".to_string()));
        }
        if slot.start_time <= now {
            return Err(SlotError::Conflict("Appointment has already started".to_string()));
        }

        let cancelled = self.store
            .cancel(slot_id, patient.id, now)
            .await?
            .ok_or_else(SlotError::slot_not_found)?;

        info!("Patient {} cancelled slot {}", patient.id, slot_id);
        Ok(SlotView::from_slot(cancelled, now).for_patient())
    }

    /// Applies a role-specific edit. Time changes are only allowed while
    /// the slot is unbooked.
    #[instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update_slot(&self, user: &User, slot_id: Uuid, update: SlotUpdate) -> Result<SlotView, SlotError> {
        if update.role() != user.role {
            return Err(SlotError::Forbidden(format!("Update is not allowed for {} role", user.role)));
        }

        let now = self.clock.now();
        let slot = self.find_slot(slot_id).await?;

        let (changes, guard, patient_view) = match update {
            SlotUpdate::Doctor(update) => {
                let doctor = self.doctors.assert_is_doctor(user.id).await?;
                if slot.doctor_id != doctor.id {
                    return Err(SlotError::Forbidden("Slot belongs to another doctor".to_string()));
                }
                let changes = SlotChanges::from(update);
                if changes.changes_times() {
                    self.check_doctor_reschedule(&slot, &changes, now).await?;
                    (changes, UpdateGuard::Unbooked, false)
                } else {
                    (changes, UpdateGuard::Any, false)
                }
            }
            SlotUpdate::Patient(update) => {
                let patient = self.patients.assert_is_patient(user.id).await?;
                if slot.patient_id != Some(patient.id) {
                    return Err(SlotError::Forbidden("Slot is not booked by you".to_string()));
                }
                (SlotChanges::from(update), UpdateGuard::BookedBy(patient.id), true)
            }
            SlotUpdate::Admin(update) => {
                let changes = SlotChanges::from(update);
                if changes.changes_times() {
                    reject_booked_reschedule(&slot)?;
                    let start = changes.start_time.unwrap_or(slot.start_time);
                    let end = changes.end_time.unwrap_or(slot.end_time);
                    if start >= end {
                        return Err(SlotValidationError::EndNotAfterStart { index: 0 }.into());
                    }
                    (changes, UpdateGuard::Unbooked, false)
                } else {
                    (changes, UpdateGuard::Any, false)
                }
            }
        };

        let updated = if changes.is_empty() {
            debug!("Empty update for slot {}", slot_id);
            slot
        } else {
            match self.store.update(slot_id, &changes, guard, now).await? {
                Some(updated) => updated,
                None => return Err(lost_update(guard)),
            }
        };

        info!("Slot {} updated by {}", slot_id, user.role);
        let view = SlotView::from_slot(updated, now);
        Ok(if patient_view { view.for_patient() } else { view })
    }

    /// Removes an unbooked slot of the calling doctor.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_slot(&self, user: &User, slot_id: Uuid) -> Result<(), SlotError> {
        let doctor = self.doctors.assert_is_doctor(user.id).await?;
        let slot = self.find_slot(slot_id).await?;

        if slot.doctor_id != doctor.id {
            return Err(SlotError::Forbidden("Slot belongs to another doctor".to_string()));
        }
        if slot.is_booked() {
            return Err(SlotError::Conflict("Booked slot cannot be deleted".to_string()));
        }

        if !self.store.delete_unbooked(slot_id).await? {
            warn!("Slot {} was booked before it could be deleted", slot_id);
            return Err(SlotError::Conflict("Booked slot cannot be deleted".to_string()));
        }

        info!("Doctor {} deleted slot {}", doctor.id, slot_id);
        Ok(())
    }

    /// Holds an open slot for the calling patient for the configured time.
    /// Holding it again extends the hold.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn reserve_slot(&self, user: &User, slot_id: Uuid) -> Result<SlotView, SlotError> {
        let patient = self.patients.assert_is_patient(user.id).await?;
        let now = self.clock.now();

        let slot = self.find_slot(slot_id).await?;
        if !slot.is_bookable_by(patient.id, now) {
            return Err(SlotError::slot_not_found());
        }
        self.doctors.assert_is_doctor_active(slot.doctor_id).await?;

        let until = now + self.settings.hold;
        let held = self.store
            .reserve(slot_id, patient.id, until, now)
            .await?
            .ok_or_else(SlotError::slot_not_found)?;

        info!("Patient {} holds slot {} until {}", patient.id, slot_id, until);
        Ok(SlotView::from_slot(held, now).for_patient())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn release_reservation(&self, user: &User, slot_id: Uuid) -> Result<SlotView, SlotError> {
        let patient = self.patients.assert_is_patient(user.id).await?;
        let now = self.clock.now();

        let slot = self.find_slot(slot_id).await?;
        if slot.reserved_by != Some(patient.id) {
            return Err(SlotError::Forbidden("Slot is not held by you".to_string()));
        }

        let released = self.store
            .release(slot_id, patient.id, now)
            .await?
            .ok_or_else(SlotError::slot_not_found)?;

        info!("Patient {} released slot {}", patient.id, slot_id);
        Ok(SlotView::from_slot(released, now).for_patient())
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn find_slot(&self, slot_id: Uuid) -> Result<Slot, SlotError> {
        self.store.find(slot_id).await?.ok_or_else(SlotError::slot_not_found)
    }

    /// New times must be valid on their own and clear of the doctor's
    /// other slots.
    async fn check_doctor_reschedule(&self, slot: &Slot, changes: &SlotChanges, now: DateTime<Utc>) -> Result<(), SlotError> {
        reject_booked_reschedule(slot)?;

        let start = changes.start_time.unwrap_or(slot.start_time);
        let end = changes.end_time.unwrap_or(slot.end_time);
        validate_times(0, start, end, now)?;

        let conflict = self.store
            .list(&SlotFilter {
                doctor_id: Some(slot.doctor_id),
                start_before: Some(end),
                end_after: Some(start),
                ..SlotFilter::default()
            })
            .await?
            .into_iter()
            .find(|other| other.id != slot.id);

        if let Some(conflict) = conflict {
            info!("Rescheduling slot {} would overlap {}", slot.id, conflict.id);
            return Err(SlotError::Overlap { conflicting_slot: Some(conflict.id) });
        }
        Ok(())
    }
}

fn reject_booked_reschedule(slot: &Slot) -> Result<(), SlotError> {
    if slot.is_booked() {
        return Err(SlotError::Conflict("Booked slot times cannot be changed".to_string()));
    }
    Ok(())
}

/// Error for a guarded write that matched no row.
fn lost_update(guard: UpdateGuard) -> SlotError {
    match guard {
        UpdateGuard::Unbooked => SlotError::Conflict("Slot was booked in the meantime".to_string()),
        UpdateGuard::BookedBy(_) => SlotError::Forbidden("Slot is no longer booked by you".to_string()),
        UpdateGuard::Any => SlotError::slot_not_found(),
    }
}
