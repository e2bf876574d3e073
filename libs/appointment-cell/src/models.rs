// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use doctor_cell::DoctorSummary;
use patient_cell::PatientContact;
use shared_models::auth::UserRole;

// ==============================================================================
// CORE SLOT MODEL
// ==============================================================================

/// Row of the `appointment_slots` table. A slot with a patient is an
/// appointment; status is never stored, see [`derive_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub booked_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub patient_notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub video_call: Option<Value>,
    pub reserved_by: Option<Uuid>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(doctor_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id: None,
            start_time,
            end_time,
            booked_at: None,
            reason: None,
            patient_notes: None,
            doctor_notes: None,
            video_call: None,
            reserved_by: None,
            reserved_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> SlotStatus {
        derive_status(self, now)
    }

    pub fn is_booked(&self) -> bool {
        self.patient_id.is_some()
    }

    /// Half-open intersection with `[start, end)`; touching ends do not count.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn has_active_hold(&self, now: DateTime<Utc>) -> bool {
        self.reserved_until.is_some_and(|until| until > now)
    }

    /// True when someone other than `patient_id` holds the slot right now.
    pub fn is_held_by_other(&self, patient_id: Uuid, now: DateTime<Utc>) -> bool {
        self.has_active_hold(now) && self.reserved_by != Some(patient_id)
    }

    /// Unbooked, not started and not held by another patient.
    pub fn is_bookable_by(&self, patient_id: Uuid, now: DateTime<Utc>) -> bool {
        !self.is_booked() && self.start_time > now && !self.is_held_by_other(patient_id, now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    Reserved,
    Booked,
    Completed,
    Expired,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "AVAILABLE"),
            SlotStatus::Reserved => write!(f, "RESERVED"),
            SlotStatus::Booked => write!(f, "BOOKED"),
            SlotStatus::Completed => write!(f, "COMPLETED"),
            SlotStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Status of `slot` at `now`. First matching rule wins.
pub fn derive_status(slot: &Slot, now: DateTime<Utc>) -> SlotStatus {
    let booked = slot.booked_at.is_some();

    if booked && slot.end_time <= now {
        SlotStatus::Completed
    } else if booked {
        SlotStatus::Booked
    } else if slot.start_time <= now {
        SlotStatus::Expired
    } else if slot.has_active_hold(now) {
        SlotStatus::Reserved
    } else {
        SlotStatus::Available
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// A slot as returned to its owner, its patient or an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub booked_at: Option<DateTime<Utc>>,
    pub status: SlotStatus,
    pub reason: Option<String>,
    pub patient_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor_notes: Option<String>,
    pub video_call: Option<Value>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SlotView {
    pub fn from_slot(slot: Slot, now: DateTime<Utc>) -> Self {
        let status = derive_status(&slot, now);
        Self {
            id: slot.id,
            doctor_id: slot.doctor_id,
            patient_id: slot.patient_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            booked_at: slot.booked_at,
            status,
            reason: slot.reason,
            patient_notes: slot.patient_notes,
            doctor_notes: slot.doctor_notes,
            video_call: slot.video_call,
            reserved_until: slot.reserved_until,
            created_at: slot.created_at,
            updated_at: slot.updated_at,
        }
    }

    /// Same view with the doctor's private notes removed.
    pub fn for_patient(mut self) -> Self {
        self.doctor_notes = None;
        self
    }
}

/// Public shape of an open slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Slot> for AvailableSlot {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id,
            doctor_id: slot.doctor_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorSlotView {
    #[serde(flatten)]
    pub slot: SlotView,
    pub patient: Option<PatientContact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSlotView {
    #[serde(flatten)]
    pub slot: SlotView,
    pub doctor: Option<DoctorSummary>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Tells an explicit `null` (`Some(None)`, clear the column) from an absent
/// field (`None`, keep it). Pair with `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotCandidate {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSlotsRequest {
    pub slots: Vec<SlotCandidate>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeQuery {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AvailableQuery {
    pub doctor_id: Uuid,
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

/// Fields the owning doctor may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoctorSlotUpdate {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub doctor_notes: Option<Option<String>>,
}

/// Fields the booking patient may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientSlotUpdate {
    #[serde(default, deserialize_with = "nullable")]
    pub reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub patient_notes: Option<Option<String>>,
}

/// Fields an admin may change. The booking itself is not among them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSlotUpdate {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub patient_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub doctor_notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub video_call: Option<Option<Value>>,
}

#[derive(Debug, Clone)]
pub enum SlotUpdate {
    Doctor(DoctorSlotUpdate),
    Patient(PatientSlotUpdate),
    Admin(AdminSlotUpdate),
}

impl SlotUpdate {
    /// Parses a PATCH body with the field whitelist of `role`.
    pub fn from_json(role: UserRole, body: Value) -> Result<Self, serde_json::Error> {
        Ok(match role {
            UserRole::Doctor => SlotUpdate::Doctor(serde_json::from_value(body)?),
            UserRole::Patient => SlotUpdate::Patient(serde_json::from_value(body)?),
            UserRole::Admin => SlotUpdate::Admin(serde_json::from_value(body)?),
        })
    }

    pub fn role(&self) -> UserRole {
        match self {
            SlotUpdate::Doctor(_) => UserRole::Doctor,
            SlotUpdate::Patient(_) => UserRole::Patient,
            SlotUpdate::Admin(_) => UserRole::Admin,
        }
    }
}

// ==============================================================================
// STORE INPUTS
// ==============================================================================

/// Column changes applied by [`crate::store::SlotStore::update`]. `None`
/// leaves a column as it is; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotChanges {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub reason: Option<Option<String>>,
    pub patient_notes: Option<Option<String>>,
    pub doctor_notes: Option<Option<String>>,
    pub video_call: Option<Option<Value>>,
}

impl SlotChanges {
    pub fn changes_times(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == SlotChanges::default()
    }

    pub fn apply(&self, slot: &mut Slot, now: DateTime<Utc>) {
        if let Some(start_time) = self.start_time {
            slot.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            slot.end_time = end_time;
        }
        if let Some(reason) = &self.reason {
            slot.reason = reason.clone();
        }
        if let Some(notes) = &self.patient_notes {
            slot.patient_notes = notes.clone();
        }
        if let Some(notes) = &self.doctor_notes {
            slot.doctor_notes = notes.clone();
        }
        if let Some(video_call) = &self.video_call {
            slot.video_call = video_call.clone();
        }
        slot.updated_at = now;
    }
}

impl From<DoctorSlotUpdate> for SlotChanges {
    fn from(update: DoctorSlotUpdate) -> Self {
        Self {
            start_time: update.start_time,
            end_time: update.end_time,
            doctor_notes: update.doctor_notes,
            ..Self::default()
        }
    }
}

impl From<PatientSlotUpdate> for SlotChanges {
    fn from(update: PatientSlotUpdate) -> Self {
        Self {
            reason: update.reason,
            patient_notes: update.patient_notes,
            ..Self::default()
        }
    }
}

impl From<AdminSlotUpdate> for SlotChanges {
    fn from(update: AdminSlotUpdate) -> Self {
        Self {
            start_time: update.start_time,
            end_time: update.end_time,
            reason: update.reason,
            patient_notes: update.patient_notes,
            doctor_notes: update.doctor_notes,
            video_call: update.video_call,
        }
    }
}

/// Row condition an update must still satisfy when it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateGuard {
    Unbooked,
    BookedBy(Uuid),
    Any,
}

/// Predicate for [`crate::store::SlotStore::list`]. Unset fields match
/// every slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub unbooked_only: bool,
    pub start_from: Option<DateTime<Utc>>,
    pub start_before: Option<DateTime<Utc>>,
    pub end_after: Option<DateTime<Utc>>,
    pub end_until: Option<DateTime<Utc>>,
}

impl SlotFilter {
    pub fn matches(&self, slot: &Slot) -> bool {
        self.doctor_id.is_none_or(|id| slot.doctor_id == id)
            && self.patient_id.is_none_or(|id| slot.patient_id == Some(id))
            && (!self.unbooked_only || slot.patient_id.is_none())
            && self.start_from.is_none_or(|t| slot.start_time >= t)
            && self.start_before.is_none_or(|t| slot.start_time < t)
            && self.end_after.is_none_or(|t| slot.end_time > t)
            && self.end_until.is_none_or(|t| slot.end_time <= t)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Booked(Slot),
    /// Slot gone, booked, started or held by another patient.
    Unavailable,
    AlreadyHasAppointment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn slot_at(start: DateTime<Utc>, minutes: i64) -> Slot {
        Slot::new(Uuid::new_v4(), start, start + Duration::minutes(minutes), start - Duration::days(1))
    }

    #[test]
    fn status_precedence() {
        let now = Utc::now();
        let mut slot = slot_at(now + Duration::hours(1), 30);
        assert_eq!(derive_status(&slot, now), SlotStatus::Available);

        slot.reserved_by = Some(Uuid::new_v4());
        slot.reserved_until = Some(now + Duration::minutes(10));
        assert_eq!(derive_status(&slot, now), SlotStatus::Reserved);
        assert_eq!(derive_status(&slot, now + Duration::minutes(10)), SlotStatus::Available);

        slot.patient_id = Some(Uuid::new_v4());
        slot.booked_at = Some(now);
        assert_eq!(derive_status(&slot, now), SlotStatus::Booked);
        assert_eq!(derive_status(&slot, slot.end_time), SlotStatus::Completed);
    }

    #[test]
    fn unbooked_slot_expires_at_its_start() {
        let now = Utc::now();
        let slot = slot_at(now + Duration::minutes(5), 30);

        assert_eq!(slot.status(now), SlotStatus::Available);
        assert_eq!(slot.status(now), slot.status(now));
        assert_eq!(slot.status(slot.start_time), SlotStatus::Expired);
        assert_eq!(slot.status(slot.end_time + Duration::days(1)), SlotStatus::Expired);
    }

    #[test]
    fn expired_wins_over_hold() {
        let now = Utc::now();
        let mut slot = slot_at(now - Duration::minutes(1), 30);
        slot.reserved_until = Some(now + Duration::minutes(5));
        assert_eq!(slot.status(now), SlotStatus::Expired);
    }

    #[test]
    fn update_dto_is_chosen_by_role() {
        let body = serde_json::json!({ "reason": "check-up" });
        assert!(matches!(SlotUpdate::from_json(UserRole::Patient, body.clone()), Ok(SlotUpdate::Patient(_))));
        assert!(SlotUpdate::from_json(UserRole::Doctor, body).is_err());

        let video = serde_json::json!({ "video_call": { "url": "https://meet.example/abc" } });
        assert!(SlotUpdate::from_json(UserRole::Admin, video.clone()).is_ok());
        assert!(SlotUpdate::from_json(UserRole::Doctor, video).is_err());
    }

    #[test]
    fn null_clears_and_absence_keeps() {
        let update: AdminSlotUpdate =
            serde_json::from_value(serde_json::json!({ "doctor_notes": null, "reason": "check-up" })).unwrap();
        let changes = SlotChanges::from(update);

        assert_eq!(changes.doctor_notes, Some(None));
        assert_eq!(changes.reason, Some(Some("check-up".to_string())));
        assert_eq!(changes.patient_notes, None);
        assert_eq!(changes.video_call, None);

        let mut slot = slot_at(Utc::now(), 30);
        slot.doctor_notes = Some("old".to_string());
        slot.patient_notes = Some("kept".to_string());
        changes.apply(&mut slot, Utc::now());
        assert_eq!(slot.doctor_notes, None);
        assert_eq!(slot.patient_notes.as_deref(), Some("kept"));
    }

    #[test]
    fn filter_matches_half_open_window() {
        let now = Utc::now();
        let slot = slot_at(now, 30);
        let filter = SlotFilter {
            doctor_id: Some(slot.doctor_id),
            start_from: Some(now),
            start_before: Some(now + Duration::minutes(1)),
            ..SlotFilter::default()
        };
        assert!(filter.matches(&slot));

        let excluded = SlotFilter { start_before: Some(now), ..filter };
        assert!(!excluded.matches(&slot));
    }
}
