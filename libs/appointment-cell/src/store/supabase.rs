use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::encode_timestamp;
use shared_database::{DatabaseError, SupabaseClient};

use crate::error::{SlotError, SlotValidationError};
use crate::models::{BookingOutcome, Slot, SlotChanges, SlotFilter, UpdateGuard};

use super::SlotStore;

const SLOTS: &str = "/rest/v1/appointment_slots";
const BOOK_FUNCTION: &str = "book_appointment_slot";
const RESERVE_FUNCTION: &str = "reserve_appointment_slot";

/// Raised by `book_appointment_slot` when the patient already has an
/// upcoming appointment with the doctor.
const ALREADY_BOOKED_CODE: &str = "AP001";
/// Postgres SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

pub struct SupabaseSlotStore {
    supabase: SupabaseClient,
}

impl SupabaseSlotStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    /// Conditional PATCH. Zero matching rows means the condition failed.
    async fn patch_where(&self, conditions: &str, body: Value) -> Result<Option<Slot>, SlotError> {
        let path = format!("{}?{}", SLOTS, conditions);
        let result: Result<Vec<Slot>, DatabaseError> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(e) => Err(map_write_error(e)),
        }
    }
}

fn map_write_error(err: DatabaseError) -> SlotError {
    if err.is_exclusion_violation() {
        return SlotError::Overlap { conflicting_slot: None };
    }
    if err.code() == Some(CHECK_VIOLATION) {
        return SlotValidationError::EndNotAfterStart { index: 0 }.into();
    }
    err.into()
}

fn filter_query(filter: &SlotFilter) -> String {
    let mut params = Vec::new();

    if let Some(doctor_id) = filter.doctor_id {
        params.push(format!("doctor_id=eq.{}", doctor_id));
    }
    if let Some(patient_id) = filter.patient_id {
        params.push(format!("patient_id=eq.{}", patient_id));
    }
    if filter.unbooked_only {
        params.push("patient_id=is.null".to_string());
    }
    if let Some(t) = filter.start_from {
        params.push(format!("start_time=gte.{}", encode_timestamp(&t)));
    }
    if let Some(t) = filter.start_before {
        params.push(format!("start_time=lt.{}", encode_timestamp(&t)));
    }
    if let Some(t) = filter.end_after {
        params.push(format!("end_time=gt.{}", encode_timestamp(&t)));
    }
    if let Some(t) = filter.end_until {
        params.push(format!("end_time=lte.{}", encode_timestamp(&t)));
    }
    params.push("order=start_time.asc".to_string());

    params.join("&")
}

fn guard_condition(guard: UpdateGuard) -> Option<String> {
    match guard {
        UpdateGuard::Unbooked => Some("patient_id=is.null".to_string()),
        UpdateGuard::BookedBy(patient_id) => Some(format!("patient_id=eq.{}", patient_id)),
        UpdateGuard::Any => None,
    }
}

fn changes_body(changes: &SlotChanges, now: DateTime<Utc>) -> Value {
    let mut body = Map::new();
    if let Some(start_time) = changes.start_time {
        body.insert("start_time".into(), json!(start_time));
    }
    if let Some(end_time) = changes.end_time {
        body.insert("end_time".into(), json!(end_time));
    }
    if let Some(reason) = &changes.reason {
        body.insert("reason".into(), json!(reason));
    }
    if let Some(notes) = &changes.patient_notes {
        body.insert("patient_notes".into(), json!(notes));
    }
    if let Some(notes) = &changes.doctor_notes {
        body.insert("doctor_notes".into(), json!(notes));
    }
    if let Some(video_call) = &changes.video_call {
        body.insert("video_call".into(), json!(video_call));
    }
    body.insert("updated_at".into(), json!(now));
    Value::Object(body)
}

#[async_trait]
impl SlotStore for SupabaseSlotStore {
    async fn insert_batch(&self, slots: Vec<Slot>) -> Result<Vec<Slot>, SlotError> {
        debug!("Inserting {} slots", slots.len());

        let body = serde_json::to_value(&slots).map_err(DatabaseError::from)?;
        let result: Result<Vec<Slot>, DatabaseError> = self.supabase
            .request_with_headers(
                Method::POST,
                SLOTS,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await;

        match result {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_exclusion_violation() => {
                warn!("Slot batch rejected by overlap constraint");
                Err(SlotError::Overlap { conflicting_slot: None })
            }
            Err(e) => Err(map_write_error(e)),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Option<Slot>, SlotError> {
        let path = format!("{}?id=eq.{}", SLOTS, id);
        let rows: Vec<Slot> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, filter: &SlotFilter) -> Result<Vec<Slot>, SlotError> {
        let path = format!("{}?{}", SLOTS, filter_query(filter));
        Ok(self.supabase.request(Method::GET, &path, None).await?)
    }

    async fn book(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<BookingOutcome, SlotError> {
        let args = json!({
            "p_slot_id": id,
            "p_patient_id": patient_id,
            "p_now": now,
        });

        let result: Result<Vec<Slot>, DatabaseError> = self.supabase.rpc(BOOK_FUNCTION, args).await;

        match result {
            Ok(rows) => Ok(rows
                .into_iter()
                .next()
                .map(BookingOutcome::Booked)
                .unwrap_or(BookingOutcome::Unavailable)),
            Err(e) if e.code() == Some(ALREADY_BOOKED_CODE) => Ok(BookingOutcome::AlreadyHasAppointment),
            Err(e) => Err(e.into()),
        }
    }

    async fn cancel(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError> {
        let conditions = format!("id=eq.{}&patient_id=eq.{}", id, patient_id);
        let body = json!({
            "patient_id": null,
            "booked_at": null,
            "reason": null,
            "patient_notes": null,
            "updated_at": now,
        });
        self.patch_where(&conditions, body).await
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &SlotChanges,
        guard: UpdateGuard,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError> {
        let mut conditions = format!("id=eq.{}", id);
        if let Some(condition) = guard_condition(guard) {
            conditions.push('&');
            conditions.push_str(&condition);
        }
        self.patch_where(&conditions, changes_body(changes, now)).await
    }

    async fn delete_unbooked(&self, id: Uuid) -> Result<bool, SlotError> {
        let path = format!("{}?id=eq.{}&patient_id=is.null", SLOTS, id);
        let rows: Vec<Slot> = self.supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn reserve(
        &self,
        id: Uuid,
        patient_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Slot>, SlotError> {
        let args = json!({
            "p_slot_id": id,
            "p_patient_id": patient_id,
            "p_until": until,
            "p_now": now,
        });

        let rows: Vec<Slot> = self.supabase.rpc(RESERVE_FUNCTION, args).await?;
        Ok(rows.into_iter().next())
    }

    async fn release(&self, id: Uuid, patient_id: Uuid, now: DateTime<Utc>) -> Result<Option<Slot>, SlotError> {
        let conditions = format!("id=eq.{}&reserved_by=eq.{}", id, patient_id);
        let body = json!({
            "reserved_by": null,
            "reserved_until": null,
            "updated_at": now,
        });
        self.patch_where(&conditions, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filter_becomes_postgrest_query() {
        let doctor = Uuid::nil();
        let from = Utc.with_ymd_and_hms(2025, 5, 28, 10, 0, 0).unwrap();
        let filter = SlotFilter {
            doctor_id: Some(doctor),
            unbooked_only: true,
            start_from: Some(from),
            ..SlotFilter::default()
        };

        assert_eq!(
            filter_query(&filter),
            format!(
                "doctor_id=eq.{}&patient_id=is.null&start_time=gte.2025-05-28T10%3A00%3A00.000000Z&order=start_time.asc",
                doctor
            )
        );
    }

    #[test]
    fn update_body_only_carries_set_fields() {
        let now = Utc.with_ymd_and_hms(2025, 5, 27, 9, 0, 0).unwrap();
        let body = changes_body(&SlotChanges { doctor_notes: Some(Some("bring labs".into())), ..SlotChanges::default() }, now);

        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["doctor_notes"], "bring labs");
        assert!(fields.contains_key("updated_at"));
    }

    #[test]
    fn cleared_fields_are_sent_as_null() {
        let now = Utc.with_ymd_and_hms(2025, 5, 27, 9, 0, 0).unwrap();
        let changes = SlotChanges { patient_notes: Some(None), video_call: Some(None), ..SlotChanges::default() };
        let body = changes_body(&changes, now);

        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["patient_notes"], Value::Null);
        assert_eq!(fields["video_call"], Value::Null);
    }
}
