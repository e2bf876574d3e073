use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use auth_cell::services::identity::log_undelivered;
use auth_cell::services::tokens::generate_password;
use auth_cell::{IdentityService, NewUser, Notifier, UserRecord};
use shared_models::auth::UserRole;
use shared_utils::clock::Clock;

use crate::error::DoctorError;
use crate::models::{CreateDoctorRequest, Doctor, DoctorProfile, DoctorSummary, UpdateDoctorRequest};
use crate::store::DoctorStore;

/// How long a newly invited doctor may use the password-setup link.
pub const INVITE_VALIDITY_HOURS: i64 = 24;

fn profile(doctor: &Doctor, user: &UserRecord) -> DoctorProfile {
    DoctorProfile {
        id: doctor.id,
        user_id: doctor.user_id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        specialization: doctor.specialization.clone(),
        active: doctor.active,
        created_at: doctor.created_at,
        updated_at: doctor.updated_at,
    }
}

fn summary(doctor: &Doctor, user: &UserRecord) -> DoctorSummary {
    DoctorSummary {
        id: doctor.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        specialization: doctor.specialization.clone(),
    }
}

fn normalize_specialization(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub struct DoctorService {
    store: Arc<dyn DoctorStore>,
    identity: Arc<IdentityService>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl DoctorService {
    pub fn new(
        store: Arc<dyn DoctorStore>,
        identity: Arc<IdentityService>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, identity, notifier, clock }
    }

    /// Creates a DOCTOR account with an unusable random password, then the
    /// inactive doctor record, then sends the doctor a password-setup token.
    /// The account is removed again if the doctor record cannot be written.
    #[instrument(skip(self, request))]
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<DoctorProfile, DoctorError> {
        let user = self.identity
            .create_user(NewUser {
                email: request.email,
                password: generate_password(),
                first_name: request.first_name,
                last_name: request.last_name,
                phone_number: request.phone_number,
                address: None,
                date_of_birth: None,
                gender: None,
                role: UserRole::Doctor,
            })
            .await?;

        let now = self.clock.now();
        let doctor = Doctor {
            id: Uuid::new_v4(),
            user_id: user.id,
            specialization: normalize_specialization(request.specialization),
            active: false,
            created_at: now,
            updated_at: now,
        };

        let doctor = match self.store.insert(doctor).await {
            Ok(doctor) => doctor,
            Err(e) => {
                error!("Failed to create doctor record for user {}: {}", user.id, e);
                if let Err(cleanup) = self.identity.delete_user(user.id).await {
                    error!("Failed to remove orphaned user {}: {}", user.id, cleanup);
                }
                return Err(e);
            }
        };

        let invite = self.identity
            .issue_password_reset(user.id, Duration::hours(INVITE_VALIDITY_HOURS))
            .await?;
        log_undelivered(user.id, "doctor invite", self.notifier.doctor_invite(&user, &invite).await);

        info!("Doctor {} created for user {}", doctor.id, user.id);
        Ok(profile(&doctor, &user))
    }

    #[instrument(skip(self))]
    pub async fn activate_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.set_active(doctor_id, true).await
    }

    #[instrument(skip(self))]
    pub async fn deactivate_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.set_active(doctor_id, false).await
    }

    async fn set_active(&self, doctor_id: Uuid, active: bool) -> Result<Doctor, DoctorError> {
        let doctor = self.store
            .set_active(doctor_id, active, self.clock.now())
            .await?
            .ok_or_else(|| {
                warn!("Doctor {} not found for activation change", doctor_id);
                DoctorError::NotFound
            })?;

        info!("Doctor {} active={}", doctor.id, doctor.active);
        Ok(doctor)
    }

    #[instrument(skip(self, request))]
    pub async fn update_doctor(&self, doctor_id: Uuid, request: UpdateDoctorRequest) -> Result<Doctor, DoctorError> {
        self.store
            .set_specialization(doctor_id, normalize_specialization(request.specialization), self.clock.now())
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// Every doctor with identity details, ordered by last then first name.
    pub async fn list_doctors(&self) -> Result<Vec<DoctorProfile>, DoctorError> {
        let doctors = self.store.list(false).await?;
        let users = self.users_for(&doctors).await?;

        let mut profiles: Vec<DoctorProfile> = doctors
            .iter()
            .filter_map(|d| users.get(&d.user_id).map(|u| profile(d, u)))
            .collect();
        profiles.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(profiles)
    }

    pub async fn list_active_doctors(&self) -> Result<Vec<DoctorSummary>, DoctorError> {
        let doctors = self.store.list(true).await?;
        let users = self.users_for(&doctors).await?;

        let mut summaries: Vec<DoctorSummary> = doctors
            .iter()
            .filter_map(|d| users.get(&d.user_id).map(|u| summary(d, u)))
            .collect();
        summaries.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(summaries)
    }

    pub async fn current_doctor(&self, user_id: Uuid) -> Result<DoctorProfile, DoctorError> {
        let doctor = self.assert_is_doctor(user_id).await?;
        let user = self.identity.find_user(user_id).await?;
        Ok(profile(&doctor, &user))
    }

    pub async fn find_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store.find_by_id(doctor_id).await?.ok_or(DoctorError::NotFound)
    }

    /// The doctor record owned by `user_id`, or `NotADoctor`.
    pub async fn assert_is_doctor(&self, user_id: Uuid) -> Result<Doctor, DoctorError> {
        self.store.find_by_user_id(user_id).await?.ok_or_else(|| {
            debug!("User {} has no doctor record", user_id);
            DoctorError::NotADoctor
        })
    }

    pub async fn assert_is_doctor_active(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let doctor = self.find_doctor(doctor_id).await?;
        if !doctor.active {
            return Err(DoctorError::Inactive);
        }
        Ok(doctor)
    }

    /// Public details for each known doctor id.
    pub async fn doctor_summaries(&self, doctor_ids: &[Uuid]) -> Result<HashMap<Uuid, DoctorSummary>, DoctorError> {
        let doctors = self.store.find_many(doctor_ids).await?;
        let users = self.users_for(&doctors).await?;

        Ok(doctors
            .iter()
            .filter_map(|d| users.get(&d.user_id).map(|u| (d.id, summary(d, u))))
            .collect())
    }

    async fn users_for(&self, doctors: &[Doctor]) -> Result<HashMap<Uuid, UserRecord>, DoctorError> {
        let user_ids: Vec<Uuid> = doctors.iter().map(|d| d.user_id).collect();
        Ok(self.identity
            .users_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}
