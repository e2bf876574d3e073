use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use auth_cell::{IdentityService, NewUser, UserRecord};
use shared_models::auth::UserRole;
use shared_utils::clock::Clock;

use crate::error::PatientError;
use crate::models::{Patient, PatientContact, PatientProfile, RegisterPatientRequest};
use crate::store::PatientStore;

fn profile(patient: &Patient, user: &UserRecord) -> PatientProfile {
    PatientProfile {
        id: patient.id,
        user_id: patient.user_id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone_number: user.phone_number.clone(),
        address: user.address.clone(),
        date_of_birth: user.date_of_birth,
        gender: user.gender.clone(),
        is_email_verified: user.is_email_verified,
        created_at: patient.created_at,
    }
}

pub struct PatientService {
    store: Arc<dyn PatientStore>,
    identity: Arc<IdentityService>,
    clock: Arc<dyn Clock>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>, identity: Arc<IdentityService>, clock: Arc<dyn Clock>) -> Self {
        Self { store, identity, clock }
    }

    /// Self-service sign-up: a PATIENT account plus its patient record. The
    /// verification token goes out once both exist.
    #[instrument(skip(self, request))]
    pub async fn register_patient(&self, request: RegisterPatientRequest) -> Result<PatientProfile, PatientError> {
        let user = self.identity
            .create_user(NewUser {
                email: request.email,
                password: request.password,
                first_name: request.first_name,
                last_name: request.last_name,
                phone_number: request.phone_number,
                address: request.address,
                date_of_birth: request.date_of_birth,
                gender: request.gender,
                role: UserRole::Patient,
            })
            .await?;

        let now = self.clock.now();
        let patient = Patient {
            id: Uuid::new_v4(),
            user_id: user.id,
            created_at: now,
            updated_at: now,
        };

        let patient = match self.store.insert(patient).await {
            Ok(patient) => patient,
            Err(e) => {
                error!("Failed to create patient record for user {}: {}", user.id, e);
                if let Err(cleanup) = self.identity.delete_user(user.id).await {
                    error!("Failed to remove orphaned user {}: {}", user.id, cleanup);
                }
                return Err(e);
            }
        };

        info!("Patient {} registered", patient.id);
        self.identity.send_verification(&user).await;
        Ok(profile(&patient, &user))
    }

    pub async fn current_patient(&self, user_id: Uuid) -> Result<PatientProfile, PatientError> {
        let patient = self.assert_is_patient(user_id).await?;
        let user = self.identity.find_user(user_id).await?;
        Ok(profile(&patient, &user))
    }

    /// The patient record owned by `user_id`, or `NotAPatient`.
    pub async fn assert_is_patient(&self, user_id: Uuid) -> Result<Patient, PatientError> {
        self.store.find_by_user_id(user_id).await?.ok_or_else(|| {
            debug!("User {} has no patient record", user_id);
            PatientError::NotAPatient
        })
    }

    pub async fn find_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        self.store.find_by_id(patient_id).await?.ok_or(PatientError::NotFound)
    }

    /// Contact details for each known patient id.
    pub async fn patient_contacts(&self, patient_ids: &[Uuid]) -> Result<HashMap<Uuid, PatientContact>, PatientError> {
        let patients = self.store.find_many(patient_ids).await?;
        let user_ids: Vec<Uuid> = patients.iter().map(|p| p.user_id).collect();
        let users: HashMap<Uuid, UserRecord> = self.identity
            .users_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(patients
            .iter()
            .filter_map(|p| {
                users.get(&p.user_id).map(|u| {
                    (p.id, PatientContact {
                        id: p.id,
                        first_name: u.first_name.clone(),
                        last_name: u.last_name.clone(),
                        email: u.email.clone(),
                        phone_number: u.phone_number.clone(),
                    })
                })
            })
            .collect())
    }
}
