use std::sync::Arc;

use tracing::info;

use appointment_cell::{MemorySlotStore, SlotService, SlotSettings, SlotStore, SupabaseSlotStore};
use auth_cell::{IdentityService, MemoryUserStore, Notifier, SupabaseUserStore, UserStore};
use doctor_cell::{DoctorService, DoctorStore, MemoryDoctorStore, SupabaseDoctorStore};
use patient_cell::{MemoryPatientStore, PatientService, PatientStore, SupabasePatientStore};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_utils::clock::Clock;

/// Every cell service, wired against one storage backend, one clock and one
/// notifier.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<IdentityService>,
    pub doctors: Arc<DoctorService>,
    pub patients: Arc<PatientService>,
    pub slots: Arc<SlotService>,
}

struct Stores {
    users: Arc<dyn UserStore>,
    doctors: Arc<dyn DoctorStore>,
    patients: Arc<dyn PatientStore>,
    slots: Arc<dyn SlotStore>,
}

fn stores_for(config: &AppConfig) -> Stores {
    match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Stores {
                users: Arc::new(MemoryUserStore::new()),
                doctors: Arc::new(MemoryDoctorStore::new()),
                patients: Arc::new(MemoryPatientStore::new()),
                slots: Arc::new(MemorySlotStore::new()),
            }
        }
        StorageBackend::Supabase => {
            info!("Using Supabase storage at {}", config.supabase_url);
            Stores {
                users: Arc::new(SupabaseUserStore::new(SupabaseClient::new(config))),
                doctors: Arc::new(SupabaseDoctorStore::new(SupabaseClient::new(config))),
                patients: Arc::new(SupabasePatientStore::new(SupabaseClient::new(config))),
                slots: Arc::new(SupabaseSlotStore::new(SupabaseClient::new(config))),
            }
        }
    }
}

impl Services {
    pub fn build(config: &AppConfig, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        let stores = stores_for(config);

        let identity = Arc::new(IdentityService::new(config, stores.users, clock.clone(), notifier.clone()));
        let doctors = Arc::new(DoctorService::new(stores.doctors, identity.clone(), notifier, clock.clone()));
        let patients = Arc::new(PatientService::new(stores.patients, identity.clone(), clock.clone()));
        let slots = Arc::new(SlotService::new(
            stores.slots,
            doctors.clone(),
            patients.clone(),
            clock,
            SlotSettings::from_config(config),
        ));

        Self { identity, doctors, patients, slots }
    }
}
