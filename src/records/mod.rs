//! 医疗记录模块
//!
//! 患者、测量、处方、警报、设置、档案的模型与服务。
//! 所有服务操作都接收显式的 [`RequestContext`](crate::auth::RequestContext)

pub mod alert;
pub mod measurement;
pub mod patient;
pub mod prescription;
pub mod profile;
pub mod settings;

pub use alert::{Alert, AlertService, AlertSeverity, NewAlert};
pub use measurement::{Measurement, MeasurementRecord, MeasurementService};
pub use patient::{NewPatient, Patient, PatientService, PatientUpdate};
pub use prescription::{Medication, NewPrescription, Prescription, PrescriptionService};
pub use profile::{DoctorProfile, ProfileService};
pub use settings::{AlertThresholds, DoctorSettings, SettingsService};

use crate::auth::RequestContext;
use crate::store::{keys, KvStore};

/// 记录层错误类型
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// 校验患者归属
///
/// 患者必须存在于当前医生名下，否则视为不存在。
/// 测量、处方、分析等从属记录的操作前都先经过这里
pub(crate) async fn ensure_patient(
    store: &dyn KvStore,
    ctx: &RequestContext,
    patient_id: &str,
) -> Result<Patient, RecordError> {
    let value = store.get(&keys::patient(&ctx.doctor_id, patient_id)).await?;

    match value {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err(RecordError::NotFound {
            kind: "patient",
            id: patient_id.to_string(),
        }),
    }
}
