//! 处方记录
//!
//! 处方在这里只是结构化数据；排版成图片由外部渲染协作方完成

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::store::{keys, SharedStore};

use super::{ensure_patient, RecordError};

/// 一行用药
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

/// 处方记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub medications: Vec<Medication>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// 新建处方请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub medications: Vec<Medication>,
    pub notes: String,
}

/// 处方服务
pub struct PrescriptionService {
    store: SharedStore,
}

impl PrescriptionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 开具处方
    ///
    /// 未命名的用药行被丢弃；过滤后至少要剩一行
    pub async fn create(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
        new_prescription: NewPrescription,
    ) -> Result<Prescription, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        let medications: Vec<Medication> = new_prescription
            .medications
            .into_iter()
            .filter(|m| !m.name.trim().is_empty())
            .collect();

        if medications.is_empty() {
            return Err(RecordError::InvalidInput(
                "prescription requires at least one named medication".to_string(),
            ));
        }

        let prescription = Prescription {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: ctx.doctor_id.clone(),
            medications,
            notes: new_prescription.notes,
            created_at: Utc::now(),
        };

        self.store
            .set(
                &keys::prescription(patient_id, &prescription.id),
                &serde_json::to_value(&prescription)?,
            )
            .await?;

        tracing::info!(
            "已开具处方: patient={} medications={}",
            patient_id,
            prescription.medications.len()
        );

        Ok(prescription)
    }

    /// 列出患者的全部处方
    pub async fn list(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
    ) -> Result<Vec<Prescription>, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        let values = self
            .store
            .scan_prefix(&keys::prescription_prefix(patient_id))
            .await?;

        let prescriptions = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(prescriptions)
    }
}
