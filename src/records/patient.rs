//! 患者档案与患者服务

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::store::{keys, SharedStore};

use super::{ensure_patient, RecordError};

/// 患者档案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub doctor_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub medical_history: String,
    pub diagnosis: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// 患者全名
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 新建患者请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub medical_history: String,
    pub diagnosis: String,
}

/// 患者信息更新（仅覆盖给出的字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub medical_history: Option<String>,
    pub diagnosis: Option<String>,
}

/// 患者服务
pub struct PatientService {
    store: SharedStore,
}

impl PatientService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 创建患者
    pub async fn create(
        &self,
        ctx: &RequestContext,
        new_patient: NewPatient,
    ) -> Result<Patient, RecordError> {
        if new_patient.first_name.trim().is_empty() && new_patient.last_name.trim().is_empty() {
            return Err(RecordError::InvalidInput(
                "patient requires a name".to_string(),
            ));
        }

        let now = Utc::now();
        let patient = Patient {
            id: uuid::Uuid::new_v4().to_string(),
            doctor_id: ctx.doctor_id.clone(),
            first_name: new_patient.first_name,
            last_name: new_patient.last_name,
            date_of_birth: new_patient.date_of_birth,
            phone: new_patient.phone,
            email: new_patient.email,
            medical_history: new_patient.medical_history,
            diagnosis: new_patient.diagnosis,
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(
                &keys::patient(&ctx.doctor_id, &patient.id),
                &serde_json::to_value(&patient)?,
            )
            .await?;

        tracing::info!("已创建患者: {} ({})", patient.full_name(), patient.id);

        Ok(patient)
    }

    /// 列出当前医生的全部患者
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Patient>, RecordError> {
        let values = self
            .store
            .scan_prefix(&keys::patient_prefix(&ctx.doctor_id))
            .await?;

        let patients = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    /// 获取单个患者
    pub async fn get(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
    ) -> Result<Patient, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await
    }

    /// 更新患者信息，刷新 updated_at
    pub async fn update(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
        update: PatientUpdate,
    ) -> Result<Patient, RecordError> {
        let mut patient = ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        if let Some(first_name) = update.first_name {
            patient.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            patient.last_name = last_name;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            patient.date_of_birth = date_of_birth;
        }
        if let Some(phone) = update.phone {
            patient.phone = phone;
        }
        if let Some(email) = update.email {
            patient.email = email;
        }
        if let Some(medical_history) = update.medical_history {
            patient.medical_history = medical_history;
        }
        if let Some(diagnosis) = update.diagnosis {
            patient.diagnosis = diagnosis;
        }
        patient.updated_at = Utc::now();

        self.store
            .set(
                &keys::patient(&ctx.doctor_id, patient_id),
                &serde_json::to_value(&patient)?,
            )
            .await?;

        Ok(patient)
    }

    /// 删除患者
    pub async fn delete(&self, ctx: &RequestContext, patient_id: &str) -> Result<(), RecordError> {
        let deleted = self
            .store
            .delete(&keys::patient(&ctx.doctor_id, patient_id))
            .await?;

        if !deleted {
            return Err(RecordError::NotFound {
                kind: "patient",
                id: patient_id.to_string(),
            });
        }

        tracing::info!("已删除患者: {}", patient_id);
        Ok(())
    }
}
