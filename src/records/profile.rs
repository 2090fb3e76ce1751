//! 医生档案

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::store::{keys, SharedStore};

use super::RecordError;

/// 医生档案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub specialty: String,
    pub created_at: DateTime<Utc>,
}

/// 档案服务
pub struct ProfileService {
    store: SharedStore,
}

impl ProfileService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 注册当前身份对应的档案
    pub async fn register(&self, ctx: &RequestContext) -> Result<DoctorProfile, RecordError> {
        let profile = DoctorProfile {
            id: ctx.doctor_id.clone(),
            email: ctx.email.clone(),
            name: ctx.name.clone(),
            specialty: ctx.specialty.clone(),
            created_at: Utc::now(),
        };

        self.store
            .set(
                &keys::profile(&ctx.doctor_id),
                &serde_json::to_value(&profile)?,
            )
            .await?;

        tracing::info!("已注册医生档案: {} ({})", profile.name, profile.id);

        Ok(profile)
    }

    /// 读取档案
    pub async fn get(&self, doctor_id: &str) -> Result<Option<DoctorProfile>, RecordError> {
        let value = self.store.get(&keys::profile(doctor_id)).await?;

        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
