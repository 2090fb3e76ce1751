//! 警报记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::store::{keys, SharedStore};

use super::RecordError;

/// 警报严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

/// 警报记录
///
/// 归属医生；可关联某个患者。创建后唯一可变的字段是 read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub doctor_id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// 新建警报请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
}

/// 警报服务
pub struct AlertService {
    store: SharedStore,
}

impl AlertService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 创建警报，初始为未读
    pub async fn create(
        &self,
        ctx: &RequestContext,
        new_alert: NewAlert,
    ) -> Result<Alert, RecordError> {
        let alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            doctor_id: ctx.doctor_id.clone(),
            severity: new_alert.severity,
            title: new_alert.title,
            message: new_alert.message,
            patient_id: new_alert.patient_id,
            patient_name: new_alert.patient_name,
            created_at: Utc::now(),
            read: false,
        };

        self.store
            .set(
                &keys::alert(&ctx.doctor_id, &alert.id),
                &serde_json::to_value(&alert)?,
            )
            .await?;

        tracing::info!("已创建警报: [{:?}] {}", alert.severity, alert.title);

        Ok(alert)
    }

    /// 列出当前医生的警报，新的在前
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Alert>, RecordError> {
        let values = self
            .store
            .scan_prefix(&keys::alert_prefix(&ctx.doctor_id))
            .await?;

        let mut alerts = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Alert>, _>>()?;

        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(alerts)
    }

    /// 将警报标记为已读（幂等）
    pub async fn mark_read(
        &self,
        ctx: &RequestContext,
        alert_id: &str,
    ) -> Result<Alert, RecordError> {
        let key = keys::alert(&ctx.doctor_id, alert_id);

        let value = self.store.get(&key).await?.ok_or(RecordError::NotFound {
            kind: "alert",
            id: alert_id.to_string(),
        })?;

        let mut alert: Alert = serde_json::from_value(value)?;
        alert.read = true;

        self.store.set(&key, &serde_json::to_value(&alert)?).await?;

        Ok(alert)
    }
}
