//! 医生偏好设置

use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::glove::ConnectionMode;
use crate::store::{keys, SharedStore};

use super::RecordError;

/// 界面展示用的警报阈值
///
/// 仅作为数据提供给客户端显示；风险分级使用自己的固定规则常量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub pressure: f64,
    pub temperature: f64,
    pub emg: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pressure: 50.0,
            temperature: 30.0,
            emg: 20.0,
        }
    }
}

/// 医生偏好设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSettings {
    pub theme: String,
    pub glove_connection_mode: ConnectionMode,
    pub measurement_frequency_ms: u64,
    pub alert_thresholds: AlertThresholds,
}

impl Default for DoctorSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            glove_connection_mode: ConnectionMode::Bluetooth,
            measurement_frequency_ms: 1000,
            alert_thresholds: AlertThresholds::default(),
        }
    }
}

/// 设置服务
pub struct SettingsService {
    store: SharedStore,
}

impl SettingsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 读取设置，未保存过时返回默认值
    pub async fn get(&self, ctx: &RequestContext) -> Result<DoctorSettings, RecordError> {
        let value = self.store.get(&keys::settings(&ctx.doctor_id)).await?;

        match value {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(DoctorSettings::default()),
        }
    }

    /// 保存设置
    pub async fn put(
        &self,
        ctx: &RequestContext,
        settings: DoctorSettings,
    ) -> Result<(), RecordError> {
        self.store
            .set(
                &keys::settings(&ctx.doctor_id),
                &serde_json::to_value(&settings)?,
            )
            .await?;

        Ok(())
    }
}
