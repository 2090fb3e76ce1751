//! 测量读数与测量记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::store::{keys, SharedStore};

use super::{ensure_patient, RecordError};

/// 一次手套读数
///
/// 压力（mmHg）、温度（°C）、肌电（µV），带采集时间戳。
/// 记录后不可变；聚合不依赖顺序
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub pressure: f64,
    pub temperature: f64,
    pub emg: f64,
}

impl Measurement {
    /// 以当前时间创建读数
    pub fn new(pressure: f64, temperature: f64, emg: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            pressure,
            temperature,
            emg,
        }
    }

    /// 返回第一个非有限数值的字段名
    pub fn non_finite_field(&self) -> Option<&'static str> {
        if !self.pressure.is_finite() {
            Some("pressure")
        } else if !self.temperature.is_finite() {
            Some("temperature")
        } else if !self.emg.is_finite() {
            Some("emg")
        } else {
            None
        }
    }
}

/// 存储的测量记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    #[serde(flatten)]
    pub reading: Measurement,
}

/// 测量记录服务
pub struct MeasurementService {
    store: SharedStore,
}

impl MeasurementService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 保存一条读数（手动录入或传感器采集）
    ///
    /// 含非有限数值的读数直接拒绝，避免 NaN 进入存储
    pub async fn record(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
        reading: Measurement,
    ) -> Result<MeasurementRecord, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        if let Some(field) = reading.non_finite_field() {
            return Err(RecordError::InvalidInput(format!(
                "non-finite {field} value in measurement"
            )));
        }

        let record = MeasurementRecord {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: ctx.doctor_id.clone(),
            reading,
        };

        self.store
            .set(
                &keys::measurement(patient_id, &record.id),
                &serde_json::to_value(&record)?,
            )
            .await?;

        tracing::debug!(
            "已保存测量: patient={} pressure={:.1} temperature={:.1} emg={:.1}",
            patient_id,
            reading.pressure,
            reading.temperature,
            reading.emg
        );

        Ok(record)
    }

    /// 批量保存读数（录制窗口落盘）
    pub async fn record_batch(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
        readings: Vec<Measurement>,
    ) -> Result<Vec<MeasurementRecord>, RecordError> {
        let mut records = Vec::with_capacity(readings.len());
        for reading in readings {
            records.push(self.record(ctx, patient_id, reading).await?);
        }
        Ok(records)
    }

    /// 列出患者的全部测量记录
    pub async fn list(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
    ) -> Result<Vec<MeasurementRecord>, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        let values = self
            .store
            .scan_prefix(&keys::measurement_prefix(patient_id))
            .await?;

        let records = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
