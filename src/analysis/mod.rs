//! 风险分析模块
//!
//! 聚合 + 分级的纯函数核心，以及把分级结果落盘、联动警报的服务层

pub mod aggregator;
pub mod classifier;

pub use aggregator::{aggregate, AggregateMetrics};
pub use classifier::{classify, classify_metrics, Classification, RiskLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RequestContext;
use crate::records::{
    ensure_patient, AlertService, AlertSeverity, MeasurementRecord, NewAlert, RecordError,
};
use crate::store::{keys, SharedStore};

/// 分析错误类型
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("invalid input: measurements must be non-empty")]
    EmptyMeasurements,

    #[error("invalid input: non-finite {field} value in measurement")]
    NonFiniteField { field: &'static str },

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// 持久化的分析结果
///
/// 每次分级调用生成一条，创建后不可变；同一患者的新分析只会追加，
/// 不会修改旧记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub risk: RiskLevel,
    pub diagnosis: String,
    pub confidence: f64,
    pub metrics: AggregateMetrics,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// 分析服务
pub struct AnalysisService {
    store: SharedStore,
    alerts: AlertService,
}

impl AnalysisService {
    pub fn new(store: SharedStore) -> Self {
        let alerts = AlertService::new(store.clone());
        Self { store, alerts }
    }

    /// 对患者当前的全部测量执行一次风险分析
    ///
    /// 分级结果落盘后，非低风险会为当前医生生成一条警报
    pub async fn run_analysis(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let patient = ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        let values = self
            .store
            .scan_prefix(&keys::measurement_prefix(patient_id))
            .await
            .map_err(RecordError::from)?;

        let records: Vec<MeasurementRecord> = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(RecordError::from)?;

        let readings: Vec<_> = records.iter().map(|record| record.reading).collect();

        let classification = classifier::classify(&readings)?;

        let result = AnalysisResult {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: ctx.doctor_id.clone(),
            risk: classification.risk,
            diagnosis: classification.diagnosis,
            confidence: classification.confidence,
            metrics: classification.metrics,
            recommendations: classification.recommendations,
            created_at: Utc::now(),
        };

        self.store
            .set(
                &keys::analysis(patient_id, &result.id),
                &serde_json::to_value(&result).map_err(RecordError::from)?,
            )
            .await
            .map_err(RecordError::from)?;

        tracing::info!(
            "分析完成: patient={} risk={} confidence={:.2} samples={}",
            patient_id,
            result.risk,
            result.confidence,
            readings.len()
        );

        // 非低风险生成警报，交由医生复核
        let severity = match result.risk {
            RiskLevel::High => Some(AlertSeverity::Error),
            RiskLevel::Moderate => Some(AlertSeverity::Warning),
            RiskLevel::Low => None,
        };

        if let Some(severity) = severity {
            let title = match result.risk {
                RiskLevel::High => "High neuropathy risk detected",
                _ => "Moderate neuropathy risk detected",
            };

            self.alerts
                .create(
                    ctx,
                    NewAlert {
                        severity,
                        title: title.to_string(),
                        message: format!(
                            "Analysis for {} classified risk as {} ({:.0}% confidence): {}",
                            patient.full_name(),
                            result.risk,
                            result.confidence * 100.0,
                            result.diagnosis
                        ),
                        patient_id: Some(patient.id.clone()),
                        patient_name: Some(patient.full_name()),
                    },
                )
                .await?;
        }

        Ok(result)
    }

    /// 列出患者的历史分析结果
    pub async fn list(
        &self,
        ctx: &RequestContext,
        patient_id: &str,
    ) -> Result<Vec<AnalysisResult>, RecordError> {
        ensure_patient(self.store.as_ref(), ctx, patient_id).await?;

        let values = self
            .store
            .scan_prefix(&keys::analysis_prefix(patient_id))
            .await?;

        let mut analyses = values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AnalysisResult>, _>>()?;

        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(analyses)
    }
}
