//! 风险分级
//!
//! 三路平均值上的有序阈值规则：自上而下求值，首条命中即生效。
//! 任一信号低于下限即升级风险档位（按单信号析取，不做加权评分），
//! 用于标记需要人工复核的病例

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::Measurement;

use super::aggregator::{aggregate, AggregateMetrics};
use super::AnalysisError;

/// 高风险下限：任一均值低于下限即判定高风险
const HIGH_PRESSURE_FLOOR: f64 = 50.0;
const HIGH_TEMPERATURE_FLOOR: f64 = 30.0;
const HIGH_EMG_FLOOR: f64 = 20.0;

/// 中风险下限
const MODERATE_PRESSURE_FLOOR: f64 = 70.0;
const MODERATE_TEMPERATURE_FLOOR: f64 = 32.0;
const MODERATE_EMG_FLOOR: f64 = 40.0;

/// 风险等级，按严重程度排序
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次分级的输出
///
/// 置信度是规则绑定的固定标签，不是根据样本量或方差计算的统计量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub risk: RiskLevel,
    pub diagnosis: String,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub metrics: AggregateMetrics,
}

/// 对平均指标分级
///
/// 阈值比较为严格小于：均值恰好等于下限不触发该档规则
pub fn classify_metrics(metrics: AggregateMetrics) -> Classification {
    if metrics.avg_pressure < HIGH_PRESSURE_FLOOR
        || metrics.avg_temperature < HIGH_TEMPERATURE_FLOOR
        || metrics.avg_emg < HIGH_EMG_FLOOR
    {
        return Classification {
            risk: RiskLevel::High,
            diagnosis: "Suspected diabetic neuropathy".to_string(),
            confidence: 0.87,
            recommendations: vec![
                "Specialist consultation recommended".to_string(),
                "Increased monitoring required".to_string(),
                "Consider supplementary testing".to_string(),
            ],
            metrics,
        };
    }

    if metrics.avg_pressure < MODERATE_PRESSURE_FLOOR
        || metrics.avg_temperature < MODERATE_TEMPERATURE_FLOOR
        || metrics.avg_emg < MODERATE_EMG_FLOOR
    {
        return Classification {
            risk: RiskLevel::Moderate,
            diagnosis: "Possible early signs".to_string(),
            confidence: 0.78,
            recommendations: vec![
                "Regular monitoring".to_string(),
                "Re-evaluate in 1 month".to_string(),
            ],
            metrics,
        };
    }

    Classification {
        risk: RiskLevel::Low,
        diagnosis: "Normal".to_string(),
        confidence: 0.95,
        recommendations: vec!["Continue routine follow-up".to_string()],
        metrics,
    }
}

/// 对一批读数分级（聚合 + 分级）
pub fn classify(measurements: &[Measurement]) -> Result<Classification, AnalysisError> {
    Ok(classify_metrics(aggregate(measurements)?))
}
