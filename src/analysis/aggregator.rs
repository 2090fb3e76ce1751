//! 测量聚合
//!
//! 将一批手套读数归约为三路信号的算术平均值

use serde::{Deserialize, Serialize};

use crate::records::Measurement;

use super::AnalysisError;

/// 三路信号的平均指标
///
/// 仅在一次分级调用期间存在，随分析结果一起序列化
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub avg_emg: f64,
}

/// 计算一批读数的平均指标
///
/// 输入必须非空且全部为有限数值；空输入和 NaN/∞ 都返回
/// InvalidInput 类错误而不是产生 NaN 均值
pub fn aggregate(measurements: &[Measurement]) -> Result<AggregateMetrics, AnalysisError> {
    if measurements.is_empty() {
        return Err(AnalysisError::EmptyMeasurements);
    }

    for measurement in measurements {
        if let Some(field) = measurement.non_finite_field() {
            return Err(AnalysisError::NonFiniteField { field });
        }
    }

    let count = measurements.len() as f64;
    let mut sum_pressure = 0.0;
    let mut sum_temperature = 0.0;
    let mut sum_emg = 0.0;

    for measurement in measurements {
        sum_pressure += measurement.pressure;
        sum_temperature += measurement.temperature;
        sum_emg += measurement.emg;
    }

    Ok(AggregateMetrics {
        avg_pressure: sum_pressure / count,
        avg_temperature: sum_temperature / count,
        avg_emg: sum_emg / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn reading(pressure: f64, temperature: f64, emg: f64) -> Measurement {
        Measurement::new(pressure, temperature, emg)
    }

    #[test]
    fn test_mean_of_single_reading() {
        let metrics = aggregate(&[reading(80.0, 34.0, 60.0)]).unwrap();
        assert!((metrics.avg_pressure - 80.0).abs() < TOLERANCE);
        assert!((metrics.avg_temperature - 34.0).abs() < TOLERANCE);
        assert!((metrics.avg_emg - 60.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_mean_is_exact_arithmetic_mean() {
        let batch = vec![
            reading(45.0, 31.0, 25.0),
            reading(55.0, 33.0, 35.0),
            reading(65.0, 35.0, 45.0),
        ];

        let metrics = aggregate(&batch).unwrap();

        let expected_pressure = (45.0 + 55.0 + 65.0) / 3.0;
        let expected_temperature = (31.0 + 33.0 + 35.0) / 3.0;
        let expected_emg = (25.0 + 35.0 + 45.0) / 3.0;

        assert!((metrics.avg_pressure - expected_pressure).abs() < TOLERANCE);
        assert!((metrics.avg_temperature - expected_temperature).abs() < TOLERANCE);
        assert!((metrics.avg_emg - expected_emg).abs() < TOLERANCE);
    }

    #[test]
    fn test_order_does_not_matter() {
        let forward = vec![reading(40.0, 30.0, 20.0), reading(80.0, 36.0, 70.0)];
        let backward = vec![reading(80.0, 36.0, 70.0), reading(40.0, 30.0, 20.0)];

        assert_eq!(aggregate(&forward).unwrap(), aggregate(&backward).unwrap());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let result = aggregate(&[]);
        assert!(matches!(result, Err(AnalysisError::EmptyMeasurements)));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let result = aggregate(&[reading(f64::NAN, 34.0, 60.0)]);
        assert!(matches!(
            result,
            Err(AnalysisError::NonFiniteField { field: "pressure" })
        ));

        let result = aggregate(&[reading(80.0, 34.0, f64::INFINITY)]);
        assert!(matches!(
            result,
            Err(AnalysisError::NonFiniteField { field: "emg" })
        ));
    }
}
