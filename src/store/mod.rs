//! 存储模块
//!
//! 通用键值存储接口与两种引擎（SQLite / 内存）

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 通用键值存储接口
///
/// 所有医疗记录以 JSON 值按键存放；列表查询通过键前缀扫描实现。
/// 任何满足该契约的引擎（内嵌或外部）都可以作为后端
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取指定键的值
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    /// 写入指定键的值（存在则覆盖）
    async fn set(&self, key: &str, value: &JsonValue) -> Result<()>;

    /// 删除指定键，返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 按键前缀扫描，按键升序返回所有值
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<JsonValue>>;
}

/// 共享存储句柄
pub type SharedStore = Arc<dyn KvStore>;

/// 记录键构造
///
/// 患者按医生分组；测量、处方、分析按患者分组；警报、设置、档案按医生分组
pub mod keys {
    pub fn profile(doctor_id: &str) -> String {
        format!("profile:{doctor_id}")
    }

    pub fn patient(doctor_id: &str, patient_id: &str) -> String {
        format!("patient:{doctor_id}:{patient_id}")
    }

    pub fn patient_prefix(doctor_id: &str) -> String {
        format!("patient:{doctor_id}:")
    }

    pub fn measurement(patient_id: &str, measurement_id: &str) -> String {
        format!("measurement:{patient_id}:{measurement_id}")
    }

    pub fn measurement_prefix(patient_id: &str) -> String {
        format!("measurement:{patient_id}:")
    }

    pub fn prescription(patient_id: &str, prescription_id: &str) -> String {
        format!("prescription:{patient_id}:{prescription_id}")
    }

    pub fn prescription_prefix(patient_id: &str) -> String {
        format!("prescription:{patient_id}:")
    }

    pub fn analysis(patient_id: &str, analysis_id: &str) -> String {
        format!("analysis:{patient_id}:{analysis_id}")
    }

    pub fn analysis_prefix(patient_id: &str) -> String {
        format!("analysis:{patient_id}:")
    }

    pub fn alert(doctor_id: &str, alert_id: &str) -> String {
        format!("alert:{doctor_id}:{alert_id}")
    }

    pub fn alert_prefix(doctor_id: &str) -> String {
        format!("alert:{doctor_id}:")
    }

    pub fn settings(doctor_id: &str) -> String {
        format!("settings:{doctor_id}")
    }
}
