//! 内存键值存储引擎
//!
//! 无持久化，用于测试与临时运行

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::KvStore;

/// 内存存储引擎
///
/// BTreeMap 保证前缀扫描按键升序返回
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, JsonValue>>,
}

impl MemoryStore {
    /// 创建空的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前键数量
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &JsonValue) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<JsonValue>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }
}
