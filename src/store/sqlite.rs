//! 基于 SQLite 的键值存储引擎

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::config::DatabaseConfig;

use super::KvStore;

/// SQLite 存储引擎
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 创建新的存储实例
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!("正在初始化存储层...");

        // 确保数据库目录存在
        if let Some(parent) = Path::new(config.url.trim_start_matches("sqlite:")).parent() {
            if !parent.exists() && !parent.as_os_str().is_empty() {
                tracing::debug!("创建数据库目录: {:?}", parent);
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("正在连接数据库: {}", config.url);

        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // 创建连接池，添加超时和优化配置
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .idle_timeout(std::time::Duration::from_secs(60))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .connect_with(options)
            .await
            .map_err(|e| anyhow::anyhow!("无法连接到数据库: {}", e))?;

        // 设置 SQLite 优化参数
        tracing::debug!("设置 SQLite 优化参数");
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA temp_store = MEMORY")
            .execute(&pool)
            .await?;

        tracing::info!("正在运行数据库迁移...");

        // 运行迁移，添加超时保护
        let migrate_result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            sqlx::migrate!("./migrations").run(&pool),
        )
        .await;

        match migrate_result {
            Ok(Ok(_)) => {
                tracing::info!("数据库迁移完成");
            }
            Ok(Err(e)) => {
                return Err(anyhow::anyhow!("数据库迁移失败: {}", e));
            }
            Err(_) => {
                return Err(anyhow::anyhow!("数据库迁移超时（10秒）"));
            }
        }

        tracing::info!("存储层初始化完成");
        Ok(Self { pool })
    }

    /// 获取数据库连接池（用于高级操作）
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let query = "SELECT value FROM kv_store WHERE key = ?1";

        let result = sqlx::query(query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &JsonValue) -> Result<()> {
        let query = r#"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
        "#;

        sqlx::query(query)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let query = "DELETE FROM kv_store WHERE key = ?1";

        let result = sqlx::query(query)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<JsonValue>> {
        let query = "SELECT value FROM kv_store WHERE key LIKE ?1 ORDER BY key";

        let rows = sqlx::query(query)
            .bind(format!("{prefix}%"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("value")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_db() -> (SqliteStore, TempDir) {
        // 在CI环境中，使用更明确的临时目录路径
        let temp_dir = if std::env::var("CI").is_ok() {
            TempDir::new_in(".").unwrap_or_else(|_| TempDir::new().unwrap())
        } else {
            TempDir::new().unwrap()
        };

        let db_path = temp_dir.path().join("test.db");
        let config = DatabaseConfig {
            url: format!("sqlite:{}", db_path.display()),
            ..DatabaseConfig::default()
        };

        let store = SqliteStore::new(&config).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = setup_test_db().await;

        let key = "patient:doc-1:pat-1";
        let value = serde_json::json!({"first_name": "Marie"});

        store.set(key, &value).await.unwrap();

        let retrieved = store.get(key).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (store, _temp_dir) = setup_test_db().await;

        let key = "settings:doc-1";
        let value1 = serde_json::json!({"theme": "light"});
        let value2 = serde_json::json!({"theme": "dark"});

        store.set(key, &value1).await.unwrap();
        store.set(key, &value2).await.unwrap();

        let retrieved = store.get(key).await.unwrap();
        assert_eq!(retrieved, Some(value2));
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _temp_dir) = setup_test_db().await;

        let key = "alert:doc-1:a-1";
        let value = serde_json::json!({"read": false});

        store.set(key, &value).await.unwrap();

        let deleted = store.delete(key).await.unwrap();
        assert!(deleted);

        let retrieved = store.get(key).await.unwrap();
        assert_eq!(retrieved, None);

        // 再次删除应返回 false
        let deleted = store.delete(key).await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_scan_prefix() {
        let (store, _temp_dir) = setup_test_db().await;

        for i in 0..3 {
            let key = format!("measurement:pat-1:m-{i}");
            store
                .set(&key, &serde_json::json!({"index": i}))
                .await
                .unwrap();
        }
        // 其他前缀的键不应出现在结果中
        store
            .set("measurement:pat-2:m-0", &serde_json::json!({"index": 99}))
            .await
            .unwrap();

        let values = store.scan_prefix("measurement:pat-1:").await.unwrap();
        assert_eq!(values.len(), 3);
        for (i, value) in values.iter().enumerate() {
            assert_eq!(value["index"], i as i64);
        }
    }
}
