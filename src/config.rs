//! 配置系统模块
//!
//! 统一处理 TOML 配置文件、环境变量、命令行参数

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config as ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::glove::ConnectionMode;

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(name = "neuro-glove")]
#[command(about = "智能手套监测内核 - 糖尿病神经病变风险筛查")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// 数据库 URL
    #[arg(short, long)]
    pub database_url: Option<String>,

    /// 采样间隔（毫秒）
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 支持的命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 运行监测循环
    Run,
    /// 列出患者
    ListPatients,
    /// 患者详情
    PatientInfo {
        /// 患者 ID
        id: String,
    },
    /// 重置配置
    ResetConfig,
}

/// 日志级别
#[derive(clap::ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 手套采集配置
    pub glove: GloveConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 医生身份配置
    pub auth: AuthConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库 URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时（秒）
    pub connect_timeout: u64,
}

/// 手套采集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GloveConfig {
    /// 连接方式
    pub connection_mode: ConnectionMode,
    /// 采样间隔（毫秒）
    pub sample_interval_ms: u64,
    /// 记录窗口大小（保留最近 N 条采样）
    pub window_size: usize,
    /// 初始电量（百分比）
    pub battery_start_percent: u8,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
    /// 日志输出目录
    pub directory: Option<PathBuf>,
    /// 日志文件大小限制（MB）
    pub max_file_size_mb: u32,
    /// 保留的日志文件数
    pub max_files: u32,
}

/// 日志格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 简洁格式
    Compact,
    /// 详细格式
    Full,
    /// JSON 格式
    Json,
}

/// 医生身份配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 静态访问令牌（未设置时生成演示身份）
    pub access_token: Option<String>,
    /// 是否允许从环境变量加载令牌
    pub allow_env_token: bool,
    /// 演示医生姓名
    pub doctor_name: String,
    /// 演示医生专科
    pub doctor_specialty: String,
    /// 演示医生邮箱
    pub doctor_email: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:neuro-glove.db".to_string(),
            max_connections: 5,
            connect_timeout: 30,
        }
    }
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::Bluetooth,
            sample_interval_ms: 1000,
            window_size: 20,
            battery_start_percent: 85,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            directory: None,
            max_file_size_mb: 10,
            max_files: 5,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            allow_env_token: true, // 允许从环境变量加载
            doctor_name: "Dr. Demo".to_string(),
            doctor_specialty: "Endocrinology".to_string(),
            doctor_email: "demo@clinic.local".to_string(),
        }
    }
}

impl Config {
    /// 从多种配置源加载配置
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();
        Self::load_with_cli(cli)
    }

    /// 使用指定的 CLI 参数加载配置
    pub fn load_with_cli(cli: Cli) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. 首先加载默认配置
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // 2. 加载系统配置文件
        if let Some(system_config) = Self::get_system_config_path() {
            if system_config.exists() {
                builder = builder.add_source(File::from(system_config));
            }
        }

        // 3. 加载用户配置文件
        if let Some(user_config) = Self::get_user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config));
            }
        }

        // 4. 加载指定的配置文件
        if let Some(config_path) = cli.config {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            } else {
                return Err(anyhow!("配置文件不存在: {}", config_path.display()));
            }
        }

        // 5. 加载环境变量（前缀 NEURO_GLOVE_）
        builder = builder.add_source(
            Environment::with_prefix("NEURO_GLOVE")
                .prefix_separator("_")
                .separator("__"),
        );

        // 6. 构建配置
        let mut config: Config = builder.build()?.try_deserialize()?;

        // 7. 应用命令行参数覆盖
        if let Some(log_level) = cli.log_level {
            config.logging.level = log_level;
        }

        if let Some(database_url) = cli.database_url {
            config.database.url = database_url;
        }

        if let Some(interval_ms) = cli.interval_ms {
            config.glove.sample_interval_ms = interval_ms;
        }

        // 8. 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 获取系统配置文件路径
    pub fn get_system_config_path() -> Option<PathBuf> {
        Some(PathBuf::from("/etc/neuro-glove/config.toml"))
    }

    /// 获取用户配置文件路径
    pub fn get_user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "neuro-glove")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// 获取数据目录
    pub fn get_data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "neuro-glove").map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// 获取日志目录
    pub fn get_log_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "neuro-glove").map(|dirs| dirs.cache_dir().join("logs"))
    }

    /// 生成默认配置文件
    pub fn generate_default_config() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).map_err(|e| anyhow!("生成默认配置失败: {}", e))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| anyhow!("序列化配置失败: {}", e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置
    fn validate(&self) -> Result<()> {
        // 验证数据库 URL
        if self.database.url.is_empty() {
            return Err(anyhow!("数据库 URL 不能为空"));
        }

        // 验证采样参数
        if self.glove.sample_interval_ms == 0 {
            return Err(anyhow!("采样间隔不能为 0"));
        }

        if self.glove.window_size == 0 {
            return Err(anyhow!("记录窗口大小不能为 0"));
        }

        if self.glove.battery_start_percent > 100 {
            return Err(anyhow!("初始电量不能超过 100%"));
        }

        // 验证日志目录
        if let Some(log_dir) = &self.logging.directory {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
        }

        Ok(())
    }

    /// 初始化日志系统
    pub fn init_logging(&self) -> Result<()> {
        let level_filter = EnvFilter::builder()
            .with_default_directive(Level::from(self.logging.level.clone()).into())
            .from_env_lossy();

        // 根据格式选择不同的初始化方式
        match self.logging.format {
            LogFormat::Compact => {
                let fmt_layer = fmt::layer().compact();
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "neuro-glove.log");
                    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
                    let file_layer = fmt::layer()
                        .compact()
                        .with_ansi(false)
                        .with_writer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .init();
                }
            }
            LogFormat::Full => {
                let fmt_layer = fmt::layer();
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "neuro-glove.log");
                    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
                    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .init();
                }
            }
            LogFormat::Json => {
                // JSON格式使用不同的层
                let fmt_layer = fmt::layer().with_target(true).with_level(true);
                if let Some(log_dir) = &self.logging.directory {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender =
                        tracing_appender::rolling::daily(log_dir, "neuro-glove.log");
                    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
                    let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .with(file_layer)
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(level_filter)
                        .with(fmt_layer)
                        .init();
                }
            }
        }

        tracing::info!("日志系统已初始化，级别: {:?}", self.logging.level);
        Ok(())
    }

    /// 快速初始化日志系统（使用默认配置）
    pub fn init_default_logging() -> Result<()> {
        let config = Config::default();
        config.init_logging()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:neuro-glove.db");
        assert_eq!(config.glove.sample_interval_ms, 1000);
        assert_eq!(config.glove.window_size, 20);
        assert_eq!(config.glove.battery_start_percent, 85);
        assert!(matches!(config.logging.level, LogLevel::Info));
        assert!(matches!(
            config.glove.connection_mode,
            ConnectionMode::Bluetooth
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("database"));
        assert!(toml_str.contains("glove"));
        assert!(toml_str.contains("logging"));
        assert!(toml_str.contains("auth"));
    }

    #[test]
    fn test_config_file_loading() {
        // 在CI环境中，使用更明确的临时目录路径
        let temp_dir = if std::env::var("CI").is_ok() {
            TempDir::new_in(".").unwrap_or_else(|_| TempDir::new().unwrap())
        } else {
            TempDir::new().unwrap()
        };
        let config_path = temp_dir.path().join("config.toml");

        // 创建测试配置文件
        let test_config = r#"
[database]
url = "sqlite:test.db"
max_connections = 10

[glove]
connection_mode = "usb"
sample_interval_ms = 250
window_size = 5

[logging]
level = "debug"
format = "full"
        "#;

        std::fs::write(&config_path, test_config).unwrap();

        // 测试加载
        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path))
            .build()
            .unwrap();

        let config: Config = builder.try_deserialize().unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.glove.sample_interval_ms, 250);
        assert_eq!(config.glove.window_size, 5);
        assert!(matches!(config.glove.connection_mode, ConnectionMode::Usb));
        assert!(matches!(config.logging.level, LogLevel::Debug));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }

    #[test]
    fn test_invalid_glove_config_rejected() {
        let mut config = Config::default();
        config.glove.sample_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.glove.battery_start_percent = 101;
        assert!(config.validate().is_err());
    }
}
