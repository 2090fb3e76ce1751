//! 医生身份与请求上下文
//!
//! 源系统把会话保存在进程级全局状态中；这里改为显式上下文，
//! 由调用方逐请求传入，不设全局单例

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::AuthConfig;

/// 身份验证错误类型
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("missing access token")]
    MissingToken,

    #[error("invalid access token")]
    InvalidToken,
}

/// 请求上下文：经过验证的医生身份
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub doctor_id: String,
    pub name: String,
    pub specialty: String,
    pub email: String,
}

/// 访问令牌验证接口
///
/// 生产环境由外部认证服务实现；本仓库提供本地静态实现用于演示与测试
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<RequestContext, AuthError>;
}

/// 本地静态令牌验证器
pub struct LocalTokenVerifier {
    token: String,
    context: RequestContext,
}

impl LocalTokenVerifier {
    /// 从配置创建验证器
    ///
    /// 令牌加载优先级：环境变量 NEURO_GLOVE_ACCESS_TOKEN（允许时）、
    /// 配置文件、随机生成
    pub fn from_config(auth: &AuthConfig) -> Self {
        let env_token = if auth.allow_env_token {
            match std::env::var("NEURO_GLOVE_ACCESS_TOKEN") {
                Ok(token) if !token.is_empty() => {
                    tracing::info!("从环境变量加载访问令牌");
                    Some(token)
                }
                _ => None,
            }
        } else {
            None
        };

        let token = env_token
            .or_else(|| auth.access_token.clone())
            .unwrap_or_else(|| {
                tracing::info!("未配置访问令牌，生成一次性演示令牌");
                uuid::Uuid::new_v4().to_string()
            });

        let context = RequestContext {
            doctor_id: derive_doctor_id(&auth.doctor_email),
            name: auth.doctor_name.clone(),
            specialty: auth.doctor_specialty.clone(),
            email: auth.doctor_email.clone(),
        };

        Self { token, context }
    }

    /// 直接构造验证器（测试用）
    pub fn new(token: String, context: RequestContext) -> Self {
        Self { token, context }
    }

    /// 本验证器接受的令牌
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl TokenVerifier for LocalTokenVerifier {
    fn verify(&self, token: &str) -> Result<RequestContext, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        if token != self.token {
            return Err(AuthError::InvalidToken);
        }

        Ok(self.context.clone())
    }
}

/// 从邮箱派生稳定的医生 ID
///
/// 跨进程重启保持一致，患者键才能继续归属同一医生
fn derive_doctor_id(email: &str) -> String {
    let mut hasher = DefaultHasher::new();
    email.hash(&mut hasher);
    "neuro-glove-doctor-derivation".hash(&mut hasher);
    format!("doctor-{:016x}", hasher.finish())
}
