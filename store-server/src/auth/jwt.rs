//! JWT 令牌服务
//!
//! Accounts and login live outside this service; tokens are issued by the
//! account surface and only validated here. `generate_token` exists for
//! operators and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orders::Actor;
use crate::utils::AppError;

const DEFAULT_EXPIRATION_MINUTES: i64 = 1440; // 24 小时
const DEFAULT_ISSUER: &str = "store-server";
const DEFAULT_AUDIENCE: &str = "storefront-clients";
const MIN_SECRET_LEN: usize = 32;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl JwtConfig {
    /// 从环境变量加载
    ///
    /// `JWT_SECRET` 缺失或不足 32 字符时，仅在 `allow_temporary_secret`
    /// 为真时生成临时密钥，否则返回错误。
    pub fn from_env(allow_temporary_secret: bool) -> Result<Self, JwtError> {
        let secret = resolve_secret(std::env::var("JWT_SECRET").ok(), allow_temporary_secret)?;
        Ok(Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXPIRATION_MINUTES),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
        })
    }

    /// `JWT_SECRET` 是否已正确配置
    pub fn secret_configured() -> bool {
        check_secret(std::env::var("JWT_SECRET").ok()).is_ok()
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    /// 用户名
    pub username: String,
    /// "customer" | "admin"
    pub role: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// 生成可打印的随机密钥 (用于开发环境)
pub fn generate_printable_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn check_secret(raw: Option<String>) -> Result<String, JwtError> {
    match raw {
        Some(secret) if secret.len() < MIN_SECRET_LEN => Err(JwtError::ConfigError(format!(
            "JWT_SECRET must be at least {MIN_SECRET_LEN} characters long"
        ))),
        Some(secret) => Ok(secret),
        None => Err(JwtError::ConfigError(
            "JWT_SECRET environment variable is not set".to_string(),
        )),
    }
}

fn resolve_secret(raw: Option<String>, allow_temporary: bool) -> Result<String, JwtError> {
    match check_secret(raw) {
        Err(_) if allow_temporary => Ok(generate_printable_secret()),
        other => other,
    }
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成新令牌
    pub fn generate_token(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// 由认证中间件创建，注入到请求处理函数
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// 用户 ID (snowflake, 令牌中以字符串存储)
    pub id: String,
    pub username: String,
    pub role: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl CurrentUser {
    /// 是否管理员
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Identity handed to the order core
    pub fn actor(&self) -> Result<Actor, AppError> {
        let user_id: i64 = self
            .id
            .parse()
            .map_err(|_| AppError::invalid_token(format!("Malformed subject: {}", self.id)))?;
        Ok(Actor {
            user_id,
            is_admin: self.is_admin(),
        })
    }
}
