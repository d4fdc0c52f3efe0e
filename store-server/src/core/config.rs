use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::core::Result;

/// 服务器配置 - 店铺订单服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | DATABASE_PATH | <WORK_DIR>/storefront.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 默认日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | DB_BUSY_TIMEOUT_MS | 5000 | 写锁等待上限(毫秒) |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | ORDER_RETRY_ATTEMPTS | 3 | 乐观并发重试次数 |
///
/// JWT 相关变量见 [`JwtConfig`]。
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/srv/store HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// SQLite 文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 校验配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    pub db_busy_timeout_ms: u64,
    pub db_max_connections: u32,
    /// 订单工作单元冲突时的最大尝试次数
    pub order_retry_attempts: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值。
    /// 生产环境与 release 构建必须提供 `JWT_SECRET`。
    pub fn from_env() -> Result<Self> {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            PathBuf::from(&work_dir)
                .join("storefront.db")
                .to_string_lossy()
                .into_owned()
        });

        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let allow_temporary_secret = cfg!(debug_assertions) && environment != "production";

        Ok(Self {
            work_dir,
            database_path,
            http_port: env_or("HTTP_PORT", 3000),
            jwt: JwtConfig::from_env(allow_temporary_secret)?,
            environment,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            db_busy_timeout_ms: env_or("DB_BUSY_TIMEOUT_MS", 5000),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5),
            order_retry_attempts: env_or("ORDER_RETRY_ATTEMPTS", 3),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Result<Self> {
        let mut config = Self::from_env()?;
        config.work_dir = work_dir.into();
        config.database_path = PathBuf::from(&config.work_dir)
            .join("storefront.db")
            .to_string_lossy()
            .into_owned();
        config.http_port = http_port;
        Ok(config)
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        if let Some(parent) = PathBuf::from(&self.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        // 不存在的变量使用默认值
        assert_eq!(env_or("STORE_TEST_UNSET_VARIABLE", 42u32), 42);
    }

    #[test]
    fn test_overrides_move_database_into_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_string_lossy().into_owned();
        let config = Config::with_overrides(work_dir.clone(), 0).unwrap();
        assert_eq!(config.http_port, 0);
        assert!(config.database_path.starts_with(&work_dir));
        assert!(config.database_path.ends_with("storefront.db"));

        config.ensure_work_dir_structure().unwrap();
        assert!(config.log_dir().is_dir());
    }
}
