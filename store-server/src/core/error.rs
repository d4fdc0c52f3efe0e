use thiserror::Error;

use crate::auth::JwtError;
use crate::utils::AppError;

/// 服务器启动/运行期错误
///
/// 请求级错误走 [`AppError`]，这里只覆盖进程级故障。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("JWT 配置错误: {0}")]
    Jwt(#[from] JwtError),

    #[error("初始化失败: {0}")]
    Startup(#[from] AppError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 服务器 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
