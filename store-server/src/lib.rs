//! Store Server - 电商订单与库存核心
//!
//! # 架构概述
//!
//! - **库存台账** (`inventory`): 库存与销量的唯一写入口
//! - **订单引擎** (`orders`): 下单、状态流转、支付状态、删除，全部为单事务工作单元
//! - **统计** (`statistics`): 看板汇总 (只读)
//! - **数据库** (`db`): SQLite (WAL) + 内嵌迁移
//! - **认证** (`auth`): JWT 校验，身份由外部账户服务签发
//! - **HTTP API** (`api`): 轻量 REST 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── auth/          # JWT 认证
//! ├── services/      # 路由组装
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 错误类型、日志
//! ├── db/            # 连接池与仓储
//! ├── inventory/     # 库存台账
//! ├── orders/        # 订单生命周期
//! └── statistics/    # 数据统计
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod inventory;
pub mod orders;
pub mod services;
pub mod statistics;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use inventory::InventoryLedger;
pub use orders::{Actor, OrderEngine, OrderError};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境: 加载 .env，创建工作目录，初始化日志
pub fn setup_environment() -> Result<Config, core::ServerError> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env()?;
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let to_file = config.is_production().then_some(log_dir.as_path());
    init_logger_with_file(Some(config.log_level.as_str()), config.log_json, to_file);

    if !auth::JwtConfig::secret_configured() {
        tracing::warn!("JWT_SECRET missing or too short, using a temporary key for this run");
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   _____ __
  / ___// /_____  ________
  \__ \/ __/ __ \/ ___/ _ \
 ___/ / /_/ /_/ / /  /  __/
/____/\__/\____/_/   \___/
    "#
    );
}
