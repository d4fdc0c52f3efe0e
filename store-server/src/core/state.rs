use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::{Config, Result};
use crate::db::{DbOptions, DbService};
use crate::inventory::InventoryLedger;
use crate::orders::OrderEngine;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 克隆成本很低：连接池与 JWT 服务都是共享所有权。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | orders | OrderEngine | 订单生命周期引擎 |
/// | inventory | InventoryLedger | 库存台账 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    pub db: DbService,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    pub orders: OrderEngine,
    pub inventory: InventoryLedger,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 确保工作目录存在
    /// 2. 打开数据库并执行迁移
    /// 3. 构造领域服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let db = DbService::new(
            &config.database_path,
            DbOptions {
                busy_timeout_ms: config.db_busy_timeout_ms,
                max_connections: config.db_max_connections,
            },
        )
        .await?;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::assemble(config.clone(), db, jwt_service))
    }

    /// 基于已有数据库构造 (测试使用)
    pub fn with_db(config: Config, db: DbService, jwt_service: JwtService) -> Self {
        Self::assemble(config, db, Arc::new(jwt_service))
    }

    fn assemble(config: Config, db: DbService, jwt_service: Arc<JwtService>) -> Self {
        let orders = OrderEngine::new(db.pool.clone(), config.order_retry_attempts);
        let inventory = InventoryLedger::new(db.pool.clone());
        Self {
            config,
            db,
            jwt_service,
            orders,
            inventory,
        }
    }

    /// 获取连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }
}
