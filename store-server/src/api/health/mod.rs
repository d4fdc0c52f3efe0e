//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 + 数据库探测 | 无 |

use std::time::Instant;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    database: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// ok | error
    status: &'static str,
    latency_ms: Option<u64>,
    message: Option<String>,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let start = Instant::now();
    let database = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "ok",
            latency_ms: Some(start.elapsed().as_millis() as u64),
            message: None,
        },
        Err(e) => CheckResult {
            status: "error",
            latency_ms: None,
            message: Some(e.message),
        },
    };

    Json(HealthResponse {
        status: if database.status == "ok" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
