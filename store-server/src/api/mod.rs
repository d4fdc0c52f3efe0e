//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 顾客订单接口
//! - [`admin`] - 管理端订单、商品和统计接口

pub mod admin;
pub mod health;
pub mod orders;

pub use crate::utils::{ApiResponse, AppResult};
