//! 服务模块
//!
//! - [`http`] - HTTP 路由组装和访问日志

pub mod http;

pub use self::http::{build_app, build_router};
