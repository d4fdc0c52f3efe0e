//! Pagination types

use serde::{Deserialize, Serialize};

/// Default page size
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound for a page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page request (1-based)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamp page to >= 1 and limit to 1..=MAX_PAGE_SIZE
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

/// 分页响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    /// 总记录数
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            total.div_ceil(limit as u64) as u32
        } else {
            1
        };

        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
