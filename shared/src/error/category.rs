//! Error domains, one per thousand-block of codes

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Order,
    Payment,
    Product,
    User,
    /// 9xxx, plus the unassigned 3xxx and 7xxx blocks
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Product,
            8 => Self::User,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
