//! # Forecast Core
//!
//! 預測沖銷的核心資料模型與類型定義

pub mod calendar;
pub mod config;
pub mod demand;
pub mod hierarchy;

// Re-export 主要類型
pub use calendar::{BucketCalendar, CalendarBucket, CalendarRegistry, CalendarUsage};
pub use config::{HierarchySearchOrder, NettingConfig};
pub use demand::{Demand, DemandPolicy, DemandType};
pub use hierarchy::Hierarchy;

/// 預測模組錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// 在目前生命週期狀態下不允許的修改
    #[error("狀態錯誤: {0}")]
    State(String),

    /// 資料無法放置（例如所有時間桶權重為零）
    #[error("資料錯誤: {0}")]
    Data(String),

    /// 找不到時間桶或匹配的預測
    #[error("找不到: {0}")]
    NotFound(String),

    /// 日曆仍被使用中，拒絕刪除
    #[error("使用中: {0}")]
    InUse(String),

    /// 同一訂單的巢狀沖銷
    #[error("重入錯誤: {0}")]
    Reentrancy(String),

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForecastError {
    /// 是否為「找不到」類型（沖銷時屬於正常結果：訂單獨立存在）
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForecastError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
