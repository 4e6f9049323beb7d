//! # Forecast Calculation Engine
//!
//! 預測時間桶分配與階層式預測沖銷

pub mod bucketing;
pub mod distribution;
pub mod forecast;
pub mod guard;
pub mod index;
pub mod model;
pub mod netting;
pub mod persistence;

// Re-export 主要類型
pub use bucketing::BucketStore;
pub use distribution::DistributionEngine;
pub use forecast::{Forecast, ForecastBucket};
pub use guard::NettingGuard;
pub use index::{ForecastIndex, ForecastKey};
pub use model::ForecastModel;
pub use netting::{NettingRecord, NettingSolver, OrderEvent};
pub use persistence::{BucketRecord, ForecastRecord};

/// 批次沖銷結果
#[derive(Debug, Clone)]
pub struct NettingResult {
    /// 沖銷記錄（依沖銷順序）
    pub records: Vec<NettingRecord>,

    /// 沒有匹配預測或時間桶的訂單
    pub unmatched: Vec<uuid::Uuid>,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl NettingResult {
    /// 創建空的沖銷結果
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            unmatched: Vec::new(),
            calculation_time_ms: None,
        }
    }

    /// 沖銷的訂單總數量
    pub fn netted_quantity(&self) -> rust_decimal::Decimal {
        self.records.iter().map(|r| r.quantity).sum()
    }
}
