//! 沖銷中訂單追蹤

use std::collections::HashSet;

use forecast_core::{ForecastError, Result};
use uuid::Uuid;

/// 沖銷中訂單追蹤器
///
/// 同一張訂單在沖銷完成前不可再次進入沖銷。
#[derive(Debug, Default)]
pub struct NettingGuard {
    in_progress: HashSet<Uuid>,
}

impl NettingGuard {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 標記訂單開始沖銷
    pub fn enter(&mut self, order_id: Uuid) -> Result<()> {
        if !self.in_progress.insert(order_id) {
            return Err(ForecastError::Reentrancy(format!(
                "訂單 {} 正在沖銷中",
                order_id
            )));
        }
        Ok(())
    }

    /// 標記訂單沖銷結束
    pub fn leave(&mut self, order_id: Uuid) {
        self.in_progress.remove(&order_id);
    }

    /// 檢查訂單是否正在沖銷
    pub fn is_netting(&self, order_id: Uuid) -> bool {
        self.in_progress.contains(&order_id)
    }

    /// 是否沒有任何沖銷進行中
    pub fn is_idle(&self) -> bool {
        self.in_progress.is_empty()
    }
}
