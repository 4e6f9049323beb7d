//! 預測沖銷配置模型

use serde::{Deserialize, Serialize};

use crate::Result;

/// 沖銷時搜尋客戶/物料階層的順序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchySearchOrder {
    /// 先往上搜尋客戶階層，再往上搜尋物料階層
    CustomerThenItem,
    /// 先往上搜尋物料階層，再往上搜尋客戶階層
    ItemThenCustomer,
}

/// 沖銷求解器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// 階層搜尋順序
    pub search_order: HierarchySearchOrder,

    /// 訂單與預測是否必須使用相同的交貨作業才算匹配
    pub match_using_delivery_operation: bool,

    /// 是否自動沖銷
    /// - true: 每次訂單新增/修改/刪除時立即增量沖銷
    /// - false: 只在呼叫 solve() 時批次沖銷（預設）
    pub automatic: bool,
}

impl NettingConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            search_order: HierarchySearchOrder::CustomerThenItem,
            match_using_delivery_operation: true,
            automatic: false,
        }
    }

    /// 建構器模式：設置階層搜尋順序
    pub fn with_search_order(mut self, order: HierarchySearchOrder) -> Self {
        self.search_order = order;
        self
    }

    /// 建構器模式：設置是否比對交貨作業
    pub fn with_match_using_delivery_operation(mut self, required: bool) -> Self {
        self.match_using_delivery_operation = required;
        self
    }

    /// 建構器模式：設置自動沖銷
    ///
    /// # 範例
    /// ```
    /// # use forecast_core::NettingConfig;
    /// let config = NettingConfig::new().with_automatic(true);
    /// assert!(config.automatic);
    /// ```
    pub fn with_automatic(mut self, automatic: bool) -> Self {
        self.automatic = automatic;
        self
    }

    /// 從 JSON 字串載入配置，缺少的欄位使用預設值
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 是否先搜尋客戶階層
    pub fn customer_then_item(&self) -> bool {
        self.search_order == HierarchySearchOrder::CustomerThenItem
    }
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self::new()
    }
}
