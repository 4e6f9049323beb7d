//! 需求模型

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ForecastError, Result};

/// 需求類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandType {
    /// 銷售訂單
    SalesOrder,
    /// 銷售預測（彙總）
    Forecast,
    /// 預測時間桶（預測的子需求）
    ForecastBucket,
}

/// 需求計劃策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandPolicy {
    /// true: 允許延遲交貨（PLANLATE）；false: 允許短交（PLANSHORT）
    pub plan_late: bool,

    /// true: 單次交貨（SINGLEDELIVERY）；false: 分批交貨（MULTIDELIVERY）
    pub single_delivery: bool,
}

impl DemandPolicy {
    /// 重設為預設值後套用策略字串
    pub fn set(&mut self, policy: &str) -> Result<()> {
        let mut updated = Self::default();
        updated.add(policy)?;
        *self = updated;
        Ok(())
    }

    /// 在目前策略上套用策略字串（以逗號或空白分隔，不分大小寫）
    ///
    /// 任一字詞無法辨識時返回 [`ForecastError::Data`]，策略保持不變。
    pub fn add(&mut self, policy: &str) -> Result<()> {
        let mut updated = *self;

        for token in policy
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            match token.to_ascii_uppercase().as_str() {
                "PLANLATE" => updated.plan_late = true,
                "PLANSHORT" => updated.plan_late = false,
                "SINGLEDELIVERY" => updated.single_delivery = true,
                "MULTIDELIVERY" => updated.single_delivery = false,
                _ => {
                    return Err(ForecastError::Data(format!("無效的需求策略: {}", token)));
                }
            }
        }

        *self = updated;
        Ok(())
    }

    /// 轉換為策略字串列表
    pub fn to_policy_strings(&self) -> Vec<String> {
        vec![
            if self.plan_late { "PLANLATE" } else { "PLANSHORT" }.to_string(),
            if self.single_delivery {
                "SINGLEDELIVERY"
            } else {
                "MULTIDELIVERY"
            }
            .to_string(),
        ]
    }
}

impl Default for DemandPolicy {
    fn default() -> Self {
        Self {
            plan_late: true,
            single_delivery: false,
        }
    }
}

impl fmt::Display for DemandPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_policy_strings().join(","))
    }
}

/// 需求
///
/// 銷售訂單、預測與預測時間桶共用的屬性，以 `demand_type` 區分。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    /// 需求ID
    pub id: Uuid,

    /// 需求名稱
    pub name: String,

    /// 物料ID
    pub item_id: String,

    /// 客戶ID
    pub customer_id: Option<String>,

    /// 交貨作業
    pub operation_id: Option<String>,

    /// 需求數量
    pub quantity: Decimal,

    /// 需求日期
    pub due_date: NaiveDate,

    /// 優先級（數值越小越優先）
    pub priority: i32,

    /// 計劃策略
    pub policy: DemandPolicy,

    /// 需求類型
    pub demand_type: DemandType,

    /// 是否隱藏（不出現在對外需求清單）
    pub hidden: bool,

    /// 來源單據（如銷售訂單號）
    pub source_ref: Option<String>,
}

impl Demand {
    /// 創建新的需求
    pub fn new(
        item_id: String,
        quantity: Decimal,
        due_date: NaiveDate,
        demand_type: DemandType,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: id.to_string(),
            item_id,
            customer_id: None,
            operation_id: None,
            quantity,
            due_date,
            priority: 0,
            policy: DemandPolicy::default(),
            demand_type,
            hidden: false,
            source_ref: None,
        }
    }

    /// 建構器模式：設置名稱
    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// 建構器模式：設置交貨作業
    pub fn with_operation(mut self, operation_id: String) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：設置計劃策略
    pub fn with_policy(mut self, policy: DemandPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 建構器模式：設置來源單據
    pub fn with_source_ref(mut self, source_ref: String) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    /// 檢查是否為預測或預測時間桶
    pub fn is_forecast(&self) -> bool {
        matches!(
            self.demand_type,
            DemandType::Forecast | DemandType::ForecastBucket
        )
    }

    /// 檢查是否可以沖銷預測（預測本身與隱藏需求不沖銷）
    pub fn is_nettable(&self) -> bool {
        !self.is_forecast() && !self.hidden
    }
}
