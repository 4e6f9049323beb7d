//! 預測與預測時間桶

use chrono::NaiveDate;
use forecast_core::{BucketCalendar, Demand, DemandPolicy, DemandType, ForecastError, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::bucketing::BucketStore;
use crate::distribution::DistributionEngine;

/// 預測時間桶
///
/// 由所屬預測獨佔擁有。`demand.quantity` 永遠等於淨剩餘數量，
/// 讓計劃引擎像一般訂單一樣規劃時間桶。
#[derive(Debug, Clone)]
pub struct ForecastBucket {
    /// 需求屬性（隱藏，需求日期 = 開始日期）
    pub demand: Demand,

    /// 所屬預測（非擁有的反向引用）
    pub forecast_id: Uuid,

    /// 開始日期（含）
    pub start: NaiveDate,

    /// 結束日期（不含）
    pub end: NaiveDate,

    /// 日曆權重
    pub weight: Decimal,

    total_quantity: Decimal,
    consumed_quantity: Decimal,
}

impl ForecastBucket {
    pub(crate) fn new(
        forecast: &Demand,
        start: NaiveDate,
        end: NaiveDate,
        weight: Decimal,
    ) -> Self {
        let demand = Demand::new(
            forecast.item_id.clone(),
            Decimal::ZERO,
            start,
            DemandType::ForecastBucket,
        )
        .with_name(format!("{} - {}", forecast.name, start))
        .with_priority(forecast.priority)
        .with_policy(forecast.policy);

        let mut bucket = Self {
            demand,
            forecast_id: forecast.id,
            start,
            end,
            weight,
            total_quantity: Decimal::ZERO,
            consumed_quantity: Decimal::ZERO,
        };
        bucket.demand.customer_id = forecast.customer_id.clone();
        bucket.demand.operation_id = forecast.operation_id.clone();
        bucket.demand.hidden = true;
        bucket
    }

    /// 檢查日期是否落在此時間桶內
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// 預測總數量
    pub fn total_quantity(&self) -> Decimal {
        self.total_quantity
    }

    /// 已沖銷的累計數量
    pub fn consumed_quantity(&self) -> Decimal {
        self.consumed_quantity
    }

    /// 淨剩餘數量（總數量 - 已沖銷，最小為零）
    pub fn net_quantity(&self) -> Decimal {
        // 已沖銷數量不為負，相減只可能向下溢位
        self.total_quantity
            .checked_sub(self.consumed_quantity)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO)
    }

    /// 設置預測總數量（絕對值）
    pub fn set_total_quantity(&mut self, quantity: Decimal) {
        self.total_quantity = quantity;
        self.sync_quantity();
    }

    /// 沖銷數量，返回淨剩餘實際減少的數量
    ///
    /// 數量為負或累計沖銷溢位時返回 [`ForecastError::Data`]，時間桶不變。
    pub(crate) fn consume(&mut self, quantity: Decimal) -> Result<Decimal> {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(ForecastError::Data(format!(
                "時間桶 {} 不能沖銷負數量 {}",
                self.demand.name, quantity
            )));
        }

        let consumed = self.consumed_quantity.checked_add(quantity).ok_or_else(|| {
            ForecastError::Data(format!(
                "時間桶 {} 的沖銷數量溢位: {} + {}",
                self.demand.name, self.consumed_quantity, quantity
            ))
        })?;

        let before = self.net_quantity();
        self.consumed_quantity = consumed;
        self.sync_quantity();
        Ok(before - self.net_quantity())
    }

    /// 撤銷先前的沖銷
    pub(crate) fn release(&mut self, quantity: Decimal) {
        self.consumed_quantity = (self.consumed_quantity - quantity).max(Decimal::ZERO);
        self.sync_quantity();
    }

    pub(crate) fn reset_consumption(&mut self) {
        self.consumed_quantity = Decimal::ZERO;
        self.sync_quantity();
    }

    fn sync_quantity(&mut self) {
        self.demand.quantity = self.net_quantity();
    }
}

/// 預測
///
/// 一個（物料、客戶、優先級、交貨作業）組合的分桶需求訊號。
/// 預測本身不直接承載數量，數量一律透過日期區間分配到時間桶。
#[derive(Debug, Clone)]
pub struct Forecast {
    demand: Demand,
    calendar_id: Option<String>,
    buckets: Vec<ForecastBucket>,
    quantities_entered: bool,
}

impl Forecast {
    /// 創建新的預測（尚未指定日曆，沒有時間桶）
    pub fn new(name: String, item_id: String) -> Self {
        // 預測的需求日期沒有意義，固定為最小日期
        let demand = Demand::new(item_id, Decimal::ZERO, NaiveDate::MIN, DemandType::Forecast)
            .with_name(name);

        Self {
            demand,
            calendar_id: None,
            buckets: Vec::new(),
            quantities_entered: false,
        }
    }

    /// 建構器模式：設置客戶
    pub fn with_customer(mut self, customer_id: String) -> Self {
        self.demand.customer_id = Some(customer_id);
        self
    }

    /// 建構器模式：設置交貨作業
    pub fn with_operation(mut self, operation_id: String) -> Self {
        self.set_operation(Some(operation_id));
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.set_priority(priority);
        self
    }

    pub fn id(&self) -> Uuid {
        self.demand.id
    }

    pub fn name(&self) -> &str {
        &self.demand.name
    }

    /// 需求屬性
    pub fn demand(&self) -> &Demand {
        &self.demand
    }

    pub fn item_id(&self) -> &str {
        &self.demand.item_id
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.demand.customer_id.as_deref()
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.demand.operation_id.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.demand.priority
    }

    pub fn policy(&self) -> DemandPolicy {
        self.demand.policy
    }

    /// 使用中的日曆ID（弱引用）
    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id.as_deref()
    }

    /// 時間桶（依開始日期排序）
    pub fn buckets(&self) -> &[ForecastBucket] {
        &self.buckets
    }

    /// 是否曾成功輸入預測數量（數量加總回到零仍視為已輸入）
    pub fn has_quantities(&self) -> bool {
        self.quantities_entered
    }

    /// 所有時間桶的預測總數量（溢位時取極值）
    pub fn total_quantity(&self) -> Decimal {
        self.buckets
            .iter()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.total_quantity()))
    }

    /// 所有時間桶的淨剩餘數量（溢位時取極值）
    pub fn net_quantity(&self) -> Decimal {
        self.buckets
            .iter()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.net_quantity()))
    }

    /// 查詢包含指定日期的時間桶
    pub fn bucket_at(&self, date: NaiveDate) -> Option<&ForecastBucket> {
        BucketStore::find_index(&self.buckets, date).map(|idx| &self.buckets[idx])
    }

    pub(crate) fn bucket_at_mut(&mut self, date: NaiveDate) -> Option<&mut ForecastBucket> {
        let idx = BucketStore::find_index(&self.buckets, date)?;
        Some(&mut self.buckets[idx])
    }

    /// 指定日曆並建立時間桶
    ///
    /// 已輸入數量後不可再更換日曆。
    pub fn attach_calendar(&mut self, calendar: &BucketCalendar) -> Result<()> {
        if self.has_quantities() {
            return Err(ForecastError::State(format!(
                "預測 {} 已輸入數量，無法更換日曆為 {}",
                self.demand.name, calendar.calendar_id
            )));
        }

        self.buckets = BucketStore::build(&self.demand, calendar);
        self.calendar_id = Some(calendar.calendar_id.clone());

        tracing::debug!(
            "預測 {} 使用日曆 {}，時間桶 {} 個",
            self.demand.name,
            calendar.calendar_id,
            self.buckets.len()
        );
        Ok(())
    }

    /// 將數量分配到日期區間 [start, end) 內的時間桶
    ///
    /// 參見 [`DistributionEngine::distribute`]。
    pub fn distribute_quantity(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        quantity: Decimal,
    ) -> Result<()> {
        DistributionEngine::distribute(&mut self.buckets, start, end, quantity)?;
        self.quantities_entered = true;
        Ok(())
    }

    /// 直接設置預測數量：不允許
    pub fn set_quantity(&mut self, _quantity: Decimal) -> Result<()> {
        Err(ForecastError::State(format!(
            "無法直接設置預測 {} 的數量，請使用日期區間分配",
            self.demand.name
        )))
    }

    /// 直接設置預測需求日期：不允許
    pub fn set_due_date(&mut self, _date: NaiveDate) -> Result<()> {
        Err(ForecastError::State(format!(
            "無法設置預測 {} 的需求日期",
            self.demand.name
        )))
    }

    /// 設置優先級，並同步到所有時間桶
    pub fn set_priority(&mut self, priority: i32) {
        self.demand.priority = priority;
        for bucket in &mut self.buckets {
            bucket.demand.priority = priority;
        }
    }

    /// 重設計劃策略，並同步到所有時間桶
    pub fn set_policy(&mut self, policy: &str) -> Result<()> {
        self.demand.policy.set(policy)?;
        self.propagate_policy();
        Ok(())
    }

    /// 追加計劃策略，並同步到所有時間桶
    pub fn add_policy(&mut self, policy: &str) -> Result<()> {
        self.demand.policy.add(policy)?;
        self.propagate_policy();
        Ok(())
    }

    /// 設置交貨作業，並同步到所有時間桶
    pub fn set_operation(&mut self, operation_id: Option<String>) {
        for bucket in &mut self.buckets {
            bucket.demand.operation_id = operation_id.clone();
        }
        self.demand.operation_id = operation_id;
    }

    // 物料/客戶的變更必須經由 ForecastModel 以同步索引
    pub(crate) fn set_item(&mut self, item_id: String) {
        for bucket in &mut self.buckets {
            bucket.demand.item_id = item_id.clone();
        }
        self.demand.item_id = item_id;
    }

    pub(crate) fn set_customer(&mut self, customer_id: Option<String>) {
        for bucket in &mut self.buckets {
            bucket.demand.customer_id = customer_id.clone();
        }
        self.demand.customer_id = customer_id;
    }

    pub(crate) fn reset_netting(&mut self) {
        for bucket in &mut self.buckets {
            bucket.reset_consumption();
        }
    }

    fn propagate_policy(&mut self) {
        let policy = self.demand.policy;
        for bucket in &mut self.buckets {
            bucket.demand.policy = policy;
        }
    }
}
