//! 預測模型（預測註冊表與生命週期）

use std::collections::HashMap;

use chrono::NaiveDate;
use forecast_core::{BucketCalendar, CalendarUsage, Demand, ForecastError, Hierarchy, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::forecast::Forecast;
use crate::index::{ForecastIndex, ForecastKey};

/// 預測模型
///
/// 擁有所有預測及其時間桶，並維護（物料, 客戶）索引與客戶/物料階層。
/// 時間桶與索引只以 UUID 反向引用預測。
#[derive(Debug, Default)]
pub struct ForecastModel {
    forecasts: HashMap<Uuid, Forecast>,
    index: ForecastIndex,
    items: Hierarchy,
    customers: Hierarchy,
}

impl ForecastModel {
    /// 創建空的預測模型
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置物料與客戶階層
    pub fn with_hierarchies(mut self, items: Hierarchy, customers: Hierarchy) -> Self {
        self.items = items;
        self.customers = customers;
        self
    }

    pub fn items(&self) -> &Hierarchy {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Hierarchy {
        &mut self.items
    }

    pub fn customers(&self) -> &Hierarchy {
        &self.customers
    }

    pub fn customers_mut(&mut self) -> &mut Hierarchy {
        &mut self.customers
    }

    pub fn index(&self) -> &ForecastIndex {
        &self.index
    }

    /// 加入預測並註冊索引，返回預測ID
    ///
    /// 同一ID的預測已存在時返回 [`ForecastError::State`]，模型不變。
    pub fn insert_forecast(&mut self, forecast: Forecast) -> Result<Uuid> {
        let id = forecast.id();
        if self.forecasts.contains_key(&id) {
            return Err(ForecastError::State(format!(
                "預測 {}（{}）已存在",
                forecast.name(),
                id
            )));
        }

        self.index.insert(Self::key_of(&forecast), id);
        self.forecasts.insert(id, forecast);
        Ok(id)
    }

    /// 刪除預測
    ///
    /// 先移除索引，再釋放日曆引用並銷毀時間桶。
    pub fn remove_forecast(&mut self, forecast_id: Uuid) -> Result<Forecast> {
        let key = self
            .forecasts
            .get(&forecast_id)
            .map(Self::key_of)
            .ok_or_else(|| Self::missing(forecast_id))?;

        self.index.remove(&key, forecast_id);
        let forecast = self
            .forecasts
            .remove(&forecast_id)
            .ok_or_else(|| Self::missing(forecast_id))?;

        tracing::debug!("刪除預測 {}，時間桶 {} 個", forecast.name(), forecast.buckets().len());
        Ok(forecast)
    }

    pub fn forecast(&self, forecast_id: Uuid) -> Option<&Forecast> {
        self.forecasts.get(&forecast_id)
    }

    /// 可變引用（物料/客戶需經由 [`ForecastModel::set_item`] 與 [`ForecastModel::set_customer`] 修改）
    pub fn forecast_mut(&mut self, forecast_id: Uuid) -> Option<&mut Forecast> {
        self.forecasts.get_mut(&forecast_id)
    }

    /// 依名稱排序的所有預測
    pub fn forecasts(&self) -> Vec<&Forecast> {
        let mut forecasts: Vec<&Forecast> = self.forecasts.values().collect();
        forecasts.sort_by(|a, b| a.name().cmp(b.name()));
        forecasts
    }

    /// 查詢註冊在（物料, 客戶）下的預測（註冊順序）
    pub fn forecasts_for(&self, item_id: &str, customer_id: Option<&str>) -> Vec<&Forecast> {
        self.index
            .get(&ForecastKey::new(item_id, customer_id))
            .iter()
            .filter_map(|id| self.forecasts.get(id))
            .collect()
    }

    /// 指定日曆
    pub fn attach_calendar(&mut self, forecast_id: Uuid, calendar: &BucketCalendar) -> Result<()> {
        self.get_mut(forecast_id)?.attach_calendar(calendar)
    }

    /// 將數量分配到日期區間
    pub fn distribute_quantity(
        &mut self,
        forecast_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        quantity: Decimal,
    ) -> Result<()> {
        self.get_mut(forecast_id)?.distribute_quantity(start, end, quantity)
    }

    /// 變更物料，並移動索引
    pub fn set_item(&mut self, forecast_id: Uuid, item_id: String) -> Result<()> {
        let forecast = self
            .forecasts
            .get_mut(&forecast_id)
            .ok_or_else(|| Self::missing(forecast_id))?;

        let old_key = Self::key_of(forecast);
        forecast.set_item(item_id);
        let new_key = Self::key_of(forecast);

        self.index.relocate(&old_key, new_key, forecast_id);
        Ok(())
    }

    /// 變更客戶，並移動索引
    pub fn set_customer(&mut self, forecast_id: Uuid, customer_id: Option<String>) -> Result<()> {
        let forecast = self
            .forecasts
            .get_mut(&forecast_id)
            .ok_or_else(|| Self::missing(forecast_id))?;

        let old_key = Self::key_of(forecast);
        forecast.set_customer(customer_id);
        let new_key = Self::key_of(forecast);

        self.index.relocate(&old_key, new_key, forecast_id);
        Ok(())
    }

    /// 清除所有時間桶的沖銷數量
    pub fn reset_netting(&mut self) {
        for forecast in self.forecasts.values_mut() {
            forecast.reset_netting();
        }
    }

    /// 對外可見的需求（預測本身；時間桶為隱藏需求，不列出）
    pub fn visible_demands(&self) -> Vec<&Demand> {
        self.forecasts()
            .into_iter()
            .map(Forecast::demand)
            .filter(|d| !d.hidden)
            .collect()
    }

    /// 交給計劃引擎規劃的需求（所有預測時間桶）
    pub fn planning_demands(&self) -> Vec<&Demand> {
        self.forecasts()
            .into_iter()
            .flat_map(|f| f.buckets().iter().map(|b| &b.demand))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }

    pub(crate) fn get_mut(&mut self, forecast_id: Uuid) -> Result<&mut Forecast> {
        self.forecasts
            .get_mut(&forecast_id)
            .ok_or_else(|| Self::missing(forecast_id))
    }

    fn key_of(forecast: &Forecast) -> ForecastKey {
        ForecastKey::new(forecast.item_id(), forecast.customer_id())
    }

    fn missing(forecast_id: Uuid) -> ForecastError {
        ForecastError::NotFound(format!("預測 {}", forecast_id))
    }
}

impl CalendarUsage for ForecastModel {
    /// 日曆被尚未輸入數量的預測引用時，視為使用中
    fn calendar_in_use(&self, calendar_id: &str) -> bool {
        self.forecasts
            .values()
            .any(|f| f.calendar_id() == Some(calendar_id) && !f.has_quantities())
    }
}
