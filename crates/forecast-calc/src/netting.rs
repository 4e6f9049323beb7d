//! 預測沖銷

use std::collections::HashMap;

use chrono::NaiveDate;
use forecast_core::{Demand, ForecastError, HierarchySearchOrder, NettingConfig, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::guard::NettingGuard;
use crate::index::ForecastKey;
use crate::model::ForecastModel;
use crate::NettingResult;

/// 一張訂單的沖銷記錄
#[derive(Debug, Clone, PartialEq)]
pub struct NettingRecord {
    /// 訂單ID
    pub order_id: Uuid,
    /// 匹配的預測
    pub forecast_id: Uuid,
    /// 被沖銷的時間桶開始日期
    pub bucket_start: NaiveDate,
    /// 沖銷數量（訂單數量）
    pub quantity: Decimal,
    /// 時間桶淨剩餘實際減少的數量
    pub net_reduction: Decimal,
}

/// 訂單異動事件（自動沖銷模式）
#[derive(Debug, Clone, Copy)]
pub enum OrderEvent<'a> {
    /// 新增訂單
    Created(&'a Demand),
    /// 訂單數量、日期或其他屬性變更
    Changed(&'a Demand),
    /// 刪除訂單
    Deleted(Uuid),
}

/// 預測沖銷求解器
///
/// 為每張訂單找出最具體的匹配預測，並扣減該預測時間桶的淨剩餘數量。
pub struct NettingSolver {
    config: NettingConfig,
    records: HashMap<Uuid, NettingRecord>,
    guard: NettingGuard,
}

impl NettingSolver {
    /// 創建新的沖銷求解器
    pub fn new(config: NettingConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            guard: NettingGuard::new(),
        }
    }

    pub fn config(&self) -> &NettingConfig {
        &self.config
    }

    /// 開關自動沖銷
    pub fn set_automatic(&mut self, automatic: bool) {
        self.config.automatic = automatic;
    }

    pub fn is_automatic(&self) -> bool {
        self.config.automatic
    }

    /// 查詢訂單的沖銷記錄
    pub fn record(&self, order_id: Uuid) -> Option<&NettingRecord> {
        self.records.get(&order_id)
    }

    /// 目前所有沖銷記錄
    pub fn records(&self) -> impl Iterator<Item = &NettingRecord> {
        self.records.values()
    }

    /// 建立依序嘗試的（物料, 客戶）搜尋鍵
    ///
    /// 客戶層級 = 客戶自身及上層，最後是「無客戶」；物料層級 = 物料自身及上層。
    /// `CustomerThenItem`：外層走物料、內層走客戶；`ItemThenCustomer` 反之。
    pub fn search_keys(&self, model: &ForecastModel, order: &Demand) -> Vec<ForecastKey> {
        let items = model.items().ancestors(&order.item_id);

        let mut customers: Vec<Option<String>> = match &order.customer_id {
            Some(customer_id) => model
                .customers()
                .ancestors(customer_id)
                .into_iter()
                .map(Some)
                .collect(),
            None => Vec::new(),
        };
        customers.push(None);

        let mut keys = Vec::with_capacity(items.len() * customers.len());
        match self.config.search_order {
            HierarchySearchOrder::CustomerThenItem => {
                for item in &items {
                    for customer in &customers {
                        keys.push(ForecastKey::new(item, customer.as_deref()));
                    }
                }
            }
            HierarchySearchOrder::ItemThenCustomer => {
                for customer in &customers {
                    for item in &items {
                        keys.push(ForecastKey::new(item, customer.as_deref()));
                    }
                }
            }
        }
        keys
    }

    /// 找出訂單匹配的預測
    ///
    /// 依搜尋鍵順序取第一個符合的預測（同一鍵下依註冊順序）。
    /// 找不到時返回 [`ForecastError::NotFound`]，表示訂單獨立存在，不需沖銷。
    pub fn match_demand_to_forecast(&self, model: &ForecastModel, order: &Demand) -> Result<Uuid> {
        for key in self.search_keys(model, order) {
            for &forecast_id in model.index().get(&key) {
                let Some(forecast) = model.forecast(forecast_id) else {
                    continue;
                };

                if self.config.match_using_delivery_operation
                    && forecast.operation_id() != order.operation_id.as_deref()
                {
                    continue;
                }

                tracing::debug!(
                    "訂單 {} 匹配預測 {}（物料 {}, 客戶 {:?}）",
                    order.name,
                    forecast.name(),
                    key.item_id,
                    key.customer_id
                );
                return Ok(forecast_id);
            }
        }

        Err(ForecastError::NotFound(format!(
            "訂單 {} 沒有匹配的預測",
            order.name
        )))
    }

    /// 沖銷單張訂單
    ///
    /// 若訂單已有沖銷記錄，先撤銷舊記錄。
    /// 時間桶的總數量不變，只扣減淨剩餘數量（最小為零）。
    pub fn net_order(
        &mut self,
        model: &mut ForecastModel,
        order: &Demand,
    ) -> Result<NettingRecord> {
        if !order.is_nettable() {
            return Err(ForecastError::State(format!(
                "需求 {} 是預測或隱藏需求，不能沖銷",
                order.name
            )));
        }
        if order.quantity.is_sign_negative() && !order.quantity.is_zero() {
            return Err(ForecastError::Data(format!(
                "訂單 {} 的數量 {} 為負，不能沖銷",
                order.name, order.quantity
            )));
        }

        self.release_order(model, order.id);

        let forecast_id = self.match_demand_to_forecast(model, order)?;
        let forecast = model.get_mut(forecast_id)?;
        let forecast_name = forecast.name().to_string();
        let bucket = forecast.bucket_at_mut(order.due_date).ok_or_else(|| {
            ForecastError::NotFound(format!(
                "預測 {} 在 {} 沒有時間桶",
                forecast_name, order.due_date
            ))
        })?;

        let net_reduction = bucket.consume(order.quantity)?;
        let record = NettingRecord {
            order_id: order.id,
            forecast_id,
            bucket_start: bucket.start,
            quantity: order.quantity,
            net_reduction,
        };

        tracing::debug!(
            "訂單 {} 沖銷預測 {} 時間桶 {}：數量 {}，淨剩餘 {}",
            order.name,
            forecast_name,
            bucket.start,
            order.quantity,
            bucket.net_quantity()
        );

        self.records.insert(order.id, record.clone());
        Ok(record)
    }

    /// 撤銷訂單的沖銷，返回被撤銷的記錄
    pub fn release_order(
        &mut self,
        model: &mut ForecastModel,
        order_id: Uuid,
    ) -> Option<NettingRecord> {
        let record = self.records.remove(&order_id)?;

        match model
            .forecast_mut(record.forecast_id)
            .and_then(|f| f.bucket_at_mut(record.bucket_start))
        {
            Some(bucket) => bucket.release(record.quantity),
            None => tracing::warn!(
                "訂單 {} 的沖銷記錄已失效（預測 {} 或時間桶 {} 不存在）",
                order_id,
                record.forecast_id,
                record.bucket_start
            ),
        }

        Some(record)
    }

    /// 批次沖銷
    ///
    /// 先清除所有沖銷，再依（需求日期, 優先級, 名稱）順序沖銷每張訂單。
    /// 預測與隱藏需求會被略過；找不到匹配預測或時間桶的訂單列入 `unmatched`。
    pub fn solve(&mut self, model: &mut ForecastModel, orders: &[Demand]) -> Result<NettingResult> {
        tracing::info!("開始預測沖銷：訂單 {} 筆，預測 {} 筆", orders.len(), model.len());
        let start_time = std::time::Instant::now();

        model.reset_netting();
        self.records.clear();

        let mut sorted: Vec<&Demand> = orders.iter().filter(|o| o.is_nettable()).collect();
        sorted.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.priority.cmp(&b.priority))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut result = NettingResult::empty();
        for order in sorted {
            match self.net_order(model, order) {
                Ok(record) => result.records.push(record),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{}", e);
                    result.unmatched.push(order.id);
                }
                Err(e) => return Err(e),
            }
        }

        result.calculation_time_ms = Some(start_time.elapsed().as_millis());
        tracing::info!(
            "預測沖銷完成：沖銷 {} 筆，未匹配 {} 筆，耗時 {:?}",
            result.records.len(),
            result.unmatched.len(),
            start_time.elapsed()
        );
        Ok(result)
    }

    /// 訂單異動回呼（自動沖銷模式）
    ///
    /// 非自動模式時忽略事件。找不到匹配時返回 `Ok(None)`。
    pub fn on_order_event(
        &mut self,
        model: &mut ForecastModel,
        event: OrderEvent<'_>,
    ) -> Result<Option<NettingRecord>> {
        if !self.config.automatic {
            return Ok(None);
        }

        let order_id = match event {
            OrderEvent::Created(order) | OrderEvent::Changed(order) => order.id,
            OrderEvent::Deleted(order_id) => order_id,
        };

        self.guard.enter(order_id)?;
        let result = self.apply_event(model, event);
        self.guard.leave(order_id);
        result
    }

    /// 檢查訂單是否正在沖銷
    pub fn is_netting(&self, order_id: Uuid) -> bool {
        self.guard.is_netting(order_id)
    }

    fn apply_event(
        &mut self,
        model: &mut ForecastModel,
        event: OrderEvent<'_>,
    ) -> Result<Option<NettingRecord>> {
        match event {
            OrderEvent::Created(order) | OrderEvent::Changed(order) => {
                // 變為隱藏或預測需求的訂單不再沖銷，撤銷先前的數量
                if !order.is_nettable() {
                    self.release_order(model, order.id);
                    return Ok(None);
                }

                // net_order 會先撤銷舊數量再沖銷新數量
                match self.net_order(model, order) {
                    Ok(record) => Ok(Some(record)),
                    Err(e) if e.is_not_found() => {
                        tracing::debug!("{}", e);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            OrderEvent::Deleted(order_id) => {
                self.release_order(model, order_id);
                Ok(None)
            }
        }
    }
}

impl Default for NettingSolver {
    fn default() -> Self {
        Self::new(NettingConfig::default())
    }
}
