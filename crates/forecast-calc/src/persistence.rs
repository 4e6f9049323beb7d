//! 預測的保存與載入

use chrono::NaiveDate;
use forecast_core::{CalendarRegistry, ForecastError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::forecast::Forecast;
use crate::model::ForecastModel;

/// 時間桶數量記錄
///
/// `end` 為空或等於 `start` 時，數量直接寫入包含 `start` 的時間桶；
/// 否則依權重分配到 [start, end)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    pub quantity: Decimal,
}

/// 預測記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub name: String,
    pub item_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub policy: Vec<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub buckets: Vec<BucketRecord>,
}

impl ForecastRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ForecastModel {
    /// 保存預測（只保存非零數量的時間桶）
    pub fn save_forecast(&self, forecast_id: Uuid) -> Result<ForecastRecord> {
        let forecast = self
            .forecast(forecast_id)
            .ok_or_else(|| ForecastError::NotFound(format!("預測 {}", forecast_id)))?;

        let buckets = forecast
            .buckets()
            .iter()
            .filter(|b| !b.total_quantity().is_zero())
            .map(|b| BucketRecord {
                start: b.start,
                end: None,
                quantity: b.total_quantity(),
            })
            .collect();

        Ok(ForecastRecord {
            name: forecast.name().to_string(),
            item_id: forecast.item_id().to_string(),
            customer_id: forecast.customer_id().map(str::to_string),
            operation_id: forecast.operation_id().map(str::to_string),
            priority: forecast.priority(),
            policy: forecast.policy().to_policy_strings(),
            calendar_id: forecast.calendar_id().map(str::to_string),
            buckets,
        })
    }

    /// 載入預測，返回新預測的ID
    ///
    /// 預測先在模型外完整建立，任何一步失敗時模型保持不變。
    pub fn load_forecast(
        &mut self,
        record: &ForecastRecord,
        calendars: &CalendarRegistry,
    ) -> Result<Uuid> {
        let mut forecast = Forecast::new(record.name.clone(), record.item_id.clone())
            .with_priority(record.priority);
        if let Some(customer_id) = &record.customer_id {
            forecast = forecast.with_customer(customer_id.clone());
        }
        if let Some(operation_id) = &record.operation_id {
            forecast = forecast.with_operation(operation_id.clone());
        }
        if !record.policy.is_empty() {
            forecast.set_policy(&record.policy.join(","))?;
        }

        match &record.calendar_id {
            Some(calendar_id) => {
                let calendar = calendars
                    .get(calendar_id)
                    .ok_or_else(|| ForecastError::NotFound(format!("日曆 {}", calendar_id)))?;
                forecast.attach_calendar(calendar)?;
            }
            None if !record.buckets.is_empty() => {
                return Err(ForecastError::Data(format!(
                    "預測 {} 有數量但沒有日曆",
                    record.name
                )));
            }
            None => {}
        }

        for bucket in &record.buckets {
            let end = bucket.end.unwrap_or(bucket.start);
            forecast.distribute_quantity(bucket.start, end, bucket.quantity)?;
        }

        tracing::debug!(
            "載入預測 {}，數量 {}",
            record.name,
            forecast.total_quantity()
        );
        self.insert_forecast(forecast)
    }
}
