//! 分桶日曆模型

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ForecastError, Result};

/// 日曆時間桶 [start, end)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarBucket {
    /// 開始日期（含）
    pub start: NaiveDate,

    /// 結束日期（不含）
    pub end: NaiveDate,

    /// 權重（用於分配預測數量）
    pub weight: Decimal,
}

impl CalendarBucket {
    /// 創建新的日曆時間桶
    pub fn new(start: NaiveDate, end: NaiveDate, weight: Decimal) -> Self {
        Self { start, end, weight }
    }

    /// 檢查日期是否落在此時間桶內
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// 分桶日曆
///
/// 時間桶依開始日期排序且互不重疊，由 [`BucketCalendar::add_bucket`] 保證。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCalendar {
    /// 日曆ID
    pub calendar_id: String,

    /// 時間桶列表
    buckets: Vec<CalendarBucket>,
}

impl BucketCalendar {
    /// 創建空的分桶日曆
    pub fn new(calendar_id: String) -> Self {
        Self {
            calendar_id,
            buckets: Vec::new(),
        }
    }

    /// 創建連續的週桶日曆，每個權重對應一週
    ///
    /// # 範例
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use forecast_core::BucketCalendar;
    /// use rust_decimal::Decimal;
    ///
    /// let weights = [1, 1, 2, 1].map(Decimal::from);
    /// let calendar = BucketCalendar::weekly(
    ///     "WEEKS".to_string(),
    ///     NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
    ///     &weights,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(calendar.buckets().len(), 4);
    /// ```
    pub fn weekly(
        calendar_id: String,
        first_start: NaiveDate,
        weights: &[Decimal],
    ) -> Result<Self> {
        let mut calendar = Self::new(calendar_id);
        let mut start = first_start;

        for &weight in weights {
            let end = start
                .checked_add_signed(Duration::weeks(1))
                .ok_or_else(|| ForecastError::Data(format!("日期溢出: {}", start)))?;
            calendar.add_bucket(start, end, weight)?;
            start = end;
        }

        Ok(calendar)
    }

    /// 建構器模式：添加時間桶
    pub fn with_bucket(
        mut self,
        start: NaiveDate,
        end: NaiveDate,
        weight: Decimal,
    ) -> Result<Self> {
        self.add_bucket(start, end, weight)?;
        Ok(self)
    }

    /// 添加時間桶（必須接在最後一個時間桶之後）
    pub fn add_bucket(&mut self, start: NaiveDate, end: NaiveDate, weight: Decimal) -> Result<()> {
        if start >= end {
            return Err(ForecastError::Data(format!(
                "日曆 {} 的時間桶範圍無效: {} ~ {}",
                self.calendar_id, start, end
            )));
        }

        if weight < Decimal::ZERO {
            return Err(ForecastError::Data(format!(
                "日曆 {} 的時間桶權重不可為負: {}",
                self.calendar_id, weight
            )));
        }

        if let Some(last) = self.buckets.last() {
            if start < last.end {
                return Err(ForecastError::Data(format!(
                    "日曆 {} 的時間桶重疊或未排序: {} 早於 {}",
                    self.calendar_id, start, last.end
                )));
            }
        }

        self.buckets.push(CalendarBucket::new(start, end, weight));
        Ok(())
    }

    /// 獲取所有時間桶
    pub fn buckets(&self) -> &[CalendarBucket] {
        &self.buckets
    }
}

/// 日曆使用查詢能力
///
/// 日曆擁有者在刪除日曆前必須同步詢問此能力。
pub trait CalendarUsage {
    /// 日曆是否仍被未初始化的預測引用
    fn calendar_in_use(&self, calendar_id: &str) -> bool;
}

/// 日曆註冊表
#[derive(Debug, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<String, BucketCalendar>,
}

impl CalendarRegistry {
    /// 創建空的註冊表
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊日曆，返回被取代的舊日曆
    pub fn insert(&mut self, calendar: BucketCalendar) -> Option<BucketCalendar> {
        self.calendars.insert(calendar.calendar_id.clone(), calendar)
    }

    /// 查詢日曆
    pub fn get(&self, calendar_id: &str) -> Option<&BucketCalendar> {
        self.calendars.get(calendar_id)
    }

    /// 刪除日曆
    ///
    /// 若 `usage` 回報日曆仍在使用中，拒絕刪除並返回 [`ForecastError::InUse`]。
    pub fn remove(
        &mut self,
        calendar_id: &str,
        usage: &dyn CalendarUsage,
    ) -> Result<BucketCalendar> {
        if usage.calendar_in_use(calendar_id) {
            return Err(ForecastError::InUse(format!(
                "日曆 {} 仍被未輸入數量的預測使用",
                calendar_id
            )));
        }

        self.calendars
            .remove(calendar_id)
            .ok_or_else(|| ForecastError::NotFound(format!("日曆 {}", calendar_id)))
    }

    /// 日曆數量
    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    /// 是否為空
    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }
}
