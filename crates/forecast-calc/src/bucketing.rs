//! 時間分桶

use chrono::NaiveDate;
use forecast_core::{BucketCalendar, Demand};

use crate::forecast::ForecastBucket;

/// 預測時間桶的建立與查詢
pub struct BucketStore;

impl BucketStore {
    /// 依日曆建立時間桶（每個日曆時間桶一個，數量為零）
    pub fn build(forecast: &Demand, calendar: &BucketCalendar) -> Vec<ForecastBucket> {
        calendar
            .buckets()
            .iter()
            .map(|b| ForecastBucket::new(forecast, b.start, b.end, b.weight))
            .collect()
    }

    /// 二分搜尋包含指定日期的時間桶索引
    pub fn find_index(buckets: &[ForecastBucket], date: NaiveDate) -> Option<usize> {
        // 第一個開始日期晚於 date 的位置
        let idx = buckets.partition_point(|b| b.start <= date);
        if idx == 0 {
            return None;
        }

        let candidate = idx - 1;
        if buckets[candidate].contains(date) {
            Some(candidate)
        } else {
            None
        }
    }

    /// 與日期區間 [start, end) 重疊的時間桶索引範圍
    pub fn overlapping(
        buckets: &[ForecastBucket],
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::ops::Range<usize> {
        let first = buckets.partition_point(|b| b.end <= start);
        let last = buckets.partition_point(|b| b.start < end);
        first..last.max(first)
    }
}
