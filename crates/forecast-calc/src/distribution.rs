//! 預測數量分配

use chrono::NaiveDate;
use forecast_core::{ForecastError, Result};
use rust_decimal::Decimal;

use crate::bucketing::BucketStore;
use crate::forecast::ForecastBucket;

/// 預測數量分配器
pub struct DistributionEngine;

impl DistributionEngine {
    /// 將數量分配到日期區間 [start, end) 內的時間桶
    ///
    /// 規則：
    /// - `start == end`：找到包含該日期的時間桶，直接設置其總數量（絕對值，非累加）。
    /// - 否則：依「權重 × 重疊天數」的比例累加到所有重疊的時間桶。
    ///   若所有重疊時間桶的比例總和為零（權重皆為零或沒有重疊），
    ///   或計算溢位，返回 [`ForecastError::Data`]，不修改任何時間桶。
    ///
    /// 數量可以為負（用於調整）。各時間桶增量的總和精確等於 `quantity`。
    pub fn distribute(
        buckets: &mut [ForecastBucket],
        start: NaiveDate,
        end: NaiveDate,
        quantity: Decimal,
    ) -> Result<()> {
        if start > end {
            return Err(ForecastError::Data(format!("無效的日期區間: {} ~ {}", start, end)));
        }

        if start == end {
            let idx = BucketStore::find_index(buckets, start).ok_or_else(|| {
                ForecastError::NotFound(format!("日期 {} 沒有對應的時間桶", start))
            })?;
            buckets[idx].set_total_quantity(quantity);
            return Ok(());
        }

        let mut shares = Vec::new();
        for idx in BucketStore::overlapping(buckets, start, end) {
            let share = Self::share(&buckets[idx], start, end)?;
            if share > Decimal::ZERO {
                shares.push((idx, share));
            }
        }

        // 先驗證再寫入
        let total_share = shares
            .iter()
            .try_fold(Decimal::ZERO, |acc, (_, share)| acc.checked_add(*share))
            .ok_or_else(|| Self::overflow(start, end, quantity))?;
        if total_share.is_zero() {
            return Err(ForecastError::Data(format!(
                "區間 {} ~ {} 沒有可放置數量 {} 的時間桶",
                start, end, quantity
            )));
        }

        let increments = Self::allocate(quantity, &shares, total_share)
            .ok_or_else(|| Self::overflow(start, end, quantity))?;
        let totals = increments
            .iter()
            .map(|&(idx, increment)| {
                buckets[idx]
                    .total_quantity()
                    .checked_add(increment)
                    .map(|total| (idx, total))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Self::overflow(start, end, quantity))?;

        for (idx, total) in totals {
            buckets[idx].set_total_quantity(total);
        }

        tracing::debug!(
            "分配數量 {} 到區間 {} ~ {}，時間桶 {} 個",
            quantity,
            start,
            end,
            shares.len()
        );
        Ok(())
    }

    /// 時間桶的分配比例 = 權重 × 重疊天數
    fn share(bucket: &ForecastBucket, start: NaiveDate, end: NaiveDate) -> Result<Decimal> {
        let overlap_start = bucket.start.max(start);
        let overlap_end = bucket.end.min(end);
        let days = (overlap_end - overlap_start).num_days().max(0);

        bucket.weight.checked_mul(Decimal::from(days)).ok_or_else(|| {
            ForecastError::Data(format!(
                "時間桶 {} 的分配比例溢位: 權重 {} × {} 天",
                bucket.start, bucket.weight, days
            ))
        })
    }

    /// 按比例拆分數量，最後一個時間桶吸收餘數；溢位時返回 `None`
    fn allocate(
        quantity: Decimal,
        shares: &[(usize, Decimal)],
        total_share: Decimal,
    ) -> Option<Vec<(usize, Decimal)>> {
        let mut increments = Vec::with_capacity(shares.len());
        let mut allocated = Decimal::ZERO;

        for (pos, &(idx, share)) in shares.iter().enumerate() {
            let increment = if pos + 1 == shares.len() {
                quantity.checked_sub(allocated)?
            } else {
                // 比例不大於 1，相乘不會超過 quantity
                quantity.checked_mul(share.checked_div(total_share)?)?
            };
            allocated = allocated.checked_add(increment)?;
            increments.push((idx, increment));
        }

        Some(increments)
    }

    fn overflow(start: NaiveDate, end: NaiveDate, quantity: Decimal) -> ForecastError {
        ForecastError::Data(format!(
            "分配數量 {} 到區間 {} ~ {} 時數值溢位",
            quantity, start, end
        ))
    }
}
