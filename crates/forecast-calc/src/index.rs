//! 預測索引（物料, 客戶）→ 預測

use std::collections::HashMap;

use uuid::Uuid;

/// 索引鍵（物料, 客戶）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForecastKey {
    pub item_id: String,
    pub customer_id: Option<String>,
}

impl ForecastKey {
    pub fn new(item_id: &str, customer_id: Option<&str>) -> Self {
        Self {
            item_id: item_id.to_string(),
            customer_id: customer_id.map(str::to_string),
        }
    }
}

/// 預測索引
///
/// 同一個鍵下的預測依註冊順序保存。
#[derive(Debug, Default)]
pub struct ForecastIndex {
    entries: HashMap<ForecastKey, Vec<Uuid>>,
}

impl ForecastIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊預測
    pub fn insert(&mut self, key: ForecastKey, forecast_id: Uuid) {
        let ids = self.entries.entry(key).or_default();
        if !ids.contains(&forecast_id) {
            ids.push(forecast_id);
        }
    }

    /// 移除預測，返回是否存在
    pub fn remove(&mut self, key: &ForecastKey, forecast_id: Uuid) -> bool {
        let Some(ids) = self.entries.get_mut(key) else {
            return false;
        };

        let before = ids.len();
        ids.retain(|id| *id != forecast_id);
        let removed = ids.len() != before;

        if ids.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    /// 將預測從舊鍵移到新鍵
    pub fn relocate(&mut self, old_key: &ForecastKey, new_key: ForecastKey, forecast_id: Uuid) {
        self.remove(old_key, forecast_id);
        self.insert(new_key, forecast_id);
    }

    /// 查詢鍵下的所有預測（註冊順序）
    pub fn get(&self, key: &ForecastKey) -> &[Uuid] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 索引內的預測總數
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
