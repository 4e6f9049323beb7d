//! 客戶/物料階層

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ForecastError, Result};

/// 階層（子節點 → 父節點）
///
/// 客戶與物料各使用一個實例。未登記父節點的ID視為根節點。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    parents: HashMap<String, String>,
}

impl Hierarchy {
    /// 創建空的階層
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置父節點
    pub fn with_parent(mut self, child: &str, parent: &str) -> Result<Self> {
        self.set_parent(child, parent)?;
        Ok(self)
    }

    /// 設置父節點（會形成循環時拒絕）
    pub fn set_parent(&mut self, child: &str, parent: &str) -> Result<()> {
        if self.ancestors(parent).iter().any(|a| a == child) {
            return Err(ForecastError::Data(format!(
                "階層循環: {} 已是 {} 的上層",
                child, parent
            )));
        }

        self.parents.insert(child.to_string(), parent.to_string());
        Ok(())
    }

    /// 移除父節點，返回原父節點
    pub fn remove_parent(&mut self, child: &str) -> Option<String> {
        self.parents.remove(child)
    }

    /// 獲取父節點
    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// 獲取自身及所有上層（由近到遠）
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = vec![id.to_string()];
        let mut current = id;

        while let Some(parent) = self.parent(current) {
            chain.push(parent.to_string());
            current = parent;
        }

        chain
    }
}
