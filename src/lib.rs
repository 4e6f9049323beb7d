//! # Forecast
//!
//! 銷售預測的時間桶分配與階層式預測沖銷
//!
//! - [`forecast_core`]：需求、日曆、階層與沖銷設定
//! - [`forecast_calc`]：預測模型、數量分配、沖銷求解與保存/載入

pub mod logging;

pub use forecast_calc::{
    BucketRecord, Forecast, ForecastBucket, ForecastModel, ForecastRecord, NettingRecord,
    NettingResult, NettingSolver, OrderEvent,
};
pub use forecast_core::{
    BucketCalendar, CalendarRegistry, Demand, DemandPolicy, DemandType, ForecastError, Hierarchy,
    HierarchySearchOrder, NettingConfig, Result,
};
