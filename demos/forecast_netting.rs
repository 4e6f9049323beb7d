//! # 腳踏車銷售預測沖銷範例
//!
//! - 週日曆（權重 1, 1, 2, 1）
//! - 客戶群組層級的預測，數量 100
//! - 子客戶的銷售訂單沖銷預測
//! - 自動沖銷模式下修改與刪除訂單

use chrono::NaiveDate;
use forecast::{
    logging, BucketCalendar, CalendarRegistry, Demand, DemandType, Forecast, ForecastModel,
    Hierarchy, NettingConfig, NettingSolver, OrderEvent,
};
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| anyhow::anyhow!("無效日期 {}-{}-{}", y, m, d))
}

fn main() -> anyhow::Result<()> {
    logging::init();

    println!("===== 銷售預測沖銷範例 =====\n");

    // 步驟 1: 建立週日曆
    println!("[1] 建立週日曆");
    let weights = [1, 1, 2, 1].map(Decimal::from);
    let mut calendars = CalendarRegistry::new();
    calendars.insert(BucketCalendar::weekly("WEEKLY".to_string(), date(2025, 11, 3)?, &weights)?);
    println!("    時間桶: 4 週，權重 {:?}\n", weights);

    // 步驟 2: 客戶與物料階層
    println!("[2] 建立階層");
    let customers = Hierarchy::new().with_parent("SHOP-TAIPEI", "RETAIL")?;
    let items = Hierarchy::new().with_parent("BIKE-RED", "BIKE")?;
    println!("    SHOP-TAIPEI → RETAIL，BIKE-RED → BIKE\n");

    // 步驟 3: 建立預測並分配數量
    println!("[3] 建立預測");
    let mut model = ForecastModel::new().with_hierarchies(items, customers);
    let forecast = Forecast::new("FC-BIKE-RETAIL".to_string(), "BIKE".to_string())
        .with_customer("RETAIL".to_string());
    let forecast_id = model.insert_forecast(forecast)?;
    let calendar = calendars
        .get("WEEKLY")
        .ok_or_else(|| anyhow::anyhow!("找不到日曆 WEEKLY"))?;
    model.attach_calendar(forecast_id, calendar)?;
    let (start, end) = (date(2025, 11, 3)?, date(2025, 12, 1)?);
    model.distribute_quantity(forecast_id, start, end, Decimal::from(100))?;
    print_buckets(&model, forecast_id);

    // 步驟 4: 批次沖銷
    println!("[4] 批次沖銷");
    let sales_order = |name: &str, item: &str, quantity: i64, due: NaiveDate| {
        Demand::new(item.to_string(), Decimal::from(quantity), due, DemandType::SalesOrder)
            .with_name(name.to_string())
    };
    let orders = vec![
        sales_order("SO-001", "BIKE-RED", 15, date(2025, 11, 18)?)
            .with_customer("SHOP-TAIPEI".to_string()),
        sales_order("SO-002", "BIKE-RED", 30, date(2025, 11, 5)?)
            .with_customer("SHOP-TAIPEI".to_string()),
        sales_order("SO-003", "HELMET", 8, date(2025, 11, 5)?),
    ];

    let mut solver = NettingSolver::new(NettingConfig::default());
    let result = solver.solve(&mut model, &orders)?;
    println!(
        "    沖銷 {} 筆（數量 {}），未匹配 {} 筆",
        result.records.len(),
        result.netted_quantity(),
        result.unmatched.len()
    );
    print_buckets(&model, forecast_id);

    // 步驟 5: 自動沖銷
    println!("[5] 自動沖銷：修改 SO-001 數量為 25，再刪除 SO-002");
    solver.set_automatic(true);
    let mut changed = orders[0].clone();
    changed.quantity = Decimal::from(25);
    solver.on_order_event(&mut model, OrderEvent::Changed(&changed))?;
    solver.on_order_event(&mut model, OrderEvent::Deleted(orders[1].id))?;
    print_buckets(&model, forecast_id);

    // 步驟 6: 保存
    println!("[6] 保存預測");
    let record = model.save_forecast(forecast_id)?;
    println!("{}", record.to_json()?);

    Ok(())
}

fn print_buckets(model: &ForecastModel, forecast_id: uuid::Uuid) {
    let Some(forecast) = model.forecast(forecast_id) else {
        return;
    };

    println!("    {:<12} {:>8} {:>8} {:>8}", "開始", "總數", "已沖銷", "淨剩餘");
    for bucket in forecast.buckets() {
        println!(
            "    {:<12} {:>8} {:>8} {:>8}",
            bucket.start.to_string(),
            bucket.total_quantity(),
            bucket.consumed_quantity(),
            bucket.net_quantity()
        );
    }
    println!();
}
