//! 集成測試

use chrono::NaiveDate;
use forecast::{
    logging, BucketCalendar, CalendarRegistry, Demand, DemandType, Forecast, ForecastError,
    ForecastModel, ForecastRecord, Hierarchy, HierarchySearchOrder, NettingConfig, NettingSolver,
    OrderEvent,
};
use rstest::rstest;
use rust_decimal::Decimal;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(values: &[i64]) -> Vec<Decimal> {
    values.iter().map(|&v| Decimal::from(v)).collect()
}

/// 2025-11-03 起的 4 週日曆
fn weekly_calendar(id: &str, weights: &[i64]) -> BucketCalendar {
    BucketCalendar::weekly(id.to_string(), date(2025, 11, 3), &dec(weights)).unwrap()
}

fn sales_order(item: &str, customer: Option<&str>, quantity: i64, due: NaiveDate) -> Demand {
    let order = Demand::new(item.to_string(), Decimal::from(quantity), due, DemandType::SalesOrder);
    match customer {
        Some(c) => order.with_customer(c.to_string()),
        None => order,
    }
}

fn totals(model: &ForecastModel, id: Uuid) -> Vec<Decimal> {
    model.forecast(id).unwrap().buckets().iter().map(|b| b.total_quantity()).collect()
}

fn net(model: &ForecastModel, id: Uuid) -> Vec<Decimal> {
    model.forecast(id).unwrap().buckets().iter().map(|b| b.net_quantity()).collect()
}

#[test]
fn test_end_to_end_weekly_forecast_netting() {
    logging::init_test();

    let mut model = ForecastModel::new();
    let id = model
        .insert_forecast(Forecast::new("FC-BIKE".to_string(), "BIKE".to_string()))
        .unwrap();
    model.attach_calendar(id, &weekly_calendar("W", &[1, 1, 2, 1])).unwrap();

    model
        .distribute_quantity(id, date(2025, 11, 3), date(2025, 12, 1), Decimal::from(100))
        .unwrap();
    assert_eq!(totals(&model, id), dec(&[20, 20, 40, 20]));

    // 第三週（11/17 ~ 11/24）的訂單
    let orders = vec![sales_order("BIKE", None, 15, date(2025, 11, 19))];
    let mut solver = NettingSolver::new(NettingConfig::default());
    let result = solver.solve(&mut model, &orders).unwrap();

    assert_eq!(result.records.len(), 1);
    assert!(result.unmatched.is_empty());
    assert_eq!(net(&model, id), dec(&[20, 20, 25, 20]));
    // 總數量不變
    assert_eq!(totals(&model, id), dec(&[20, 20, 40, 20]));
    assert_eq!(model.forecast(id).unwrap().total_quantity(), Decimal::from(100));

    // 計劃引擎看到的是時間桶的淨剩餘數量
    let planned: Vec<Decimal> = model.planning_demands().iter().map(|d| d.quantity).collect();
    assert_eq!(planned, dec(&[20, 20, 25, 20]));
}

#[test]
fn test_zero_weight_distribution_leaves_buckets_unchanged() {
    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, &weekly_calendar("W", &[0, 0, 3, 1])).unwrap();
    model
        .distribute_quantity(id, date(2025, 11, 17), date(2025, 11, 17), Decimal::from(9))
        .unwrap();

    let (start, end) = (date(2025, 11, 3), date(2025, 11, 17));
    let result = model.distribute_quantity(id, start, end, Decimal::from(50));

    assert!(matches!(result, Err(ForecastError::Data(_))));
    assert_eq!(totals(&model, id), dec(&[0, 0, 9, 0]));
}

#[test]
fn test_degenerate_range_overwrites() {
    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, &weekly_calendar("W", &[1, 1, 1, 1])).unwrap();

    let day = date(2025, 11, 11);
    model.distribute_quantity(id, day, day, Decimal::from(10)).unwrap();
    model.distribute_quantity(id, day, day, Decimal::from(25)).unwrap();

    assert_eq!(totals(&model, id), dec(&[0, 25, 0, 0]));
}

#[rstest]
#[case::customer_then_item(HierarchySearchOrder::CustomerThenItem, "FC-BIKE-RETAIL")]
#[case::item_then_customer(HierarchySearchOrder::ItemThenCustomer, "FC-FAMILY-SHOP")]
fn test_hierarchy_search_order(#[case] search_order: HierarchySearchOrder, #[case] expected: &str) {
    let items = Hierarchy::new().with_parent("BIKE", "BIKE-FAMILY").unwrap();
    let customers = Hierarchy::new().with_parent("SHOP", "RETAIL").unwrap();
    let mut model = ForecastModel::new().with_hierarchies(items, customers);

    // (I, C′) 與 (I′, C)
    let calendar = weekly_calendar("W", &[1, 1, 1, 1]);
    for (name, item, customer) in [
        ("FC-BIKE-RETAIL", "BIKE", "RETAIL"),
        ("FC-FAMILY-SHOP", "BIKE-FAMILY", "SHOP"),
    ] {
        let forecast =
            Forecast::new(name.to_string(), item.to_string()).with_customer(customer.to_string());
        let id = model.insert_forecast(forecast).unwrap();
        model.attach_calendar(id, &calendar).unwrap();
        model
            .distribute_quantity(id, date(2025, 11, 3), date(2025, 12, 1), Decimal::from(40))
            .unwrap();
    }

    let mut solver = NettingSolver::new(NettingConfig::new().with_search_order(search_order));
    let order = sales_order("BIKE", Some("SHOP"), 4, date(2025, 11, 4));
    let record = solver.net_order(&mut model, &order).unwrap();

    let matched = model.forecast(record.forecast_id).unwrap();
    assert_eq!(matched.name(), expected);
    assert_eq!(matched.net_quantity(), Decimal::from(36));
}

#[test]
fn test_netting_clamps_at_zero() {
    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, &weekly_calendar("W", &[1, 1, 1, 1])).unwrap();
    model
        .distribute_quantity(id, date(2025, 11, 3), date(2025, 11, 3), Decimal::from(5))
        .unwrap();

    let mut solver = NettingSolver::default();
    solver
        .net_order(&mut model, &sales_order("BIKE", None, 8, date(2025, 11, 6)))
        .unwrap();

    let bucket = model.forecast(id).unwrap().bucket_at(date(2025, 11, 6)).unwrap();
    assert_eq!(bucket.net_quantity(), Decimal::ZERO);
    assert_eq!(bucket.demand.quantity, Decimal::ZERO);
}

#[test]
fn test_calendar_reattachment_guard() {
    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, &weekly_calendar("A", &[1, 1, 1, 1])).unwrap();
    model
        .distribute_quantity(id, date(2025, 11, 3), date(2025, 11, 10), Decimal::from(7))
        .unwrap();

    let calendar_b = BucketCalendar::new("B".to_string())
        .with_bucket(date(2025, 11, 1), date(2025, 12, 1), Decimal::ONE)
        .unwrap();
    let result = model.attach_calendar(id, &calendar_b);

    assert!(matches!(result, Err(ForecastError::State(_))));
    let forecast = model.forecast(id).unwrap();
    assert_eq!(forecast.calendar_id(), Some("A"));
    assert_eq!(forecast.buckets().len(), 4);
    assert_eq!(totals(&model, id), dec(&[7, 0, 0, 0]));
}

#[test]
fn test_index_consistency_after_customer_change() {
    let mut model = ForecastModel::new();
    let id = model
        .insert_forecast(
            Forecast::new("FC".to_string(), "BIKE".to_string()).with_customer("OLD".to_string()),
        )
        .unwrap();

    model.set_customer(id, Some("NEW".to_string())).unwrap();

    assert!(model.forecasts_for("BIKE", Some("OLD")).is_empty());
    let found = model.forecasts_for("BIKE", Some("NEW"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), id);
}

#[test]
fn test_calendar_lifecycle_veto() {
    let mut calendars = CalendarRegistry::new();
    calendars.insert(weekly_calendar("W", &[1, 1, 1, 1]));

    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, calendars.get("W").unwrap()).unwrap();

    assert!(matches!(calendars.remove("W", &model), Err(ForecastError::InUse(_))));

    model.remove_forecast(id).unwrap();
    assert!(calendars.remove("W", &model).is_ok());
    assert!(calendars.is_empty());
}

#[test]
fn test_automatic_netting_follows_order_changes() {
    let mut model = ForecastModel::new();
    let id = model.insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string())).unwrap();
    model.attach_calendar(id, &weekly_calendar("W", &[1, 1, 2, 1])).unwrap();
    model
        .distribute_quantity(id, date(2025, 11, 3), date(2025, 12, 1), Decimal::from(100))
        .unwrap();

    let config = NettingConfig::from_json_str(r#"{ "automatic": true }"#).unwrap();
    let mut solver = NettingSolver::new(config);

    let mut order = sales_order("BIKE", None, 15, date(2025, 11, 19));
    solver.on_order_event(&mut model, OrderEvent::Created(&order)).unwrap();
    assert_eq!(net(&model, id), dec(&[20, 20, 25, 20]));

    order.quantity = Decimal::from(5);
    solver.on_order_event(&mut model, OrderEvent::Changed(&order)).unwrap();
    assert_eq!(net(&model, id), dec(&[20, 20, 35, 20]));

    solver.on_order_event(&mut model, OrderEvent::Deleted(order.id)).unwrap();
    assert_eq!(net(&model, id), dec(&[20, 20, 40, 20]));

    // 沒有匹配預測的訂單獨立存在
    let other = sales_order("HELMET", None, 3, date(2025, 11, 19));
    let outcome = solver.on_order_event(&mut model, OrderEvent::Created(&other)).unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_manual_solve_matches_automatic_result() {
    let build = || {
        let mut model = ForecastModel::new();
        let id = model
            .insert_forecast(Forecast::new("FC".to_string(), "BIKE".to_string()))
            .unwrap();
        model.attach_calendar(id, &weekly_calendar("W", &[1, 1, 2, 1])).unwrap();
        model
            .distribute_quantity(id, date(2025, 11, 3), date(2025, 12, 1), Decimal::from(100))
            .unwrap();
        (model, id)
    };
    let orders = vec![
        sales_order("BIKE", None, 12, date(2025, 11, 26)),
        sales_order("BIKE", None, 30, date(2025, 11, 3)),
        sales_order("BIKE", None, 9, date(2025, 11, 12)),
    ];

    let (mut manual_model, manual_id) = build();
    NettingSolver::default().solve(&mut manual_model, &orders).unwrap();

    let (mut auto_model, auto_id) = build();
    let mut solver = NettingSolver::new(NettingConfig::new().with_automatic(true));
    for order in &orders {
        solver.on_order_event(&mut auto_model, OrderEvent::Created(order)).unwrap();
    }

    assert_eq!(net(&manual_model, manual_id), net(&auto_model, auto_id));
    assert_eq!(net(&manual_model, manual_id), dec(&[0, 11, 40, 8]));
}

#[test]
fn test_save_and_load_forecast() {
    let mut calendars = CalendarRegistry::new();
    calendars.insert(weekly_calendar("W", &[1, 1, 2, 1]));

    let mut model = ForecastModel::new();
    let id = model
        .insert_forecast(
            Forecast::new("FC".to_string(), "BIKE".to_string())
                .with_customer("SHOP".to_string())
                .with_operation("SHIP".to_string()),
        )
        .unwrap();
    model.attach_calendar(id, calendars.get("W").unwrap()).unwrap();
    model
        .distribute_quantity(id, date(2025, 11, 3), date(2025, 12, 1), Decimal::from(100))
        .unwrap();

    let json = model.save_forecast(id).unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["calendar_id"], "W");
    assert_eq!(value["buckets"].as_array().unwrap().len(), 4);

    let mut restored = ForecastModel::new();
    let restored_id = restored
        .load_forecast(&ForecastRecord::from_json(&json).unwrap(), &calendars)
        .unwrap();

    assert_eq!(totals(&restored, restored_id), dec(&[20, 20, 40, 20]));
    assert_eq!(restored.forecast(restored_id).unwrap().operation_id(), Some("SHIP"));
    assert_eq!(restored.forecasts_for("BIKE", Some("SHOP")).len(), 1);
}
