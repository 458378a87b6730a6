use anyhow::Result;
use serde_json::{json, Value};
use std::{fs, path::Path};
use tab2json::{
    coerce::{self, CoercionDirective, ColumnOutcome, DirectiveOptions, EpochUnit, OutputMode},
    json::{render, write_json, Orient},
    table::{load_table, NativeKind, Table},
};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tab2json=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

const ORDERS: &str = "\
Order ID,Order Date,Ship Date,Notes,Amount,Created At
1,03/04/2024,2024-03-05,fragile,10.5,2024-03-01T10:00:00+03:00
2,13/04/2024,2024-04-15, ,20,2024-03-01T07:00:00Z
";

fn load_orders(dir: &Path) -> Result<Table> {
    let path = dir.join("orders.csv");
    fs::write(&path, ORDERS)?;
    let mut table = load_table(&path)?;
    table.normalize_headers();
    table.null_blank_text();
    Ok(table)
}

#[test]
fn orders_csv_to_iso_records() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let mut table = load_orders(dir.path())?;

    let directive = CoercionDirective::default().with_dayfirst(true);
    let report = coerce::run(&mut table, &directive);

    let out = render(&table, Orient::Records);
    assert_eq!(
        out,
        json!([
            {
                "order_id": 1,
                "order_date": "2024-04-03T00:00:00",
                "ship_date": "2024-03-05T00:00:00",
                "notes": "fragile",
                "amount": 10.5,
                "created_at": "2024-03-01T07:00:00"
            },
            {
                "order_id": 2,
                "order_date": "2024-04-13T00:00:00",
                "ship_date": "2024-04-15T00:00:00",
                "notes": null,
                "amount": 20.0,
                "created_at": "2024-03-01T07:00:00"
            }
        ])
    );
    assert_eq!(
        report.outcome("order_id"),
        Some(&ColumnOutcome::Skipped(NativeKind::Numeric))
    );
    assert!(matches!(
        report.outcome("notes"),
        Some(ColumnOutcome::BelowThreshold { parsed: 0, .. })
    ));
    Ok(())
}

#[test]
fn epoch_output_with_forced_columns() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let mut table = load_orders(dir.path())?;

    let directive = CoercionDirective::from_options(&DirectiveOptions {
        date_format: Some("epoch".into()),
        epoch_unit: Some("s".into()),
        date_columns: Some(coerce::ColumnList::Csv("notes,order_id,order_date".into())),
        auto_dates: Some(false),
        ..Default::default()
    })?;
    assert_eq!(directive.mode(), OutputMode::Epoch(EpochUnit::Seconds));
    let report = coerce::run(&mut table, &directive);

    // notes has no dates, order_id is numeric: both untouched
    assert_eq!(
        report.outcome("notes"),
        Some(&ColumnOutcome::NoParse { non_null: 1 })
    );
    assert_eq!(
        report.outcome("order_id"),
        Some(&ColumnOutcome::Skipped(NativeKind::Numeric))
    );
    // the CSV reader types created_at as a timestamp, so it is formatted even
    // with auto detection off
    assert_eq!(
        render(&table, Orient::Records)[0]["created_at"],
        json!(1_709_276_400)
    );

    let out = render(&table, Orient::Records);
    // 2024-03-04T00:00:00Z under month-first reading
    assert_eq!(out[0]["order_date"], json!(1_709_510_400));
    assert_eq!(out[0]["ship_date"], json!(1_709_596_800));
    assert_eq!(out[0]["notes"], json!("fragile"));
    assert_eq!(out[1]["order_id"], json!(2));
    Ok(())
}

#[test]
fn table_orient_file_on_disk() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let mut table = load_orders(dir.path())?;
    coerce::run(&mut table, &CoercionDirective::default());

    let path = dir.path().join("orders.json");
    write_json(&table, Orient::Table, &path)?;
    let doc: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;

    let names: Vec<&str> = doc["schema"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["index", "order_id", "order_date", "ship_date", "notes", "amount", "created_at"]
    );
    assert_eq!(doc["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(doc["data"][1]["index"], json!(1));
    // month-first: 13/04 is only valid as 13 April
    assert_eq!(doc["data"][1]["order_date"], json!("2024-04-13T00:00:00"));
    Ok(())
}

#[test]
fn bad_parse_format_fails_before_any_work() {
    let err = CoercionDirective::from_options(&DirectiveOptions {
        date_parse_format: Some("%d/%m/%K".into()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(err.to_string().contains("%d/%m/%K"));
}
