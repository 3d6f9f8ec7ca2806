//! Offline Chart Example
//!
//! Builds a synthetic price file, loads it through the CSV source and writes
//! a chart with every indicator overlaid. No network access needed.

use chartanalyst::prelude::*;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    chartanalyst::init_logger()?;

    println!("📈 Offline Chart Example");
    println!("{}", "=".repeat(60));

    let data_dir = tempfile::tempdir()?;
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for i in 0..90 {
        let close = 180.0 + (i as f64 / 9.0).sin() * 12.0 + i as f64 * 0.15;
        csv.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},{}\n",
            start + chrono::Duration::days(i),
            close - 1.1,
            close + 2.0,
            close - 2.4,
            close,
            40_000_000 + (i * 731_000) % 9_000_000
        ));
    }
    std::fs::write(data_dir.path().join("DEMO.csv"), csv)?;

    let dashboard = DashboardBuilder::new()
        .with_data_source(DataSourceKind::Csv)
        .with_csv_dir(data_dir.path())
        .build()?;

    let mut session = Session::new();
    let range = DateRange::new(start, start + chrono::Duration::days(120))?;
    let summary = dashboard.fetch(&mut session, "demo", range).await?;
    println!("✅ Loaded {} bars for {}", summary.observations, summary.symbol);

    let kinds = IndicatorKind::ALL;
    for reading in dashboard.latest_values(&session, &kinds)? {
        println!("   {:<22} {:?}", reading.name, reading.value);
    }

    let view = dashboard.render(&session, &kinds)?;
    println!("✅ Chart '{}' has {} layers", view.chart.title(), view.chart.layers().len());

    let png = dashboard.snapshot(&session, &kinds)?;
    std::fs::write("demo_chart.png", &png)?;
    println!("✅ Wrote demo_chart.png ({} bytes)", png.len());

    Ok(())
}
