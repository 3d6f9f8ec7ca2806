use std::{path::PathBuf, time::Duration};

use chartanalyst::{
    api::{DashboardBuilder, DataSourceKind},
    indicators::parse_selection,
    models::DateRange,
    session::Session,
    utils::{format_duration, init_logger, parse_date, Timer},
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chartanalyst")]
#[command(about = "Candlestick charts with technical indicators, read by a vision model")]
pub struct Cli {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Market data source (yahoo or csv)
    #[arg(long, env = "DATA_SOURCE", default_value = "yahoo", global = true)]
    pub data_source: String,
    /// Directory of <SYMBOL>.csv files for the csv source
    #[arg(long, env = "CSV_DATA_DIR", default_value = "./market_data", global = true)]
    pub csv_dir: PathBuf,
    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434", global = true)]
    pub ollama_url: String,
    /// Vision model name
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2-vision", global = true)]
    pub model: String,
    /// Seconds to wait for the model before giving up
    #[arg(long, env = "MODEL_TIMEOUT_SECS", default_value_t = 120, global = true)]
    pub model_timeout: u64,
}

/// Symbol, dates and indicator selection shared by every subcommand.
#[derive(Args)]
pub struct ChartArgs {
    /// Ticker symbol, e.g. AAPL
    #[arg(short, long)]
    pub symbol: String,
    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2023-02-01")]
    pub start: String,
    /// End date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-04-03")]
    pub end: String,
    /// Comma-separated indicators: sma20, ema20, bollinger20, vwap
    #[arg(short, long, default_value = "sma20")]
    pub indicators: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the chart to a PNG file
    Chart {
        #[command(flatten)]
        chart: ChartArgs,
        /// Output file
        #[arg(short, long, default_value = "chart.png")]
        output: PathBuf,
        /// Image width in pixels
        #[arg(long, env = "CHART_WIDTH", default_value_t = 1280)]
        width: u32,
        /// Image height in pixels
        #[arg(long, env = "CHART_HEIGHT", default_value_t = 720)]
        height: u32,
    },
    /// Print the latest value of each selected indicator
    Indicators {
        #[command(flatten)]
        chart: ChartArgs,
    },
    /// Ask the vision model for a buy/hold/sell reading of the chart
    Analyze {
        #[command(flatten)]
        chart: ChartArgs,
    },
}

impl ChartArgs {
    fn range(&self) -> anyhow::Result<DateRange> {
        Ok(DateRange::new(parse_date(&self.start)?, parse_date(&self.end)?)?)
    }
}

fn builder(sources: &SourceArgs) -> anyhow::Result<DashboardBuilder> {
    let kind: DataSourceKind = sources.data_source.parse()?;
    Ok(DashboardBuilder::new()
        .with_data_source(kind)
        .with_csv_dir(&sources.csv_dir)
        .with_ollama_url(&sources.ollama_url)
        .with_ollama_model(&sources.model)
        .with_model_timeout(Duration::from_secs(sources.model_timeout)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let cli = Cli::parse();
    let timer = Timer::start("command");
    let mut session = Session::new();

    match cli.command {
        Commands::Chart {
            chart,
            output,
            width,
            height,
        } => {
            let dashboard = builder(&cli.sources)?.with_chart_size(width, height).build()?;
            let kinds = parse_selection(&chart.indicators)?;
            let summary = dashboard.fetch(&mut session, &chart.symbol, chart.range()?).await?;

            let view = dashboard.render(&session, &kinds)?;
            for notice in &view.notices {
                eprintln!("⚠️  {}", notice);
            }
            let png = dashboard.export(&view.chart)?;
            std::fs::write(&output, &png)?;

            println!(
                "📈 {} ({} bars) written to {} ({} bytes)",
                summary.symbol,
                summary.observations,
                output.display(),
                png.len()
            );
        }
        Commands::Indicators { chart } => {
            let dashboard = builder(&cli.sources)?.build()?;
            let kinds = parse_selection(&chart.indicators)?;
            let summary = dashboard.fetch(&mut session, &chart.symbol, chart.range()?).await?;

            println!(
                "📊 {} {} → {} ({} bars, last close {:.2})",
                summary.symbol,
                summary.range.start,
                summary.range.end,
                summary.observations,
                summary.last_close.unwrap_or_default()
            );
            for reading in dashboard.latest_values(&session, &kinds)? {
                match (reading.date, reading.value) {
                    (Some(date), Some(value)) => println!("  {:<22} {:>12.4}  ({})", reading.name, value, date),
                    _ => println!("  {:<22} {:>12}", reading.name, "undefined"),
                }
            }
        }
        Commands::Analyze { chart } => {
            let dashboard = builder(&cli.sources)?.build()?;
            let kinds = parse_selection(&chart.indicators)?;
            dashboard.fetch(&mut session, &chart.symbol, chart.range()?).await?;

            println!("🤖 Asking {} to read the chart...", dashboard.model_name());
            let response = dashboard.analyze(&session, &kinds).await?;
            println!("\n{}\n{}\n{}", "=".repeat(80), response.text, "=".repeat(80));
        }
    }

    println!("✅ Done in {}", format_duration(timer.elapsed_ms()));
    Ok(())
}
