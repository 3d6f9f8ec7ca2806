use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize logging; `RUST_LOG` overrides the default `chartanalyst=info`.
pub fn init_logger() -> anyhow::Result<()> {
    let timer = ChronoUtc::rfc_3339();

    let format_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(timer)
        .compact();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chartanalyst=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format_layer)
        .try_init()?;

    Ok(())
}

/// Logger carrying a context tag, e.g. `MARKET_DATA` or `ASK_AI`.
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
        }
    }

    pub fn info(&self, message: &str) {
        info!("{}: {}", self.context, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}: {}", self.context, message);
    }

    pub fn warn_with_error(&self, message: &str, error: &dyn std::error::Error) {
        warn!("{}: {}: {}", self.context, message, error);
    }

    pub fn debug(&self, message: &str) {
        debug!("{}: {}", self.context, message);
    }
}

/// [FETCH] - market data lookups
pub fn log_fetch(message: &str) {
    info!("FETCH: {}", message);
}

/// [RENDER] - chart assembly and snapshots
pub fn log_render(message: &str) {
    info!("RENDER: {}", message);
}

/// [ANALYSIS] - vision model round trips
pub fn log_analysis(message: &str) {
    info!("ANALYSIS: {}", message);
}

/// Format a date range for logging.
pub fn format_date_range_info(range: &crate::models::DateRange) -> String {
    format!(
        "{} to {} ({} days)",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d"),
        range.num_days()
    )
}

/// Performance timing helper
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        Self {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn log_elapsed(&self, context: &str) {
        info!("{}: {} completed in {:.1}ms", context, self.name, self.elapsed_ms());
    }
}
