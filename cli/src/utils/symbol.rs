use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AnalystError, Result};

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Tickers, indices (^GSPC), futures (ES=F) and share classes (BRK-B, BRK.B)
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9.^=\-]{1,15}$").expect("symbol pattern is valid"))
}

/// Trim, validate and upper-case a user-entered ticker symbol.
pub fn normalize_symbol(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AnalystError::InvalidInput("enter a stock ticker, e.g. AAPL".to_string()));
    }
    if !symbol_pattern().is_match(trimmed) {
        return Err(AnalystError::InvalidInput(format!("'{}' is not a valid ticker symbol", trimmed)));
    }
    Ok(trimmed.to_uppercase())
}
