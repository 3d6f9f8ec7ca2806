pub mod chart;
pub mod price_data;

pub use chart::*;
pub use price_data::*;
