pub mod csv_service;
pub mod market_data;
pub mod yahoo_service;

pub use csv_service::*;
pub use market_data::*;
pub use yahoo_service::*;
