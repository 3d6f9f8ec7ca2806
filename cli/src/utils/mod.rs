pub mod date;
pub mod logger;
pub mod symbol;

pub use date::*;
pub use logger::*;
pub use symbol::*;
