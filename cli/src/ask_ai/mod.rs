pub mod handler;
pub mod ollama;
pub mod templates;
pub mod types;

pub use handler::*;
pub use ollama::*;
pub use templates::*;
pub use types::*;
