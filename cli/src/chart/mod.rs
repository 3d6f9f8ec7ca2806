//! Chart assembly, rasterization and PNG snapshots.

pub mod builder;
pub mod render;
pub mod snapshot;

pub use builder::ChartBuilder;
pub use render::{ChartStyle, Rasterizer};
pub use snapshot::SnapshotExporter;
