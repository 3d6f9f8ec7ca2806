//! PNG export of a built chart.

use crate::{
    chart::render::Rasterizer,
    error::{AnalystError, Result},
    models::ChartSpec,
    utils::{Logger, Timer},
};
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Renders a [`ChartSpec`] to PNG bytes.
///
/// The encoder writes to a temporary file inside `work_dir`; the file is a
/// [`tempfile::NamedTempFile`] and is removed when it goes out of scope, on
/// success and on every error path alike.
pub struct SnapshotExporter {
    rasterizer: Rasterizer,
    work_dir: PathBuf,
    logger: Logger,
}

impl SnapshotExporter {
    pub fn new(rasterizer: Rasterizer) -> Self {
        Self {
            rasterizer,
            work_dir: std::env::temp_dir(),
            logger: Logger::new("SNAPSHOT"),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn export_png(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        let timer = Timer::start("chart snapshot");

        if spec.is_empty() {
            return Err(AnalystError::Render("cannot snapshot an empty chart".to_string()));
        }

        let image = self.rasterizer.render(spec)?;
        let bytes = self.encode_via_scratch(|path| {
            image.save_with_format(path, ImageFormat::Png)?;
            Ok(())
        })?;

        let (width, height) = self.rasterizer.dimensions();
        self.logger.debug(&format!(
            "Rendered '{}' at {}x{}: {} bytes in {:.1}ms",
            spec.title(),
            width,
            height,
            bytes.len(),
            timer.elapsed_ms()
        ));

        Ok(bytes)
    }

    /// Run `encode` against a fresh scratch file in `work_dir` and return
    /// what it wrote. The scratch file is gone when this returns.
    fn encode_via_scratch(&self, encode: impl FnOnce(&Path) -> Result<()>) -> Result<Vec<u8>> {
        let scratch = tempfile::Builder::new()
            .prefix("chart-snapshot-")
            .suffix(".png")
            .tempfile_in(&self.work_dir)
            .map_err(|e| {
                AnalystError::Render(format!(
                    "cannot create scratch file in {}: {}",
                    self.work_dir.display(),
                    e
                ))
            })?;

        encode(scratch.path())?;

        let bytes = std::fs::read(scratch.path())
            .map_err(|e| AnalystError::Render(format!("cannot read rendered snapshot: {}", e)))?;

        if bytes.is_empty() {
            return Err(AnalystError::Render("encoder produced an empty image".to_string()));
        }
        Ok(bytes)
    }
}

impl Default for SnapshotExporter {
    fn default() -> Self {
        Self::new(Rasterizer::default())
    }
}
