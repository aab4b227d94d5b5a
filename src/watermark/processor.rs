//! High-level entry point for watermarking a file.
//!
//! [`Watermarker`] picks the backend for a request, allocates a fresh output
//! path and hands off to the vector or raster compositor.
//!
//! # Example
//!
//! ```no_run
//! use watermark_engine::config::WatermarkConfig;
//! use watermark_engine::watermark::{Watermarker, WatermarkRequest};
//!
//! let watermarker = Watermarker::new(WatermarkConfig::default());
//! let request = WatermarkRequest::new("report.pdf", "DRAFT")
//!     .with_position(-20, -20)
//!     .with_angle(45);
//!
//! let artifact = watermarker.apply(&request)?;
//! println!("written to {}", artifact.path.display());
//! # Ok::<(), watermark_engine::watermark::WatermarkError>(())
//! ```

use super::output::{allocate_output_path, OutputArtifact};
use super::raster::RasterCompositor;
use super::vector::VectorCompositor;
use super::{BackendKind, WatermarkError, WatermarkRequest};
use crate::config::WatermarkConfig;
use std::fs::File;
use std::io;
use std::time::Instant;

/// Applies watermark requests under one immutable configuration.
///
/// Holds no per-call state, so a single instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Watermarker {
    config: WatermarkConfig,
}

impl Watermarker {
    pub fn new(config: WatermarkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Watermark `request.source` into a new file.
    ///
    /// The source is never modified. On error no output file is left behind.
    pub fn apply(&self, request: &WatermarkRequest) -> Result<OutputArtifact, WatermarkError> {
        let unreadable = |source| WatermarkError::InputUnreadable {
            path: request.source.clone(),
            source,
        };
        let file = File::open(&request.source).map_err(unreadable)?;
        // Opening succeeds on directories on some platforms
        if !file.metadata().map_err(unreadable)?.is_file() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let kind = request.backend_kind()?;
        let path = allocate_output_path(&self.config.output_dir(), &request.source);
        let started = Instant::now();

        tracing::info!(
            source = %request.source.display(),
            backend = %kind,
            output = %path.display(),
            "Applying watermark"
        );

        let result = match kind {
            BackendKind::Vector => VectorCompositor::new(&self.config)
                .composite(request, &path)
                .map(|_| ()),
            BackendKind::Raster => RasterCompositor::new(&self.config)
                .composite(request, &path)
                .map(|_| ()),
        };

        if let Err(e) = result {
            tracing::warn!(
                source = %request.source.display(),
                backend = %kind,
                error = %e,
                "Watermark failed"
            );
            return Err(e);
        }

        tracing::info!(
            output = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Watermark applied"
        );
        Ok(OutputArtifact { path, kind })
    }
}
