//! Font file lookup for the raster backend.
//!
//! A family name maps to exactly two candidate files, tried in order across
//! the configured search directories:
//!
//! 1. `<family>Bold.ttf`
//! 2. `<family>.ttf`
//!
//! There is no style matching or substitution beyond this fallback.

use super::WatermarkError;
use ab_glyph::FontVec;
use std::path::{Path, PathBuf};

/// Locates font files in an ordered list of directories.
#[derive(Debug, Clone)]
pub struct FontResolver {
    dirs: Vec<PathBuf>,
}

/// A font file found for a family, parsed and ready to draw with.
pub struct ResolvedFont {
    pub path: PathBuf,
    /// Whether the bold variant was found.
    pub bold: bool,
    pub font: FontVec,
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("path", &self.path)
            .field("bold", &self.bold)
            .finish()
    }
}

impl FontResolver {
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Find a font file by exact file name in the first directory holding it.
    pub fn find_font_file(&self, file_name: &str) -> Result<PathBuf, WatermarkError> {
        let not_found = || {
            WatermarkError::FontNotFound(format!(
                "Cannot find TTF TrueType font file \"{}\" in configured font directories",
                file_name
            ))
        };

        // A family name must not walk out of the search directories
        if Path::new(file_name).components().count() != 1 {
            return Err(not_found());
        }

        self.dirs
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(not_found)
    }

    /// Locate the file for `family`, preferring the bold variant.
    pub fn locate(&self, family: &str) -> Result<(PathBuf, bool), WatermarkError> {
        match self.find_font_file(&format!("{}Bold.ttf", family)) {
            Ok(path) => Ok((path, true)),
            Err(_) => self
                .find_font_file(&format!("{}.ttf", family))
                .map(|path| (path, false)),
        }
    }

    /// Locate and parse the font for `family`.
    pub fn resolve(&self, family: &str) -> Result<ResolvedFont, WatermarkError> {
        let (path, bold) = self.locate(family)?;
        let data = std::fs::read(&path)
            .map_err(|e| WatermarkError::failure(format!("read font {}", path.display()), e))?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            WatermarkError::failure(format!("parse font {}", path.display()), e.to_string())
        })?;

        tracing::debug!(family, path = %path.display(), bold, "Resolved font");
        Ok(ResolvedFont { path, bold, font })
    }
}
