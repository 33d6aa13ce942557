//! Composition orchestration.
//!
//! Drives the whole pipeline for one run: discovered images are sorted by
//! normalized aspect ratio (portrait and landscape treated alike, so shots
//! of the same shape land in the same group), partitioned into fixed-size
//! groups, and each group is decorated and merged into one composite that
//! is written to the output directory.
//!
//! Sorting uses only the image headers (`image::image_dimensions`); pixels
//! are decoded per group during decoration, so at most one group's images
//! and its intermediate merge canvases are in memory at a time.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::DynamicImage;
use log::{debug, info};
use thiserror::Error;

use crate::config::DecorationConfig;
use crate::geocode::ReverseGeocoder;
use crate::imaging::decorate::{DecorateError, DecoratedImage};
use crate::imaging::geometry;
use crate::imaging::merge::{merge_group, MergeError, MergeNode};
use crate::imaging::source::SourceImage;
use crate::imaging::text::TextRenderer;
use crate::scan::{self, ScanError};

pub const DEFAULT_TARGET_ASPECT_RATIO: f64 = 4.0 / 3.0;
pub const DEFAULT_GROUP_SIZE: usize = 4;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Decorate(#[from] DecorateError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("padding strategy \"{0}\" is not implemented")]
    PaddingNotImplemented(PaddingStrategy),
}

/// How to handle the final group when the image count does not divide
/// evenly by the group size.
///
/// Only [`Upscale`](PaddingStrategy::Upscale) has a concrete contract; the
/// others are named but deliberately unimplemented rather than silently
/// degrading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaddingStrategy {
    /// Let the remainder group stay smaller; its members simply occupy more
    /// of the composite.
    #[default]
    Upscale,
    /// Fill the remainder group with blank placeholder frames.
    Placeholder,
    /// Fill the remainder group by repeating members.
    Duplicate,
}

impl fmt::Display for PaddingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaddingStrategy::Upscale => "upscale",
            PaddingStrategy::Placeholder => "placeholder",
            PaddingStrategy::Duplicate => "duplicate",
        };
        f.write_str(name)
    }
}

impl FromStr for PaddingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upscale" => Ok(PaddingStrategy::Upscale),
            "placeholder" => Ok(PaddingStrategy::Placeholder),
            "duplicate" => Ok(PaddingStrategy::Duplicate),
            other => Err(format!(
                "unknown padding strategy {other:?} (expected upscale, placeholder, or duplicate)"
            )),
        }
    }
}

/// Tunables for one composition run.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Aspect ratio every decorated image is padded to.
    pub target_aspect_ratio: f64,
    /// Number of images per composition.
    pub group_size: usize,
    /// Border width multiplier (1.0 = 5 mm on a 13 cm print).
    pub border_multiplier: f64,
    pub padding_strategy: PaddingStrategy,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            target_aspect_ratio: DEFAULT_TARGET_ASPECT_RATIO,
            group_size: DEFAULT_GROUP_SIZE,
            border_multiplier: 1.0,
            padding_strategy: PaddingStrategy::Upscale,
        }
    }
}

/// Top-level pipeline driver.
pub struct Composer {
    config: DecorationConfig,
    options: ComposeOptions,
    input_files: Vec<PathBuf>,
}

impl Composer {
    pub fn new(config: DecorationConfig) -> Self {
        Self::with_options(config, ComposeOptions::default())
    }

    pub fn with_options(config: DecorationConfig, options: ComposeOptions) -> Self {
        Self {
            config,
            options,
            input_files: Vec::new(),
        }
    }

    /// Recursively discover input images under `dir`.
    pub fn discover_images(&mut self, dir: &Path) -> Result<(), ComposeError> {
        self.input_files = scan::discover_images(dir)?;
        Ok(())
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    /// Compose every group and write the results into `output_dir`.
    ///
    /// Returns the written file paths, one per group.
    pub fn create_compositions(
        &self,
        output_dir: &Path,
        renderer: &mut dyn TextRenderer,
        geocoder: &mut dyn ReverseGeocoder,
    ) -> Result<Vec<PathBuf>, ComposeError> {
        match self.options.padding_strategy {
            PaddingStrategy::Upscale => {}
            other => return Err(ComposeError::PaddingNotImplemented(other)),
        }
        fs::create_dir_all(output_dir)?;

        // Sort by normalized aspect ratio so similarly shaped images end up
        // in the same composition; ties keep discovery order (stable sort).
        let mut keyed: Vec<(f64, PathBuf)> = Vec::with_capacity(self.input_files.len());
        for path in &self.input_files {
            let dims = image::image_dimensions(path)?;
            keyed.push((geometry::normalized_aspect_ratio(dims), path.clone()));
        }
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut written = Vec::new();
        for group in keyed.chunks(self.options.group_size.max(1)) {
            let paths: Vec<&Path> = group.iter().map(|(_, p)| p.as_path()).collect();
            if let Some(out_path) = self.compose_group(&paths, output_dir, renderer, geocoder)? {
                info!(
                    "composed {} image(s) into {}",
                    paths.len(),
                    out_path.display()
                );
                written.push(out_path);
            }
        }
        Ok(written)
    }

    fn compose_group(
        &self,
        paths: &[&Path],
        output_dir: &Path,
        renderer: &mut dyn TextRenderer,
        geocoder: &mut dyn ReverseGeocoder,
    ) -> Result<Option<PathBuf>, ComposeError> {
        let mut nodes = Vec::with_capacity(paths.len());
        for path in paths {
            debug!("decorating {}", path.display());
            let source = SourceImage::open(path)?;
            let decorated = DecoratedImage::from_source(
                source,
                &self.config,
                self.options.target_aspect_ratio,
                self.options.border_multiplier,
            );
            let canvas = decorated.render(renderer, geocoder)?;
            nodes.push(MergeNode::new(DynamicImage::ImageRgb8(canvas)));
        }

        let Some(merged) = merge_group(nodes)? else {
            return Ok(None);
        };
        let out_path = output_dir.join(derive_filename(paths));
        merged.image.to_rgb8().save(&out_path)?;
        Ok(Some(out_path))
    }
}

/// Output filename for a group: member stems joined with `-`.
fn derive_filename(paths: &[&Path]) -> String {
    let stems: Vec<&str> = paths
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
        .collect();
    format!("{}.jpg", stems.join("-"))
}
