//! Source image handle.
//!
//! Couples decoded pixel data to the file it came from. Decoding happens at
//! [`SourceImage::open`]; the pixels are released when the handle (or the
//! [`DynamicImage`] extracted from it) is dropped, so the lifetime of the
//! decoded data is the lifetime of its owner.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};

#[derive(Debug)]
pub struct SourceImage {
    path: PathBuf,
    image: DynamicImage,
}

impl SourceImage {
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        Ok(Self {
            path: path.to_path_buf(),
            image: image::open(path)?,
        })
    }

    /// Wrap pixels that did not come from disk (tests, synthetic inputs).
    pub fn from_parts(path: PathBuf, image: DynamicImage) -> Self {
        Self { path, image }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// `width / height`.
    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.dimensions();
        w as f64 / h as f64
    }

    /// Rotate 90 degrees counter-clockwise, expanding the canvas.
    pub fn rotate_ccw(&mut self) {
        self.image = self.image.rotate270();
    }
}
