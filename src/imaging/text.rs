//! Text rendering seam.
//!
//! Rasterized text drawing sits behind the [`TextRenderer`] trait so layout
//! and decoration logic can be exercised without font files. The production
//! implementation draws TrueType glyphs with `imageproc`, caching loaded
//! faces by path; the glyph size is applied at draw time via `rusttype`'s
//! `Scale`, so one cached face serves every font size in a run.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::debug;
use rusttype::{Font, Scale};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not a usable TrueType face: {0}")]
    FontParse(PathBuf),
    #[error("no usable font found; pass --font or set \"font\" in the config")]
    NoFont,
}

/// Horizontal alignment of a text block relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    /// Anchor x is the left edge of the block.
    Left,
    /// Anchor x is the right edge of the block.
    Right,
}

/// Opaque "draw text at a position" capability.
pub trait TextRenderer {
    /// Draw `text` with its bottom edge at `anchor.1` and its left or right
    /// edge at `anchor.0` depending on `align`.
    fn draw_text(
        &mut self,
        canvas: &mut RgbImage,
        text: &str,
        anchor: (i32, i32),
        font_size: u32,
        align: TextAlign,
        color: Rgb<u8>,
    ) -> Result<(), TextError>;
}

/// Well-known font locations, probed in order when no font is configured.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn default_font_path() -> Option<PathBuf> {
    FONT_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// TrueType renderer backed by `imageproc`/`rusttype`.
pub struct TrueTypeRenderer {
    font_path: PathBuf,
    faces: HashMap<PathBuf, Font<'static>>,
}

impl TrueTypeRenderer {
    /// Use the given font, or probe well-known system locations.
    pub fn new(font_path: Option<&Path>) -> Result<Self, TextError> {
        let font_path = match font_path {
            Some(path) => path.to_path_buf(),
            None => default_font_path().ok_or(TextError::NoFont)?,
        };
        debug!("border text font: {}", font_path.display());
        Ok(Self {
            font_path,
            faces: HashMap::new(),
        })
    }

    fn face(&mut self) -> Result<&Font<'static>, TextError> {
        if !self.faces.contains_key(&self.font_path) {
            let data = fs::read(&self.font_path).map_err(|source| TextError::FontRead {
                path: self.font_path.clone(),
                source,
            })?;
            let font = Font::try_from_vec(data)
                .ok_or_else(|| TextError::FontParse(self.font_path.clone()))?;
            self.faces.insert(self.font_path.clone(), font);
        }
        Ok(&self.faces[&self.font_path])
    }
}

impl TextRenderer for TrueTypeRenderer {
    fn draw_text(
        &mut self,
        canvas: &mut RgbImage,
        text: &str,
        anchor: (i32, i32),
        font_size: u32,
        align: TextAlign,
        color: Rgb<u8>,
    ) -> Result<(), TextError> {
        if text.is_empty() || font_size == 0 {
            return Ok(());
        }
        let font = self.face()?;
        let scale = Scale::uniform(font_size as f32);
        let (width, height) = text_size(scale, font, text);
        let x = match align {
            TextAlign::Left => anchor.0,
            TextAlign::Right => anchor.0 - width,
        };
        let y = anchor.1 - height;
        draw_text_mut(canvas, color, x, y, scale, font, text);
        Ok(())
    }
}
