//! Border decoration.
//!
//! Pastes a source image onto a larger background canvas sized by the
//! [`geometry`](super::geometry) calculations, then writes the configured
//! metadata strings into the border at the four corners. Portrait sources
//! are rotated to landscape first so every member of a group reaches the
//! merge step with the same orientation convention.

use image::{imageops, ImageBuffer, Rgb, RgbImage};
use log::debug;
use thiserror::Error;

use super::geometry;
use super::source::SourceImage;
use super::text::{TextAlign, TextError, TextRenderer};
use crate::config::{Corner, DecorationConfig};
use crate::exif::ExifRecord;
use crate::geocode::ReverseGeocoder;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Error, Debug)]
pub enum DecorateError {
    #[error("text rendering failed: {0}")]
    Text(#[from] TextError),
}

/// One source image prepared for decoration.
///
/// The EXIF record is read once at construction and reused for every corner.
pub struct DecoratedImage<'a> {
    source: SourceImage,
    exif: ExifRecord,
    config: &'a DecorationConfig,
    target_aspect_ratio: f64,
    border_multiplier: f64,
}

impl<'a> DecoratedImage<'a> {
    pub fn new(
        mut source: SourceImage,
        exif: ExifRecord,
        config: &'a DecorationConfig,
        target_aspect_ratio: f64,
        border_multiplier: f64,
    ) -> Self {
        if source.aspect_ratio() < 1.0 {
            debug!("rotating portrait source {} to landscape", source.path().display());
            source.rotate_ccw();
        }
        Self {
            source,
            exif,
            config,
            target_aspect_ratio,
            border_multiplier,
        }
    }

    /// Read the EXIF container from the source's file.
    pub fn from_source(
        source: SourceImage,
        config: &'a DecorationConfig,
        target_aspect_ratio: f64,
        border_multiplier: f64,
    ) -> Self {
        let exif = ExifRecord::from_file(source.path());
        Self::new(source, exif, config, target_aspect_ratio, border_multiplier)
    }

    /// Produce the bordered, annotated canvas.
    pub fn render(
        &self,
        renderer: &mut dyn TextRenderer,
        geocoder: &mut dyn ReverseGeocoder,
    ) -> Result<RgbImage, DecorateError> {
        let dims = self.source.dimensions();
        let (padded_w, padded_h) =
            geometry::padded_dimensions(dims, self.target_aspect_ratio, self.border_multiplier);
        let (border_x, border_y) =
            geometry::border_dimensions(dims, self.target_aspect_ratio, self.border_multiplier);

        let mut canvas: RgbImage =
            ImageBuffer::from_pixel(padded_w as u32, padded_h as u32, BACKGROUND);
        imageops::overlay(
            &mut canvas,
            &self.source.image().to_rgb8(),
            (border_x / 2.0) as i64,
            (border_y / 2.0) as i64,
        );

        let font_size = geometry::font_size(dims, self.target_aspect_ratio, self.border_multiplier);
        for corner in Corner::ALL {
            let text = self.config.render_corner(corner, &self.exif, geocoder);
            if text.is_empty() {
                continue;
            }
            let (x, y) =
                geometry::text_origin(corner, dims, self.target_aspect_ratio, self.border_multiplier);
            let align = if corner.is_right() { TextAlign::Right } else { TextAlign::Left };
            renderer.draw_text(&mut canvas, &text, (x as i32, y as i32), font_size, align, TEXT_COLOR)?;
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::tests::ScriptedGeocoder;
    use crate::imaging::text::tests::RecordingRenderer;
    use image::DynamicImage;
    use std::path::PathBuf;

    const GRAY: Rgb<u8> = Rgb([127, 127, 127]);

    fn synthetic(width: u32, height: u32) -> SourceImage {
        SourceImage::from_parts(
            PathBuf::from("synthetic.jpg"),
            DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, GRAY)),
        )
    }

    #[test]
    fn canvas_matches_truncated_padded_dimensions() {
        let config = DecorationConfig::default();
        let decorated = DecoratedImage::new(synthetic(600, 400), ExifRecord::default(), &config, 4.0 / 3.0, 1.0);
        let canvas = decorated
            .render(&mut RecordingRenderer::default(), &mut ScriptedGeocoder::default())
            .unwrap();

        let (pw, ph) = geometry::padded_dimensions((600, 400), 4.0 / 3.0, 1.0);
        assert_eq!(canvas.dimensions(), (pw as u32, ph as u32));
    }

    #[test]
    fn image_is_pasted_centered_on_the_background() {
        let config = DecorationConfig::default();
        let decorated = DecoratedImage::new(synthetic(600, 400), ExifRecord::default(), &config, 4.0 / 3.0, 1.0);
        let canvas = decorated
            .render(&mut RecordingRenderer::default(), &mut ScriptedGeocoder::default())
            .unwrap();

        let (bx, by) = geometry::border_dimensions((600, 400), 4.0 / 3.0, 1.0);
        let (left, top) = ((bx / 2.0) as u32, (by / 2.0) as u32);

        assert_eq!(*canvas.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*canvas.get_pixel(left, top), GRAY);
        assert_eq!(*canvas.get_pixel(left + 599, top + 399), GRAY);
        assert_eq!(*canvas.get_pixel(left + 600, top), BACKGROUND);
    }

    #[test]
    fn portrait_sources_are_canonicalized_to_landscape() {
        let config = DecorationConfig::default();
        let landscape = DecoratedImage::new(synthetic(600, 400), ExifRecord::default(), &config, 1.5, 1.0);
        let portrait = DecoratedImage::new(synthetic(400, 600), ExifRecord::default(), &config, 1.5, 1.0);

        let mut renderer = RecordingRenderer::default();
        let mut geocoder = ScriptedGeocoder::default();
        let a = landscape.render(&mut renderer, &mut geocoder).unwrap();
        let b = portrait.render(&mut renderer, &mut geocoder).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
    }

    #[test]
    fn corners_with_data_get_one_draw_call_each() {
        let config = DecorationConfig::default();
        let exif = ExifRecord {
            focal_length_mm: Some(50.0),
            iso: Some(200),
            description: Some("Harbor".to_string()),
            ..ExifRecord::default()
        };
        let decorated = DecoratedImage::new(synthetic(600, 400), exif, &config, 4.0 / 3.0, 1.0);

        let mut renderer = RecordingRenderer::default();
        let mut geocoder = ScriptedGeocoder::default();
        decorated.render(&mut renderer, &mut geocoder).unwrap();

        // top_left carries the description, bottom_left the exposure data;
        // the GPS and geocode corners are absent.
        assert_eq!(renderer.calls.len(), 2);
        assert_eq!(renderer.calls[0].text, "Harbor");
        assert_eq!(renderer.calls[0].align, TextAlign::Left);
        assert_eq!(renderer.calls[1].text, "50mm | ISO 200");
        assert_eq!(renderer.calls[1].align, TextAlign::Left);
    }

    #[test]
    fn right_corners_are_right_aligned_at_their_origin() {
        use crate::exif::GpsPosition;

        let config = DecorationConfig::default();
        let exif = ExifRecord {
            gps: Some(GpsPosition {
                latitude: [48.0, 8.0, 14.0],
                latitude_ref: 'N',
                longitude: [11.0, 34.0, 31.0],
                longitude_ref: 'E',
            }),
            ..ExifRecord::default()
        };
        let decorated = DecoratedImage::new(synthetic(600, 400), exif, &config, 4.0 / 3.0, 1.0);

        let mut renderer = RecordingRenderer::default();
        let mut geocoder = ScriptedGeocoder::returning("Haidhausen, Munich");
        decorated.render(&mut renderer, &mut geocoder).unwrap();

        // top_right: geocoded location; bottom_right: coordinates.
        assert_eq!(renderer.calls.len(), 2);
        assert!(renderer.calls.iter().all(|c| c.align == TextAlign::Right));

        let expected_top =
            geometry::text_origin(Corner::TopRight, (600, 400), 4.0 / 3.0, 1.0);
        assert_eq!(renderer.calls[0].anchor, (expected_top.0 as i32, expected_top.1 as i32));

        let expected_font = geometry::font_size((600, 400), 4.0 / 3.0, 1.0);
        assert!(renderer.calls.iter().all(|c| c.font_size == expected_font));
    }

    #[test]
    fn absent_exif_draws_nothing() {
        let config = DecorationConfig::default();
        let decorated = DecoratedImage::new(synthetic(600, 400), ExifRecord::default(), &config, 4.0 / 3.0, 1.0);

        let mut renderer = RecordingRenderer::default();
        let mut geocoder = ScriptedGeocoder::default();
        decorated.render(&mut renderer, &mut geocoder).unwrap();
        assert!(renderer.calls.is_empty());
    }
}
