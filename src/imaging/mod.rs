//! Image geometry and pixel work.
//!
//! | Concern | Module | Crate / function |
//! |---|---|---|
//! | **Border math** | [`geometry`] | pure `f64` arithmetic |
//! | **Decoration** | [`decorate`] | `image` canvas + overlay |
//! | **Merge reduction** | [`merge`] | `image` resize/rotate/overlay |
//! | **Text drawing** | [`text`] | `imageproc::drawing` + `rusttype` |
//! | **Source handles** | [`source`] | `image::open` |
//!
//! The split mirrors the pipeline: pure calculations are separated from
//! pixel execution so the dimension math is unit testable without decoding
//! a single image, and text rasterization is behind a trait so decoration
//! tests run without font files.

pub mod decorate;
pub mod geometry;
pub mod merge;
pub mod source;
pub mod text;

pub use decorate::{DecorateError, DecoratedImage};
pub use merge::{merge_group, MergeError, MergeNode};
pub use source::SourceImage;
pub use text::{TextAlign, TextError, TextRenderer, TrueTypeRenderer};
