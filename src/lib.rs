//! # Printpack
//!
//! Assembles groups of photographs into single bordered composites
//! ("compositions") suitable for printing, annotating each photo's border
//! with EXIF-derived metadata: focal length, aperture, shutter speed, ISO,
//! GPS coordinates, and a reverse-geocoded location name.
//!
//! # Architecture: Decorate, Then Merge
//!
//! A run flows through three steps per group of images:
//!
//! ```text
//! 1. Discover   input dir        →  sorted image list   (by aspect ratio)
//! 2. Decorate   image + EXIF     →  bordered canvas     (per group member)
//! 3. Merge      bordered images  →  one composite       (pairwise stacking)
//! ```
//!
//! The decoration step does the load-bearing geometry: every image is
//! padded to the *same* target aspect ratio, which is what makes the
//! pairwise merge sound — stacking only ever combines canvases of matching
//! shape, and the merge step treats a mismatch as an internal fault rather
//! than something to paper over.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | walks the input directory, collects image files by extension |
//! | [`compose`] | orchestration — grouping, decorate/merge driving, output naming |
//! | [`config`] | JSON decoration config: corner fields, separators, load-time validation |
//! | [`exif`] | raw EXIF extraction and display formatting (APEX, snapping, DMS) |
//! | [`geocode`] | reverse geocoding seam; rate-limited, cached Nominatim client |
//! | [`imaging`] | geometry math, border decoration, merge reduction, text seam |
//!
//! # Design Decisions
//!
//! ## Pure Geometry, Late Truncation
//!
//! All border and padding math lives in [`imaging::geometry`] as pure `f64`
//! functions; dimensions become integer pixels only at the codec boundary.
//! The padded canvas hits the target aspect ratio to floating-point
//! precision, and the unit tests assert it to seven decimal places.
//!
//! ## Heap-Driven Merge
//!
//! The merge reduction uses an explicit min-heap keyed by node weight and
//! insertion sequence instead of recursive re-sorting. Equal weights merge
//! in insertion order — the tie-break is data, not an accident of the sort
//! — and group size never touches the call stack.
//!
//! ## Seams for the Slow Parts
//!
//! Text rasterization ([`imaging::text::TextRenderer`]) and reverse
//! geocoding ([`geocode::ReverseGeocoder`]) are traits. Production wires up
//! TrueType rendering and the Nominatim client; tests wire up recording
//! doubles, so the whole pipeline runs in tests without fonts or network.
//!
//! ## Load-Time Config Validation
//!
//! The decoration config maps corner names to field lists. Every field name
//! resolves to a formatter when the config is *loaded*; a typo fails the
//! run before any image is decoded, never halfway through a batch.

pub mod compose;
pub mod config;
pub mod exif;
pub mod geocode;
pub mod imaging;
pub mod scan;
