// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Library to encode multi-band Float32 rasters (for example multilooked
//! SAR covariance products) into a single tiled, DEFLATE compressed GeoTIFF.
//!
//! # Example
//! ```rust,no_run
//! use geotiler::{BoundingBox, GeoReference, RasterBand, RasterImage, Spacing};
//! use geotiler::geotiff::GeoTiffEncoder;
//!
//! fn main() -> geotiler::Result<()> {
//!   let hh = RasterBand::new("HHHH", 700, 600, vec![0.5; 700 * 600])?;
//!   let image = RasterImage::new(vec![hh])?;
//!   let centers = BoundingBox::new(434170.0, 9275770.0, 448150.0, 9287750.0);
//!   let georef = GeoReference::from_pixel_centers(centers, Spacing::new(20.0, 20.0)?, 32718)?;
//!   GeoTiffEncoder::new(&image, georef).write_file("output.tif")?;
//!   Ok(())
//! }
//! ```

#![deny(unstable_features)]

pub mod bounds;
pub mod compress;
pub mod config;
mod envparams;
pub mod formats;
pub mod geotiff;
pub mod multilook;
pub mod raster;
pub mod tiles;

pub use bounds::{BoundingBox, BoundsConvention, GeoTransform, PixelScale, Spacing};
pub use config::ExportParams;
pub use geotiff::{GeoReference, GeoTiffEncoder};
pub use raster::{RasterBand, RasterImage};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoTilerError {
  /// Rejected before any encoding work begins
  #[error("Invalid input: {}", _0)]
  InvalidInput(String),

  /// The DEFLATE stream for a tile could not be produced
  #[error("Compression of tile {tile} failed: {source}")]
  CompressionFailure { tile: usize, source: std::io::Error },

  /// An offset or size does not fit into 32 bit TIFF addressing
  #[error("Addressing overflow: {}", _0)]
  AddressingOverflow(String),

  /// Internal invariant violation between planned layout and entries
  #[error("Layout inconsistency: {}", _0)]
  LayoutInconsistency(String),

  /// Malformed file given to the read-back inspector
  #[error("Format error: {}", _0)]
  Format(String),

  #[error("{}", _0)]
  General(String),

  #[error("I/O error: {}", _0)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeoTilerError>;

impl From<rayon::ThreadPoolBuildError> for GeoTilerError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    Self::General(format!("Failed to build thread pool: {}", err))
  }
}

impl From<toml::de::Error> for GeoTilerError {
  fn from(err: toml::de::Error) -> Self {
    Self::InvalidInput(format!("Invalid export parameters: {}", err))
  }
}

#[cfg(test)]
pub(crate) fn init_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}
