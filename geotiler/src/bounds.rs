// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Envelopes, pixel spacing and the affine transform of a north-up raster.

use serde::{Deserialize, Serialize};

use crate::{GeoTilerError, Result};

/// Envelope in the raster's projected or geographic units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub min_x: f64,
  pub min_y: f64,
  pub max_x: f64,
  pub max_y: f64,
}

impl BoundingBox {
  pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
    Self { min_x, min_y, max_x, max_y }
  }

  /// Build the envelope of pixel *center* coordinates from per-axis
  /// coordinate arrays. Arrays may be ascending or descending, only
  /// the first and last entries are considered.
  pub fn from_coordinates(xs: &[f64], ys: &[f64]) -> Option<Self> {
    let (x0, x1) = (*xs.first()?, *xs.last()?);
    let (y0, y1) = (*ys.first()?, *ys.last()?);
    Some(Self::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
  }

  pub fn width(&self) -> f64 {
    self.max_x - self.min_x
  }

  pub fn height(&self) -> f64 {
    self.max_y - self.min_y
  }

  pub fn as_array(&self) -> [f64; 4] {
    [self.min_x, self.min_y, self.max_x, self.max_y]
  }

  /// Check `min < max` on both axes and that all values are finite
  pub fn validate(&self) -> Result<()> {
    if !self.as_array().iter().all(|v| v.is_finite()) {
      return Err(GeoTilerError::InvalidInput(format!("Bounding box contains non-finite values: {:?}", self)));
    }
    if self.min_x >= self.max_x || self.min_y >= self.max_y {
      return Err(GeoTilerError::InvalidInput(format!("Bounding box is empty or inverted: {:?}", self)));
    }
    Ok(())
  }

  /// Pixel scale of a `width` x `height` grid spanning this envelope
  pub fn pixel_scale(&self, width: usize, height: usize) -> Result<PixelScale> {
    self.validate()?;
    if width == 0 || height == 0 {
      return Err(GeoTilerError::InvalidInput(format!("Raster dimension {}x{} is empty", width, height)));
    }
    Ok(PixelScale {
      x: self.width() / width as f64,
      y: self.height() / height as f64,
    })
  }
}

/// Convert the envelope of pixel centers into the envelope of pixel edges.
///
/// The output stores pixel-is-area rasters, so each side moves outwards
/// by half a pixel.
pub fn pixel_center_to_edge(centers: &BoundingBox, spacing: Spacing) -> BoundingBox {
  let (hx, hy) = (spacing.x / 2.0, spacing.y / 2.0);
  BoundingBox::new(centers.min_x - hx, centers.min_y - hy, centers.max_x + hx, centers.max_y + hy)
}

/// How caller supplied bounds are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum BoundsConvention {
  /// Min/max of the pixel center coordinates
  #[default]
  PixelCenter,
  /// Outer edges of the pixel grid
  PixelEdge,
}

/// Absolute distance between neighbouring pixel centers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
  pub x: f64,
  pub y: f64,
}

impl Spacing {
  pub fn new(x: f64, y: f64) -> Result<Self> {
    if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
      return Err(GeoTilerError::InvalidInput(format!("Pixel spacing must be positive, got ({}, {})", x, y)));
    }
    Ok(Self { x, y })
  }

  /// Source products often store a negative y spacing for north-up grids
  pub fn from_signed(x: f64, y: f64) -> Result<Self> {
    Self::new(x.abs(), y.abs())
  }
}

/// Size of one pixel in model units, both components positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelScale {
  pub x: f64,
  pub y: f64,
}

/// Affine transform in GDAL order:
/// `x = c + col*a + row*b`, `y = f + col*d + row*e`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
  pub a: f64,
  pub b: f64,
  pub c: f64,
  pub d: f64,
  pub e: f64,
  pub f: f64,
}

impl GeoTransform {
  /// North-up transform from an upper-left tiepoint and a pixel scale
  pub fn from_tiepoint(origin_x: f64, origin_y: f64, scale: PixelScale) -> Self {
    Self {
      a: scale.x,
      b: 0.0,
      c: origin_x,
      d: 0.0,
      e: -scale.y,
      f: origin_y,
    }
  }

  pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
    (self.c + col * self.a + row * self.b, self.f + col * self.d + row * self.e)
  }

  /// Upper-left, upper-right, lower-left and lower-right corners
  pub fn corners(&self, width: usize, height: usize) -> [(f64, f64); 4] {
    let (w, h) = (width as f64, height as f64);
    [self.apply(0.0, 0.0), self.apply(w, 0.0), self.apply(0.0, h), self.apply(w, h)]
  }

  pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
    let corners = self.corners(width, height);
    let xs = corners.iter().map(|c| c.0);
    let ys = corners.iter().map(|c| c.1);
    BoundingBox::new(
      xs.clone().fold(f64::INFINITY, f64::min),
      ys.clone().fold(f64::INFINITY, f64::min),
      xs.fold(f64::NEG_INFINITY, f64::max),
      ys.fold(f64::NEG_INFINITY, f64::max),
    )
  }
}
