// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use serde::Serialize;

use super::geokeys::{GeoKeyDirectory, ModelType};
use crate::{
  GeoTilerError, Result,
  bounds::{BoundingBox, BoundsConvention, GeoTransform, PixelScale, Spacing, pixel_center_to_edge},
};

/// Pixel-edge envelope and coordinate system of a raster.
///
/// The envelope always describes the outer pixel edges. Center
/// coordinates are corrected on construction, so the half pixel shift is
/// applied exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoReference {
  edges: BoundingBox,
  epsg: u16,
}

fn check_epsg(epsg: u32) -> Result<u16> {
  match u16::try_from(epsg) {
    Ok(code) if code > 0 => Ok(code),
    _ => Err(GeoTilerError::InvalidInput(format!("EPSG code {} can not be stored as GeoKey", epsg))),
  }
}

impl GeoReference {
  /// Bounds given as min/max of the pixel center coordinates
  pub fn from_pixel_centers(centers: BoundingBox, spacing: Spacing, epsg: u32) -> Result<Self> {
    Self::from_pixel_edges(pixel_center_to_edge(&centers, spacing), epsg)
  }

  pub fn from_pixel_edges(edges: BoundingBox, epsg: u32) -> Result<Self> {
    edges.validate()?;
    Ok(Self {
      edges,
      epsg: check_epsg(epsg)?,
    })
  }

  /// Build from bounds in the given convention. Pixel center bounds
  /// need the pixel spacing for the correction.
  pub fn new(bounds: BoundingBox, convention: BoundsConvention, spacing: Option<Spacing>, epsg: u32) -> Result<Self> {
    match (convention, spacing) {
      (BoundsConvention::PixelEdge, _) => Self::from_pixel_edges(bounds, epsg),
      (BoundsConvention::PixelCenter, Some(spacing)) => Self::from_pixel_centers(bounds, spacing, epsg),
      (BoundsConvention::PixelCenter, None) => Err(GeoTilerError::InvalidInput(
        "Pixel spacing is required to correct pixel center bounds".to_string(),
      )),
    }
  }

  pub fn edges(&self) -> &BoundingBox {
    &self.edges
  }

  pub fn epsg(&self) -> u16 {
    self.epsg
  }

  pub fn model_type(&self) -> ModelType {
    ModelType::for_epsg(self.epsg)
  }

  pub fn geokeys(&self) -> GeoKeyDirectory {
    GeoKeyDirectory::for_epsg(self.epsg)
  }

  pub fn pixel_scale(&self, width: usize, height: usize) -> Result<PixelScale> {
    self.edges.pixel_scale(width, height)
  }

  /// Raster point (0, 0, 0) tied to the upper-left corner
  pub fn tiepoint(&self) -> [f64; 6] {
    [0.0, 0.0, 0.0, self.edges.min_x, self.edges.max_y, 0.0]
  }

  pub fn transform(&self, width: usize, height: usize) -> Result<GeoTransform> {
    Ok(GeoTransform::from_tiepoint(self.edges.min_x, self.edges.max_y, self.pixel_scale(width, height)?))
  }

  /// Keep the top `rows` of `full_rows` rows. The bottom edge moves up so
  /// the pixel height is unchanged.
  pub fn crop_rows(&self, full_rows: usize, rows: usize) -> Result<Self> {
    if rows == 0 || rows > full_rows {
      return Err(GeoTilerError::InvalidInput(format!("Can not keep {} of {} rows", rows, full_rows)));
    }
    let mut edges = self.edges;
    if rows < full_rows {
      edges.min_y = edges.max_y - rows as f64 * (self.edges.height() / full_rows as f64);
    }
    Ok(Self { edges, epsg: self.epsg })
  }
}
