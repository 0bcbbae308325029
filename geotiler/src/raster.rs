// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::collections::HashSet;

use crate::{GeoTilerError, Result};

/// Single named band of row-major Float32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
  name: String,
  width: usize,
  height: usize,
  data: Vec<f32>,
}

impl RasterBand {
  pub fn new(name: impl Into<String>, width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
    let name = name.into();
    if width == 0 || height == 0 {
      return Err(GeoTilerError::InvalidInput(format!("Band '{}' has empty dimension {}x{}", name, width, height)));
    }
    let expected = width
      .checked_mul(height)
      .ok_or_else(|| GeoTilerError::InvalidInput(format!("Band '{}' dimension {}x{} overflows", name, width, height)))?;
    if data.len() != expected {
      return Err(GeoTilerError::InvalidInput(format!(
        "Band '{}' has {} samples, expected {} for {}x{}",
        name,
        data.len(),
        expected,
        width,
        height
      )));
    }
    Ok(Self { name, width, height, data })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  pub fn row(&self, row: usize) -> &[f32] {
    &self.data[row * self.width..(row + 1) * self.width]
  }

  pub fn into_data(self) -> Vec<f32> {
    self.data
  }
}

/// Ordered set of equally shaped bands, written as one multi-sample image
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
  bands: Vec<RasterBand>,
}

impl RasterImage {
  pub fn new(bands: Vec<RasterBand>) -> Result<Self> {
    let first = bands.first().ok_or_else(|| GeoTilerError::InvalidInput("Band list is empty".to_string()))?;
    let (width, height) = (first.width, first.height);

    if let Some(band) = bands.iter().find(|b| b.width != width || b.height != height) {
      return Err(GeoTilerError::InvalidInput(format!(
        "Band '{}' is {}x{}, but band '{}' is {}x{}",
        band.name, band.width, band.height, first.name, width, height
      )));
    }

    let mut names = HashSet::with_capacity(bands.len());
    if let Some(dup) = bands.iter().find(|b| !names.insert(b.name.as_str())) {
      return Err(GeoTilerError::InvalidInput(format!("Band name '{}' is not unique", dup.name)));
    }

    if bands.len() > u16::MAX as usize {
      return Err(GeoTilerError::InvalidInput(format!("Too many bands: {}", bands.len())));
    }

    Ok(Self { bands })
  }

  pub fn width(&self) -> usize {
    self.bands[0].width
  }

  pub fn height(&self) -> usize {
    self.bands[0].height
  }

  pub fn band_count(&self) -> usize {
    self.bands.len()
  }

  pub fn bands(&self) -> &[RasterBand] {
    &self.bands
  }

  pub fn band_names(&self) -> Vec<&str> {
    self.bands.iter().map(RasterBand::name).collect()
  }

  pub fn into_bands(self) -> Vec<RasterBand> {
    self.bands
  }
}
