// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{GeoTilerError, Result, bounds::BoundsConvention, envparams, tiles::DEFAULT_TILE_SIZE};

/// Default limit for the exported raster width
pub const DEFAULT_MAX_WIDTH: usize = 8192;

/// Parameters for GeoTIFF export
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportParams {
  /// Tile side length in pixels, multiple of 16
  pub tile_size: usize,
  /// Multilook (decimation) factor, 1 keeps the full resolution
  pub multilook: usize,
  /// Widest output raster, the multilook factor is doubled until the
  /// decimated width fits
  pub max_width: usize,
  /// Keep only the first rows of the decimated grid
  pub max_rows: Option<usize>,
  /// Worker threads for tile compression
  pub threads: Option<usize>,
  /// How the bounds passed with the bands are expressed
  pub convention: BoundsConvention,
}

impl Default for ExportParams {
  fn default() -> Self {
    Self {
      tile_size: DEFAULT_TILE_SIZE,
      multilook: 1,
      max_width: DEFAULT_MAX_WIDTH,
      max_rows: None,
      threads: None,
      convention: BoundsConvention::PixelCenter,
    }
  }
}

impl ExportParams {
  pub fn from_toml(input: &str) -> Result<Self> {
    let params: Self = toml::from_str(input)?;
    params.validate()?;
    Ok(params)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let input = std::fs::read_to_string(path.as_ref())?;
    debug!("Loading export parameters from {}", path.as_ref().display());
    Self::from_toml(&input)
  }

  pub fn validate(&self) -> Result<()> {
    if self.tile_size == 0 || self.tile_size % 16 != 0 {
      return Err(GeoTilerError::InvalidInput(format!("Tile size {} is not a positive multiple of 16", self.tile_size)));
    }
    if self.multilook == 0 {
      return Err(GeoTilerError::InvalidInput("Multilook factor must be at least 1".to_string()));
    }
    if self.max_width == 0 {
      return Err(GeoTilerError::InvalidInput("Maximum width must be at least 1".to_string()));
    }
    if self.max_rows == Some(0) {
      return Err(GeoTilerError::InvalidInput("Row limit must be at least 1".to_string()));
    }
    if self.threads == Some(0) {
      return Err(GeoTilerError::InvalidInput("Thread count must be at least 1".to_string()));
    }
    Ok(())
  }

  /// Multilook factor applied to a raster `width` pixels wide: the
  /// configured factor, doubled while the output is wider than `max_width`
  pub fn effective_multilook(&self, width: usize) -> usize {
    let mut ml = self.multilook.max(1);
    while width / ml > self.max_width.max(1) {
      ml *= 2;
    }
    ml
  }

  /// Thread count from the parameters, else from `GEOTILER_THREADS`
  pub fn effective_threads(&self) -> Option<usize> {
    self.threads.or_else(envparams::geotiler_threads)
  }
}
