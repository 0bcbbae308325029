// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::ops::Range;

use crate::{GeoTilerError, Result, raster::RasterImage};

/// Default tile side length in pixels
pub const DEFAULT_TILE_SIZE: usize = 512;

/// Row-major grid of square tiles covering a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
  width: usize,
  height: usize,
  tile_size: usize,
  tcols: usize,
  trows: usize,
}

/// Part of the raster covered by a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileExtent {
  pub x0: usize,
  pub y0: usize,
  /// Valid columns, smaller than the tile size for the last column of tiles
  pub width: usize,
  /// Valid rows, smaller than the tile size for the last row of tiles
  pub height: usize,
}

impl TileGrid {
  pub fn new(width: usize, height: usize, tile_size: usize) -> Result<Self> {
    if tile_size == 0 {
      return Err(GeoTilerError::InvalidInput("Tile size must be positive".to_string()));
    }
    Ok(Self {
      width,
      height,
      tile_size,
      tcols: width.div_ceil(tile_size),
      trows: height.div_ceil(tile_size),
    })
  }

  pub fn tile_size(&self) -> usize {
    self.tile_size
  }

  pub fn tile_cols(&self) -> usize {
    self.tcols
  }

  pub fn tile_rows(&self) -> usize {
    self.trows
  }

  pub fn tile_count(&self) -> usize {
    self.tile_rows() * self.tile_cols()
  }

  pub fn indices(&self) -> Range<usize> {
    0..self.tile_count()
  }

  /// Samples in one tile buffer, padding included
  pub fn samples_per_tile(&self, bands: usize) -> usize {
    self.tile_size * self.tile_size * bands
  }

  pub fn extent(&self, index: usize) -> TileExtent {
    let tile_row = index / self.tile_cols();
    let tile_col = index % self.tile_cols();
    let x0 = tile_col * self.tile_size;
    let y0 = tile_row * self.tile_size;
    TileExtent {
      x0,
      y0,
      width: self.tile_size.min(self.width - x0),
      height: self.tile_size.min(self.height - y0),
    }
  }
}

/// Cuts band-interleaved-by-pixel tiles out of a set of bands
pub struct BipTiler<'a> {
  bands: Vec<&'a [f32]>,
  width: usize,
  grid: TileGrid,
}

impl<'a> BipTiler<'a> {
  pub fn new(image: &'a RasterImage, tile_size: usize) -> Result<Self> {
    Ok(Self {
      bands: image.bands().iter().map(|b| b.data()).collect(),
      width: image.width(),
      grid: TileGrid::new(image.width(), image.height(), tile_size)?,
    })
  }

  pub fn grid(&self) -> &TileGrid {
    &self.grid
  }

  /// Extract tile `index` as a zero padded `tile_size² × bands` buffer.
  /// The band index is the fastest varying axis.
  pub fn tile(&self, index: usize) -> Vec<f32> {
    let nb = self.bands.len();
    let ts = self.grid.tile_size();
    let ext = self.grid.extent(index);
    let mut buf = vec![0.0_f32; self.grid.samples_per_tile(nb)];

    for row in 0..ext.height {
      let src_row = (ext.y0 + row) * self.width + ext.x0;
      let dst_row = &mut buf[row * ts * nb..(row * ts + ext.width) * nb];
      for (px, pixel) in dst_row.chunks_exact_mut(nb).enumerate() {
        for (sample, band) in pixel.iter_mut().zip(&self.bands) {
          *sample = band[src_row + px];
        }
      }
    }
    buf
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::raster::RasterBand;

  #[test]
  fn tile_1x1() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let band = RasterBand::new("HHHH", 1, 1, vec![7.0])?;
    let image = RasterImage::new(vec![band])?;
    let tiler = BipTiler::new(&image, 16)?;

    assert_eq!(tiler.grid().tile_count(), 1);
    let tile = tiler.tile(0);
    assert_eq!(tile.len(), 16 * 16);
    assert_eq!(tile[0], 7.0);
    assert!(tile[1..].iter().all(|v| *v == 0.0));
    Ok(())
  }

  #[test]
  fn grid_700x600() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let grid = TileGrid::new(700, 600, 512)?;
    assert_eq!((grid.tile_cols(), grid.tile_rows()), (2, 2));
    assert_eq!(grid.tile_count(), 4);
    assert_eq!(grid.extent(0), TileExtent { x0: 0, y0: 0, width: 512, height: 512 });
    assert_eq!(grid.extent(1), TileExtent { x0: 512, y0: 0, width: 188, height: 512 });
    assert_eq!(grid.extent(3), TileExtent { x0: 512, y0: 512, width: 188, height: 88 });
    Ok(())
  }

  #[test]
  fn zero_tile_size_is_rejected() {
    assert!(matches!(TileGrid::new(700, 600, 0), Err(GeoTilerError::InvalidInput(_))));
  }

  #[test]
  fn tiles_are_band_interleaved() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let w = 5;
    let h = 3;
    let a = RasterBand::new("A", w, h, (0..15).map(|v| v as f32).collect())?;
    let b = RasterBand::new("B", w, h, (0..15).map(|v| 100.0 + v as f32).collect())?;
    let image = RasterImage::new(vec![a, b])?;
    let tiler = BipTiler::new(&image, 4)?;
    assert_eq!(tiler.grid().tile_count(), 2);

    let t0 = tiler.tile(0);
    assert_eq!(t0.len(), 4 * 4 * 2);
    // Pixel (1, 2) of the raster
    let di = (2 * 4 + 1) * 2;
    assert_eq!(&t0[di..di + 2], &[11.0, 111.0]);
    // Row 3 lies outside the raster
    assert!(t0[3 * 4 * 2..].iter().all(|v| *v == 0.0));

    // Right edge tile only has column 4 valid
    let t1 = tiler.tile(1);
    assert_eq!(&t1[0..2], &[4.0, 104.0]);
    assert_eq!(&t1[2..8], &[0.0; 6]);
    assert_eq!(&t1[8..10], &[9.0, 109.0]);
    Ok(())
  }
}
