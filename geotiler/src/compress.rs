// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Tile extraction and DEFLATE compression.
//!
//! Tiles have no data dependency on each other, so they are compressed
//! on a rayon pool. The ordered `collect()` keeps tile index order, the
//! bytes of each tile never depend on the number of threads.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};
use libflate::zlib::{EncodeOptions, Encoder};
use log::debug;
use rayon::prelude::*;

use crate::{
  GeoTilerError, Result,
  raster::RasterImage,
  tiles::{BipTiler, TileGrid},
};

/// Compressed payload of one tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedTile {
  /// Position in the row-major tile grid
  pub index: usize,
  pub data: Vec<u8>,
  /// Length of the uncompressed tile, `tile_size² × bands × 4`
  pub raw_len: usize,
}

impl CompressedTile {
  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

/// All compressed tiles of an image, in tile index order
#[derive(Debug, Clone)]
pub struct TileSet {
  grid: TileGrid,
  band_count: usize,
  tiles: Vec<CompressedTile>,
}

impl TileSet {
  pub fn grid(&self) -> &TileGrid {
    &self.grid
  }

  pub fn band_count(&self) -> usize {
    self.band_count
  }

  pub fn tiles(&self) -> &[CompressedTile] {
    &self.tiles
  }

  pub fn len(&self) -> usize {
    self.tiles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tiles.is_empty()
  }

  /// Sum of all compressed tile lengths
  pub fn total_bytes(&self) -> u64 {
    self.tiles.iter().map(|t| t.len() as u64).sum()
  }

  /// Compressed tile lengths as 32 bit TIFF values
  pub fn byte_counts(&self) -> Result<Vec<u32>> {
    self
      .tiles
      .iter()
      .map(|t| {
        u32::try_from(t.len())
          .map_err(|_| GeoTilerError::AddressingOverflow(format!("Tile {} compressed to {} bytes, exceeds 32 bit byte count", t.index, t.len())))
      })
      .collect()
  }
}

/// Cut `image` into `tile_size` tiles and compress each of them.
///
/// With `pool` set, compression runs inside this pool, otherwise on the
/// global rayon pool.
pub fn compress_tiles(image: &RasterImage, tile_size: usize, pool: Option<&rayon::ThreadPool>) -> Result<TileSet> {
  let tiler = BipTiler::new(image, tile_size)?;
  let grid = *tiler.grid();
  debug!(
    "Tile grid {}x{} ({} tiles of {}x{}) for {}x{} raster, {} bands",
    grid.tile_cols(),
    grid.tile_rows(),
    grid.tile_count(),
    tile_size,
    tile_size,
    image.width(),
    image.height(),
    image.band_count()
  );

  let run = || {
    grid
      .indices()
      .into_par_iter()
      .map(|index| compress_tile(index, &tiler.tile(index)))
      .collect::<Result<Vec<CompressedTile>>>()
  };
  let tiles = match pool {
    Some(pool) => pool.install(run)?,
    None => run()?,
  };

  Ok(TileSet {
    grid,
    band_count: image.band_count(),
    tiles,
  })
}

fn compress_tile(index: usize, samples: &[f32]) -> Result<CompressedTile> {
  let mut raw = vec![0_u8; samples.len() * size_of::<f32>()];
  LittleEndian::write_f32_into(samples, &mut raw);
  let data = deflate(&raw).map_err(|source| GeoTilerError::CompressionFailure { tile: index, source })?;
  Ok(CompressedTile {
    index,
    data,
    raw_len: raw.len(),
  })
}

/// zlib wrapped DEFLATE stream, as expected for TIFF compression 8
pub(crate) fn deflate(raw: &[u8]) -> io::Result<Vec<u8>> {
  let mut encoder = Encoder::with_options(Vec::with_capacity(raw.len() / 4), EncodeOptions::new())?;
  encoder.write_all(raw)?;
  encoder.finish().into_result()
}
