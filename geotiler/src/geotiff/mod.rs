// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Tiled float32 GeoTIFF encoding.
//!
//! Encoding is a single pass: compress tiles, build directory entries,
//! plan the layout, serialize. Nothing is written to disk before the
//! whole file exists in memory.

use std::{
  fs::File,
  io::Write,
  path::{Path, PathBuf},
};

use log::{debug, info};

mod georef;
pub mod geokeys;
pub mod ifd;
pub mod inspect;

pub use georef::GeoReference;
pub use ifd::{IfdBuilder, ImageDirectory};
pub use inspect::{GeoTiffInfo, inspect, read_bands};

use crate::{
  GeoTilerError, Result,
  bounds::{BoundingBox, Spacing},
  compress::compress_tiles,
  config::ExportParams,
  formats::tiff::{LayoutPlan, serialize},
  multilook::multilook_image,
  raster::RasterImage,
  tiles::DEFAULT_TILE_SIZE,
};

/// Encoder for a single multi-band GeoTIFF image
pub struct GeoTiffEncoder<'a> {
  image: &'a RasterImage,
  georef: GeoReference,
  tile_size: usize,
  threads: Option<usize>,
}

impl<'a> GeoTiffEncoder<'a> {
  pub fn new(image: &'a RasterImage, georef: GeoReference) -> Self {
    Self {
      image,
      georef,
      tile_size: DEFAULT_TILE_SIZE,
      threads: None,
    }
  }

  pub fn tile_size(mut self, tile_size: usize) -> Self {
    self.tile_size = tile_size;
    self
  }

  /// Compress on a dedicated pool of `threads` workers
  pub fn threads(mut self, threads: Option<usize>) -> Self {
    self.threads = threads;
    self
  }

  pub fn georef(&self) -> &GeoReference {
    &self.georef
  }

  fn validate(&self) -> Result<()> {
    if self.tile_size == 0 || self.tile_size % 16 != 0 {
      return Err(GeoTilerError::InvalidInput(format!("Tile size {} is not a positive multiple of 16", self.tile_size)));
    }
    if self.threads == Some(0) {
      return Err(GeoTilerError::InvalidInput("Thread count must be at least 1".to_string()));
    }
    self.georef.pixel_scale(self.image.width(), self.image.height())?;
    Ok(())
  }

  /// Encode the complete file into memory
  pub fn encode(&self) -> Result<Vec<u8>> {
    self.validate()?;
    let pool = self
      .threads
      .map(|threads| rayon::ThreadPoolBuilder::new().num_threads(threads).build())
      .transpose()?;

    let tiles = compress_tiles(self.image, self.tile_size, pool.as_ref())?;
    let directory = IfdBuilder::new(self.image.width(), self.image.height(), &tiles, &self.georef).build()?;
    let lengths: Vec<usize> = tiles.tiles().iter().map(|t| t.len()).collect();
    let plan = LayoutPlan::new(directory.into_entries(), &lengths)?;
    let payloads: Vec<&[u8]> = tiles.tiles().iter().map(|t| t.data.as_slice()).collect();
    let buf = serialize(&plan, &payloads)?;

    info!(
      "Encoded {}x{} raster with {} bands into {} tiles, {} bytes (EPSG:{})",
      self.image.width(),
      self.image.height(),
      self.image.band_count(),
      tiles.len(),
      buf.len(),
      self.georef.epsg()
    );
    Ok(buf)
  }

  /// Encode and write to `path`. The destination is only replaced once
  /// the complete file has been written.
  pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
    let buf = self.encode()?;
    write_atomic(path.as_ref(), &buf)
  }
}

fn temp_path(path: &Path) -> PathBuf {
  let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
  path.with_file_name(format!(".{}.{}.partial", name, std::process::id()))
}

/// Write `buf` into a temporary sibling of `path`, then rename it
pub(crate) fn write_atomic(path: &Path, buf: &[u8]) -> Result<()> {
  let tmp = temp_path(path);
  let res = File::create(&tmp)
    .and_then(|mut file| {
      file.write_all(buf)?;
      file.sync_all()
    })
    .and_then(|_| std::fs::rename(&tmp, path));
  if let Err(err) = res {
    if let Err(cleanup) = std::fs::remove_file(&tmp) {
      debug!("Failed to remove temporary file {}: {}", tmp.display(), cleanup);
    }
    return Err(err.into());
  }
  debug!("Wrote {} bytes to {}", buf.len(), path.display());
  Ok(())
}

/// Complete export of a set of bands: bounds correction, multilook,
/// row limit and encoding.
#[derive(Debug, Clone)]
pub struct ExportRequest {
  pub image: RasterImage,
  /// Bounds in the convention given by `params.convention`
  pub bounds: BoundingBox,
  /// Source pixel spacing, required for pixel center bounds
  pub spacing: Option<Spacing>,
  pub epsg: u32,
  pub params: ExportParams,
}

/// Result of [`export`]: the file contents and what was written
#[derive(Debug, Clone)]
pub struct ExportOutput {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
  /// Multilook factor after the width limit was applied
  pub multilook: usize,
  pub georef: GeoReference,
}

pub fn export(request: &ExportRequest) -> Result<ExportOutput> {
  let params = &request.params;
  params.validate()?;
  let mut georef = GeoReference::new(request.bounds, params.convention, request.spacing, request.epsg)?;

  let multilook = params.effective_multilook(request.image.width());
  if multilook != params.multilook {
    info!(
      "Multilook raised from {} to {} to keep width {} within {}",
      params.multilook,
      multilook,
      request.image.width(),
      params.max_width
    );
  }

  // Samples <= 0 are no-data on every path, including multilook 1
  let image = multilook_image(&request.image, multilook, params.max_rows)?;
  let full_rows = request.image.height() / multilook;
  if image.height() < full_rows {
    debug!("Keeping {} of {} rows, adjusting bounds", image.height(), full_rows);
    georef = georef.crop_rows(full_rows, image.height())?;
  }

  let data = GeoTiffEncoder::new(&image, georef)
    .tile_size(params.tile_size)
    .threads(params.effective_threads())
    .encode()?;
  Ok(ExportOutput {
    data,
    width: image.width(),
    height: image.height(),
    multilook,
    georef,
  })
}

/// Run [`export`] and write the result to `path`
pub fn export_file(request: &ExportRequest, path: impl AsRef<Path>) -> Result<ExportOutput> {
  let output = export(request)?;
  write_atomic(path.as_ref(), &output.data)?;
  Ok(output)
}
