// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::{Path, PathBuf};
use std::time::Instant;

use byteorder::{ByteOrder, LittleEndian};
use clap::ArgMatches;
use geotiler::{
  BoundingBox, BoundsConvention, ExportParams, RasterBand, RasterImage, Spacing,
  geotiff::{ExportRequest, export_file},
};
use log::{debug, info};

use crate::{AppError, app::BandArg};

fn required<'a, T: Clone + Send + Sync + 'static>(options: &'a ArgMatches, id: &str) -> crate::Result<&'a T> {
  options
    .get_one::<T>(id)
    .ok_or_else(|| AppError::InvalidCmdSwitch(format!("Missing argument '{}'", id)))
}

/// Parameters from an optional TOML file, overridden by command line switches
fn export_params(options: &ArgMatches) -> crate::Result<ExportParams> {
  let mut params = match options.get_one::<PathBuf>("config") {
    Some(path) => ExportParams::from_file(path)?,
    None => ExportParams::default(),
  };
  if let Some(tile_size) = options.get_one::<usize>("tile_size") {
    params.tile_size = *tile_size;
  }
  if let Some(multilook) = options.get_one::<usize>("multilook") {
    params.multilook = *multilook;
  }
  if let Some(max_width) = options.get_one::<usize>("max_width") {
    params.max_width = *max_width;
  }
  if let Some(rows) = options.get_one::<usize>("rows") {
    params.max_rows = Some(*rows);
  }
  if let Some(threads) = options.get_one::<usize>("threads") {
    params.threads = Some(*threads);
  }
  if let Some(convention) = options.get_one::<BoundsConvention>("convention") {
    params.convention = *convention;
  }
  if options.get_flag("edge") {
    params.convention = BoundsConvention::PixelEdge;
  }
  params.validate()?;
  Ok(params)
}

/// Size of a raw band file holding `width` x `height` Float32 samples
fn band_byte_len(width: usize, height: usize) -> crate::Result<usize> {
  width
    .checked_mul(height)
    .and_then(|samples| samples.checked_mul(size_of::<f32>()))
    .ok_or_else(|| AppError::InvalidCmdSwitch(format!("Raster size {}x{} is too large", width, height)))
}

async fn read_band(band: &BandArg, width: usize, height: usize) -> crate::Result<RasterBand> {
  if !band.path.exists() {
    return Err(AppError::NotFound(band.path.clone()));
  }
  let raw = tokio::fs::read(&band.path).await?;
  let expected = band_byte_len(width, height)?;
  if raw.len() != expected {
    return Err(AppError::InvalidCmdSwitch(format!(
      "Band '{}' file {} has {} bytes, expected {} for {}x{} Float32 samples",
      band.name,
      band.path.display(),
      raw.len(),
      expected,
      width,
      height
    )));
  }
  let mut data = vec![0.0_f32; expected / size_of::<f32>()];
  LittleEndian::read_f32_into(&raw, &mut data);
  debug!("Loaded band '{}' from {}", band.name, band.path.display());
  Ok(RasterBand::new(band.name.as_str(), width, height, data)?)
}

/// Entry point for Clap sub command `export`
pub async fn export(options: &ArgMatches) -> crate::Result<()> {
  let now = Instant::now();
  let dest: &PathBuf = required(options, "OUTPUT")?;
  if dest.exists() && !options.get_flag("override") {
    return Err(AppError::AlreadyExists(dest.to_owned()));
  }

  let params = export_params(options)?;
  let width = *required::<usize>(options, "width")?;
  let height = *required::<usize>(options, "height")?;
  let epsg = *required::<u32>(options, "epsg")?;
  let bounds = *required::<BoundingBox>(options, "bounds")?;
  let spacing = options.get_one::<Spacing>("spacing").copied();
  if params.convention == BoundsConvention::PixelCenter && spacing.is_none() {
    return Err(AppError::InvalidCmdSwitch("--spacing is required for pixel center bounds".to_string()));
  }

  let mut bands = Vec::new();
  for band in options.get_many::<BandArg>("band").unwrap_or_default() {
    bands.push(read_band(band, width, height).await?);
  }
  let request = ExportRequest {
    image: RasterImage::new(bands)?,
    bounds,
    spacing,
    epsg,
    params,
  };

  let output = write_output(request, dest.clone()).await?;
  info!(
    "Exported {}x{} GeoTIFF to {} in {:.2}s",
    output.0,
    output.1,
    dest.display(),
    now.elapsed().as_secs_f32()
  );
  Ok(())
}

/// Encoding is CPU bound and runs outside the async workers
async fn write_output(request: ExportRequest, dest: PathBuf) -> crate::Result<(usize, usize)> {
  let output = tokio::task::spawn_blocking(move || export_file(&request, Path::new(&dest))).await??;
  Ok((output.width, output.height))
}
