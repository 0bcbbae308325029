// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Read-back of tiled float GeoTIFF files produced by the encoder.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use libflate::zlib::Decoder;
use rayon::prelude::*;
use serde::Serialize;

use super::geokeys::{GT_RASTER_TYPE_GEO_KEY, GeoKeyDirectory, ModelType};
use crate::{
  GeoTilerError, Result,
  bounds::{BoundingBox, GeoTransform, PixelScale},
  formats::tiff::{CompressionMethod, GeoTiffTag, PlanarConfiguration, SampleFormat, TiffReader},
  tiles::TileGrid,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corners {
  pub upper_left: (f64, f64),
  pub upper_right: (f64, f64),
  pub lower_left: (f64, f64),
  pub lower_right: (f64, f64),
}

/// Summary of a GeoTIFF file, serializable for reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoTiffInfo {
  pub file_size: usize,
  pub width: usize,
  pub height: usize,
  pub bands: usize,
  pub bits_per_sample: Vec<u16>,
  pub sample_format: Vec<u16>,
  pub compression: u16,
  pub planar_configuration: u16,
  pub tile_width: usize,
  pub tile_height: usize,
  pub tiles_across: usize,
  pub tiles_down: usize,
  pub tile_count: usize,
  pub tile_byte_counts: Vec<u32>,
  pub epsg: Option<u16>,
  pub model_type: Option<ModelType>,
  pub raster_type: Option<u16>,
  pub pixel_scale: PixelScale,
  pub tiepoint: Vec<f64>,
  pub transform: GeoTransform,
  pub bounds: BoundingBox,
  pub corners: Corners,
}

fn shorts(reader: &TiffReader, tag: GeoTiffTag) -> Result<Vec<u16>> {
  Ok(reader.value(tag)?.as_u32_vec().unwrap_or_default().into_iter().map(|v| v as u16).collect())
}

fn doubles(reader: &TiffReader, tag: GeoTiffTag, count: usize) -> Result<Vec<f64>> {
  let value = reader.value(tag)?;
  (0..count)
    .map(|i| value.get_f64(i))
    .collect::<Option<Vec<f64>>>()
    .ok_or_else(|| GeoTilerError::Format(format!("Tag {} needs {} values", tag.name(), count)))
}

fn longs(reader: &TiffReader, tag: GeoTiffTag) -> Result<Vec<u32>> {
  reader
    .value(tag)?
    .as_u32_vec()
    .ok_or_else(|| GeoTilerError::Format(format!("Tag {} is not an integer array", tag.name())))
}

/// Parse the directory and georeferencing of `buf`
pub fn inspect(buf: &[u8]) -> Result<GeoTiffInfo> {
  let reader = TiffReader::new(buf)?;
  let width = reader.get_u32(GeoTiffTag::ImageWidth)? as usize;
  let height = reader.get_u32(GeoTiffTag::ImageLength)? as usize;
  let bands = reader.get_u32(GeoTiffTag::SamplesPerPixel)? as usize;
  let tile_width = reader.get_u32(GeoTiffTag::TileWidth)? as usize;
  let tile_height = reader.get_u32(GeoTiffTag::TileLength)? as usize;
  if width == 0 || height == 0 || bands == 0 || tile_width == 0 || tile_height == 0 {
    return Err(GeoTilerError::Format("Zero image, band or tile dimension".to_string()));
  }

  let scale = doubles(&reader, GeoTiffTag::ModelPixelScale, 3)?;
  let tiepoint = doubles(&reader, GeoTiffTag::ModelTiepoint, 6)?;
  let pixel_scale = PixelScale { x: scale[0], y: scale[1] };
  // Raster point (i, j) ties to model point (x, y)
  let origin_x = tiepoint[3] - tiepoint[0] * pixel_scale.x;
  let origin_y = tiepoint[4] + tiepoint[1] * pixel_scale.y;
  let transform = GeoTransform::from_tiepoint(origin_x, origin_y, pixel_scale);
  let [ul, ur, ll, lr] = transform.corners(width, height);

  let geokeys = GeoKeyDirectory::from_shorts(&shorts(&reader, GeoTiffTag::GeoKeyDirectory)?)?;

  Ok(GeoTiffInfo {
    file_size: buf.len(),
    width,
    height,
    bands,
    bits_per_sample: shorts(&reader, GeoTiffTag::BitsPerSample)?,
    sample_format: shorts(&reader, GeoTiffTag::SampleFormat)?,
    compression: reader.get_u32(GeoTiffTag::Compression)? as u16,
    planar_configuration: reader.get_u32(GeoTiffTag::PlanarConfiguration)? as u16,
    tile_width,
    tile_height,
    tiles_across: width.div_ceil(tile_width),
    tiles_down: height.div_ceil(tile_height),
    tile_count: reader.value(GeoTiffTag::TileOffsets)?.count(),
    tile_byte_counts: longs(&reader, GeoTiffTag::TileByteCounts)?,
    epsg: geokeys.epsg(),
    model_type: geokeys.model_type(),
    raster_type: geokeys.get(GT_RASTER_TYPE_GEO_KEY),
    pixel_scale,
    tiepoint,
    transform,
    bounds: transform.bounds(width, height),
    corners: Corners {
      upper_left: ul,
      upper_right: ur,
      lower_left: ll,
      lower_right: lr,
    },
  })
}

/// Decode all tiles of `buf` and return one row-major array per band,
/// with tile padding removed.
pub fn read_bands(buf: &[u8]) -> Result<Vec<Vec<f32>>> {
  let info = inspect(buf)?;
  if info.compression != CompressionMethod::Deflate as u16
    || info.planar_configuration != PlanarConfiguration::Chunky as u16
    || info.sample_format.iter().any(|f| *f != SampleFormat::IEEEFP as u16)
    || info.bits_per_sample.iter().any(|b| *b != 32)
  {
    return Err(GeoTilerError::Format("Only chunky DEFLATE compressed float32 tiles are supported".to_string()));
  }
  if info.tile_width != info.tile_height {
    return Err(GeoTilerError::Format(format!("Non-square tiles {}x{}", info.tile_width, info.tile_height)));
  }

  let reader = TiffReader::new(buf)?;
  let offsets = longs(&reader, GeoTiffTag::TileOffsets)?;
  let grid = TileGrid::new(info.width, info.height, info.tile_width)?;
  if offsets.len() != grid.tile_count() || info.tile_byte_counts.len() != grid.tile_count() {
    return Err(GeoTilerError::Format(format!("Expected {} tiles, directory lists {}", grid.tile_count(), offsets.len())));
  }

  let raw_len = grid.samples_per_tile(info.bands) * size_of::<f32>();
  let tiles = offsets
    .par_iter()
    .zip(info.tile_byte_counts.par_iter())
    .enumerate()
    .map(|(index, (offset, count))| -> Result<Vec<f32>> {
      let mut raw = Vec::with_capacity(raw_len);
      Decoder::new(reader.data(*offset as usize, *count as usize)?)?.read_to_end(&mut raw)?;
      if raw.len() != raw_len {
        return Err(GeoTilerError::Format(format!("Tile {} decodes to {} bytes, expected {}", index, raw.len(), raw_len)));
      }
      let mut samples = vec![0.0_f32; raw_len / size_of::<f32>()];
      LittleEndian::read_f32_into(&raw, &mut samples);
      Ok(samples)
    })
    .collect::<Result<Vec<Vec<f32>>>>()?;

  let nb = info.bands;
  let ts = grid.tile_size();
  let mut bands = vec![vec![0.0_f32; info.width * info.height]; nb];
  for (index, tile) in tiles.iter().enumerate() {
    let ext = grid.extent(index);
    for row in 0..ext.height {
      let src = &tile[row * ts * nb..(row * ts + ext.width) * nb];
      let dst = (ext.y0 + row) * info.width + ext.x0;
      for (px, pixel) in src.chunks_exact(nb).enumerate() {
        for (band, sample) in bands.iter_mut().zip(pixel) {
          band[dst + px] = *sample;
        }
      }
    }
  }
  Ok(bands)
}
