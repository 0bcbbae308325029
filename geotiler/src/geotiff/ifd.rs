// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use itertools::Itertools;

use super::GeoReference;
use crate::{
  GeoTilerError, Result,
  compress::TileSet,
  formats::tiff::{CompressionMethod, Entry, GeoTiffTag, PhotometricInterpretation, PlanarConfiguration, SampleFormat, TAG_TABLE, TagSpec, Value},
};

/// Directory entries of the single image, ascending by tag id
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDirectory {
  entries: Vec<Entry>,
}

impl ImageDirectory {
  pub fn entries(&self) -> &[Entry] {
    &self.entries
  }

  pub fn get(&self, tag: GeoTiffTag) -> Option<&Entry> {
    self.entries.iter().find(|e| e.is(tag))
  }

  pub fn into_entries(self) -> Vec<Entry> {
    self.entries
  }
}

/// Builds the directory entries for a tiled float raster.
///
/// The TileOffsets entry only holds placeholders, the layout planner
/// resolves the real offsets.
pub struct IfdBuilder<'a> {
  width: usize,
  height: usize,
  tiles: &'a TileSet,
  georef: &'a GeoReference,
}

fn long(value: usize, what: &str) -> Result<u32> {
  u32::try_from(value).map_err(|_| GeoTilerError::InvalidInput(format!("{} {} exceeds 32 bit range", what, value)))
}

impl<'a> IfdBuilder<'a> {
  pub fn new(width: usize, height: usize, tiles: &'a TileSet, georef: &'a GeoReference) -> Self {
    Self { width, height, tiles, georef }
  }

  fn value(&self, tag: GeoTiffTag) -> Result<Value> {
    let bands = self.tiles.band_count();
    let tile_size = self.tiles.grid().tile_size();
    Ok(match tag {
      GeoTiffTag::ImageWidth => long(self.width, "Width")?.into(),
      GeoTiffTag::ImageLength => long(self.height, "Height")?.into(),
      GeoTiffTag::BitsPerSample => vec![32_u16; bands].into(),
      GeoTiffTag::Compression => CompressionMethod::Deflate.into(),
      GeoTiffTag::PhotometricInterpretation => PhotometricInterpretation::BlackIsZero.into(),
      GeoTiffTag::SamplesPerPixel => (bands as u16).into(),
      GeoTiffTag::PlanarConfiguration => PlanarConfiguration::Chunky.into(),
      GeoTiffTag::TileWidth | GeoTiffTag::TileLength => long(tile_size, "Tile size")?.into(),
      GeoTiffTag::TileOffsets => vec![0_u32; self.tiles.len()].into(),
      GeoTiffTag::TileByteCounts => self.tiles.byte_counts()?.into(),
      GeoTiffTag::SampleFormat => vec![SampleFormat::IEEEFP as u16; bands].into(),
      GeoTiffTag::ModelPixelScale => {
        let scale = self.georef.pixel_scale(self.width, self.height)?;
        [scale.x, scale.y, 0.0].into()
      }
      GeoTiffTag::ModelTiepoint => self.georef.tiepoint().into(),
      GeoTiffTag::GeoKeyDirectory => self.georef.geokeys().to_shorts().into(),
    })
  }

  fn check(spec: &TagSpec, entry: &Entry, bands: usize, tiles: usize) -> Result<()> {
    let count = spec.count.resolve(bands, tiles);
    if entry.field_type() != spec.field_type || entry.count() != count {
      return Err(GeoTilerError::LayoutInconsistency(format!(
        "Entry {} is {} x {}, expected {} x {}",
        spec.tag.name(),
        entry.count(),
        entry.field_type().name(),
        count,
        spec.field_type.name()
      )));
    }
    Ok(())
  }

  pub fn build(&self) -> Result<ImageDirectory> {
    if self.tiles.band_count() > u16::MAX as usize {
      return Err(GeoTilerError::InvalidInput(format!("Too many bands: {}", self.tiles.band_count())));
    }
    let entries = TAG_TABLE
      .iter()
      .map(|spec| {
        let entry = Entry::new(spec.tag, self.value(spec.tag)?);
        Self::check(spec, &entry, self.tiles.band_count(), self.tiles.len())?;
        Ok(entry)
      })
      .collect::<Result<Vec<Entry>>>()?;

    if !entries.iter().tuple_windows().all(|(a, b)| a.tag < b.tag) {
      return Err(GeoTilerError::LayoutInconsistency("Directory entries are not strictly ascending".to_string()));
    }
    Ok(ImageDirectory { entries })
  }
}
