// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Absolute byte layout of a single-IFD TIFF file.
//!
//! The file is laid out as header, IFD, overflow region, tile payloads.
//! Tile offsets are only known once all compressed tile lengths are
//! known, the plan is therefore computed after compression and is
//! immutable afterwards.

use itertools::Itertools;
use log::debug;

use super::{Entry, GeoTiffTag, HEADER_SIZE, Value, ifd_size};
use crate::{GeoTilerError, Result};

/// Where the value of a directory entry is stored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
  /// Value is stored in the 4 byte field of the entry
  Inline,
  /// Value is stored at `offset` in the overflow region, the entry
  /// field holds the offset
  Overflow { offset: u32, span: u32 },
  /// Overflow space is reserved and filled, but the value is small
  /// enough that readers expect it in the entry field
  InlineReserved { offset: u32, span: u32 },
}

impl Placement {
  pub fn overflow_offset(&self) -> Option<u32> {
    match *self {
      Self::Inline => None,
      Self::Overflow { offset, .. } | Self::InlineReserved { offset, .. } => Some(offset),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedEntry {
  pub entry: Entry,
  pub placement: Placement,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutPlan {
  ifd_offset: u32,
  overflow_offset: u32,
  tile_data_offset: u32,
  file_size: u32,
  entries: Vec<PlannedEntry>,
  tile_offsets: Vec<u32>,
  tile_byte_counts: Vec<u32>,
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
  u32::try_from(value).map_err(|_| GeoTilerError::AddressingOverflow(format!("{} at {} exceeds 32 bit file offsets", what, value)))
}

/// Spans in the overflow region start on word boundaries
fn even(size: u64) -> u64 {
  size + (size & 1)
}

impl LayoutPlan {
  /// Plan the layout for `entries` (strictly ascending by tag) followed
  /// by tiles of the given compressed lengths, in tile index order.
  ///
  /// The value of the TileOffsets entry is replaced with the resolved
  /// absolute tile offsets.
  pub fn new(entries: Vec<Entry>, tile_lengths: &[usize]) -> Result<Self> {
    if let Some((a, b)) = entries.iter().tuple_windows().find(|(a, b)| a.tag >= b.tag) {
      return Err(GeoTilerError::LayoutInconsistency(format!(
        "Directory entries not strictly ascending: {} followed by {}",
        a.tag, b.tag
      )));
    }
    if entries.len() > u16::MAX as usize {
      return Err(GeoTilerError::LayoutInconsistency(format!("Too many directory entries: {}", entries.len())));
    }
    if let Some(empty) = entries.iter().find(|e| e.count() == 0) {
      return Err(GeoTilerError::LayoutInconsistency(format!("Entry {} has no values", empty.tag_name())));
    }

    match entries.iter().find(|e| e.is(GeoTiffTag::TileOffsets)) {
      Some(e) if e.count() != tile_lengths.len() => {
        return Err(GeoTilerError::LayoutInconsistency(format!(
          "TileOffsets has {} slots for {} tiles",
          e.count(),
          tile_lengths.len()
        )));
      }
      None if !tile_lengths.is_empty() => {
        return Err(GeoTilerError::LayoutInconsistency("Tiles given without TileOffsets entry".to_string()));
      }
      _ => {}
    }
    if let Some(e) = entries.iter().find(|e| e.is(GeoTiffTag::TileByteCounts)) {
      let counts = e.value.as_u32_vec().unwrap_or_default();
      if counts.len() != tile_lengths.len() || counts.iter().zip(tile_lengths).any(|(c, l)| *c as usize != *l) {
        return Err(GeoTilerError::LayoutInconsistency("TileByteCounts disagrees with compressed tile lengths".to_string()));
      }
    }

    let ifd_offset = HEADER_SIZE as u64;
    let overflow_offset = ifd_offset + ifd_size(entries.len());

    let mut cursor = overflow_offset;
    let mut planned = Vec::with_capacity(entries.len());
    for entry in entries {
      let size = entry.byte_size() as u64;
      let tile_offsets = entry.is(GeoTiffTag::TileOffsets);
      let placement = if entry.value.fits_inline() && !tile_offsets {
        Placement::Inline
      } else {
        let offset = to_u32(cursor, &format!("Value of {}", entry.tag_name()))?;
        let span = to_u32(even(size), &format!("Span of {}", entry.tag_name()))?;
        cursor += even(size);
        if entry.value.fits_inline() {
          Placement::InlineReserved { offset, span }
        } else {
          Placement::Overflow { offset, span }
        }
      };
      planned.push(PlannedEntry { entry, placement });
    }

    let tile_data_offset = cursor;
    let mut tile_offsets = Vec::with_capacity(tile_lengths.len());
    let mut tile_byte_counts = Vec::with_capacity(tile_lengths.len());
    let mut running = tile_data_offset;
    for (i, len) in tile_lengths.iter().enumerate() {
      tile_offsets.push(to_u32(running, &format!("Tile {}", i))?);
      tile_byte_counts.push(to_u32(*len as u64, &format!("Byte count of tile {}", i))?);
      running += *len as u64;
    }
    let file_size = to_u32(running, "End of file")?;

    if let Some(pe) = planned.iter_mut().find(|pe| pe.entry.is(GeoTiffTag::TileOffsets)) {
      pe.entry.value = Value::Long(tile_offsets.clone());
    }

    debug!(
      "Layout: IFD at {} ({} entries), overflow {} bytes at {}, tile data {} bytes at {}, file size {}",
      ifd_offset,
      planned.len(),
      tile_data_offset - overflow_offset,
      overflow_offset,
      running - tile_data_offset,
      tile_data_offset,
      file_size
    );

    Ok(Self {
      ifd_offset: ifd_offset as u32,
      overflow_offset: to_u32(overflow_offset, "Overflow region")?,
      tile_data_offset: to_u32(tile_data_offset, "Tile data")?,
      file_size,
      entries: planned,
      tile_offsets,
      tile_byte_counts,
    })
  }

  pub fn ifd_offset(&self) -> u32 {
    self.ifd_offset
  }

  pub fn overflow_offset(&self) -> u32 {
    self.overflow_offset
  }

  pub fn overflow_size(&self) -> u32 {
    self.tile_data_offset - self.overflow_offset
  }

  pub fn tile_data_offset(&self) -> u32 {
    self.tile_data_offset
  }

  pub fn file_size(&self) -> u32 {
    self.file_size
  }

  pub fn entries(&self) -> &[PlannedEntry] {
    &self.entries
  }

  pub fn entry(&self, tag: GeoTiffTag) -> Option<&PlannedEntry> {
    self.entries.iter().find(|pe| pe.entry.is(tag))
  }

  /// Absolute offset of each tile payload
  pub fn tile_offsets(&self) -> &[u32] {
    &self.tile_offsets
  }

  pub fn tile_byte_counts(&self) -> &[u32] {
    &self.tile_byte_counts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entries(tiles: usize, counts: Vec<u32>) -> Vec<Entry> {
    vec![
      Entry::new(GeoTiffTag::ImageWidth, 700_u32),
      Entry::new(GeoTiffTag::BitsPerSample, vec![32_u16; 3]),
      Entry::new(GeoTiffTag::TileOffsets, vec![0_u32; tiles]),
      Entry::new(GeoTiffTag::TileByteCounts, counts),
      Entry::new(GeoTiffTag::ModelPixelScale, [20.0, 20.0, 0.0]),
    ]
  }

  #[test]
  fn offsets_of_single_tile_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let plan = LayoutPlan::new(entries(1, vec![11]), &[11])?;
    assert_eq!(plan.ifd_offset(), 8);
    // 8 + 2 + 5 * 12 + 4
    assert_eq!(plan.overflow_offset(), 74);

    let placements: Vec<Placement> = plan.entries().iter().map(|pe| pe.placement).collect();
    assert_eq!(
      placements,
      vec![
        Placement::Inline,
        Placement::Overflow { offset: 74, span: 6 },
        Placement::InlineReserved { offset: 80, span: 4 },
        Placement::Inline,
        Placement::Overflow { offset: 84, span: 24 },
      ]
    );
    assert_eq!(plan.tile_data_offset(), 108);
    assert_eq!(plan.overflow_size(), 34);
    assert_eq!(plan.tile_offsets(), &[108]);
    assert_eq!(plan.file_size(), 119);
    assert_eq!(plan.entry(GeoTiffTag::TileOffsets).map(|pe| &pe.entry.value), Some(&Value::Long(vec![108])));
    Ok(())
  }

  #[test]
  fn running_tile_offsets() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let lengths = [100, 57, 3, 9000];
    let plan = LayoutPlan::new(entries(4, vec![100, 57, 3, 9000]), &lengths)?;
    let base = plan.tile_data_offset();
    assert_eq!(plan.tile_offsets(), &[base, base + 100, base + 157, base + 160]);
    assert_eq!(plan.file_size(), base + 9160);
    assert_eq!(plan.tile_byte_counts(), &[100, 57, 3, 9000]);
    assert!(plan.entries().iter().filter_map(|pe| pe.placement.overflow_offset()).all(|o| o % 2 == 0));
    Ok(())
  }

  #[test]
  fn rejects_unsorted_and_mismatched_entries() {
    let mut unsorted = entries(1, vec![11]);
    unsorted.swap(0, 1);
    assert!(matches!(LayoutPlan::new(unsorted, &[11]), Err(GeoTilerError::LayoutInconsistency(_))));

    let mut duplicate = entries(1, vec![11]);
    duplicate.insert(1, Entry::new(GeoTiffTag::ImageWidth, 1_u32));
    assert!(matches!(LayoutPlan::new(duplicate, &[11]), Err(GeoTilerError::LayoutInconsistency(_))));

    assert!(matches!(LayoutPlan::new(entries(2, vec![11, 12]), &[11]), Err(GeoTilerError::LayoutInconsistency(_))));
    assert!(matches!(LayoutPlan::new(entries(1, vec![10]), &[11]), Err(GeoTilerError::LayoutInconsistency(_))));
  }

  #[test]
  fn offsets_beyond_4gib_overflow() {
    let lengths = [u32::MAX as usize - 64, 128];
    let res = LayoutPlan::new(entries(2, vec![u32::MAX - 64, 128]), &lengths);
    assert!(matches!(res, Err(GeoTilerError::AddressingOverflow(_))));
  }
}
