// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

use super::{LITTLE_ENDIAN_MARKER, LayoutPlan, Placement, TIFF_MAGIC};
use crate::{GeoTilerError, Result};

fn region(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
  let size = buf.len();
  offset
    .checked_add(len)
    .and_then(|end| buf.get_mut(offset..end))
    .ok_or_else(|| GeoTilerError::LayoutInconsistency(format!("Write of {} bytes at {} exceeds buffer of {} bytes", len, offset, size)))
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
  LittleEndian::write_u16(region(buf, offset, 2)?, value);
  Ok(())
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
  LittleEndian::write_u32(region(buf, offset, 4)?, value);
  Ok(())
}

/// Write `plan` and the tile payloads into a single little-endian buffer.
///
/// `tiles` must be in tile index order and match the planned byte counts.
/// Payloads are copied into disjoint sub-slices in parallel.
pub fn serialize<T>(plan: &LayoutPlan, tiles: &[T]) -> Result<Vec<u8>>
where
  T: AsRef<[u8]> + Sync,
{
  if tiles.len() != plan.tile_offsets().len() {
    return Err(GeoTilerError::LayoutInconsistency(format!(
      "Layout planned for {} tiles, got {}",
      plan.tile_offsets().len(),
      tiles.len()
    )));
  }
  if let Some((i, _)) = tiles
    .iter()
    .zip(plan.tile_byte_counts())
    .enumerate()
    .find(|(_, (tile, count))| tile.as_ref().len() != **count as usize)
  {
    return Err(GeoTilerError::LayoutInconsistency(format!("Tile {} length disagrees with planned byte count", i)));
  }

  let mut buf = vec![0_u8; plan.file_size() as usize];

  region(&mut buf, 0, 2)?.copy_from_slice(&LITTLE_ENDIAN_MARKER);
  put_u16(&mut buf, 2, TIFF_MAGIC)?;
  put_u32(&mut buf, 4, plan.ifd_offset())?;

  let mut pos = plan.ifd_offset() as usize;
  put_u16(&mut buf, pos, plan.entries().len() as u16)?;
  pos += 2;
  for pe in plan.entries() {
    let entry = &pe.entry;
    put_u16(&mut buf, pos, entry.tag)?;
    put_u16(&mut buf, pos + 2, entry.field_type().into())?;
    put_u32(&mut buf, pos + 4, entry.count() as u32)?;
    match pe.placement {
      Placement::Inline => {
        entry.value.write_le(region(&mut buf, pos + 8, 4)?)?;
      }
      Placement::Overflow { offset, span } => {
        put_u32(&mut buf, pos + 8, offset)?;
        entry.value.write_le(region(&mut buf, offset as usize, span as usize)?)?;
      }
      Placement::InlineReserved { offset, span } => {
        entry.value.write_le(region(&mut buf, pos + 8, 4)?)?;
        entry.value.write_le(region(&mut buf, offset as usize, span as usize)?)?;
      }
    }
    pos += 12;
  }
  // No further IFD
  put_u32(&mut buf, pos, 0)?;

  let base = plan.tile_data_offset() as usize;
  let total: usize = tiles.iter().map(|t| t.as_ref().len()).sum();
  let mut rest = region(&mut buf, base, total)?;
  let mut jobs = Vec::with_capacity(tiles.len());
  for (tile, offset) in tiles.iter().zip(plan.tile_offsets()) {
    let start = base + (total - rest.len());
    if start != *offset as usize {
      return Err(GeoTilerError::LayoutInconsistency(format!("Tile planned at {}, payload cursor at {}", offset, start)));
    }
    let (dst, tail) = std::mem::take(&mut rest).split_at_mut(tile.as_ref().len());
    jobs.push((dst, tile.as_ref()));
    rest = tail;
  }
  jobs.into_par_iter().for_each(|(dst, src)| dst.copy_from_slice(src));

  Ok(buf)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::formats::tiff::{Entry, GeoTiffTag};

  fn plan(lengths: &[usize]) -> Result<LayoutPlan> {
    let entries = vec![
      Entry::new(GeoTiffTag::ImageWidth, 3_u32),
      Entry::new(GeoTiffTag::BitsPerSample, vec![32_u16; 3]),
      Entry::new(GeoTiffTag::TileOffsets, vec![0_u32; lengths.len()]),
      Entry::new(GeoTiffTag::TileByteCounts, lengths.iter().map(|l| *l as u32).collect::<Vec<u32>>()),
    ];
    LayoutPlan::new(entries, lengths)
  }

  #[test]
  fn header_and_directory_bytes() -> std::result::Result<(), Box<dyn std::error::Error>> {
    crate::init_test_logger();
    let plan = plan(&[3])?;
    let buf = serialize(&plan, &[[0xAA_u8, 0xBB, 0xCC]])?;
    assert_eq!(buf.len(), plan.file_size() as usize);
    assert_eq!(&buf[0..8], &[b'I', b'I', 42, 0, 8, 0, 0, 0]);
    // Entry count
    assert_eq!(&buf[8..10], &[4, 0]);
    // ImageWidth: tag 256, LONG, count 1, value 3
    assert_eq!(&buf[10..22], &[0, 1, 4, 0, 1, 0, 0, 0, 3, 0, 0, 0]);
    // BitsPerSample points into the overflow region
    let overflow = plan.overflow_offset() as usize;
    assert_eq!(LittleEndian::read_u32(&buf[22 + 8..22 + 12]), overflow as u32);
    assert_eq!(&buf[overflow..overflow + 6], &[32, 0, 32, 0, 32, 0]);
    // Single tile offset is stored inline
    let tile_data = plan.tile_data_offset();
    assert_eq!(LittleEndian::read_u32(&buf[34 + 8..34 + 12]), tile_data);
    // Next IFD pointer
    assert_eq!(&buf[58..62], &[0, 0, 0, 0]);
    assert_eq!(&buf[tile_data as usize..], &[0xAA, 0xBB, 0xCC]);
    Ok(())
  }

  #[test]
  fn payloads_in_tile_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let tiles = vec![vec![1_u8; 5], vec![2_u8; 1], vec![3_u8; 8]];
    let plan = plan(&[5, 1, 8])?;
    let buf = serialize(&plan, &tiles)?;
    for (tile, offset) in tiles.iter().zip(plan.tile_offsets()) {
      assert_eq!(&buf[*offset as usize..*offset as usize + tile.len()], tile.as_slice());
    }
    Ok(())
  }

  #[test]
  fn rejects_tiles_not_matching_plan() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let plan = plan(&[5, 1])?;
    assert!(matches!(serialize(&plan, &[vec![1_u8; 5]]), Err(GeoTilerError::LayoutInconsistency(_))));
    assert!(matches!(serialize(&plan, &[vec![1_u8; 5], vec![2_u8; 2]]), Err(GeoTilerError::LayoutInconsistency(_))));
    Ok(())
  }
}
