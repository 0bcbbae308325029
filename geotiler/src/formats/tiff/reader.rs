// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use byteorder::{ByteOrder, LittleEndian};

use super::{Entry, FieldType, GeoTiffTag, IFD_ENTRY_SIZE, LITTLE_ENDIAN_MARKER, TIFF_MAGIC, Value};
use crate::{GeoTilerError, Result};

/// Parses the first image directory of a little-endian TIFF buffer
#[derive(Debug)]
pub struct TiffReader<'a> {
  buf: &'a [u8],
  entries: Vec<Entry>,
  next_ifd: u32,
}

fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
  offset
    .checked_add(len)
    .and_then(|end| buf.get(offset..end))
    .ok_or_else(|| GeoTilerError::Format(format!("Read of {} bytes at {} exceeds file of {} bytes", len, offset, buf.len())))
}

impl<'a> TiffReader<'a> {
  pub fn new(buf: &'a [u8]) -> Result<Self> {
    let header = slice(buf, 0, 8)?;
    if header[0..2] != LITTLE_ENDIAN_MARKER {
      return Err(GeoTilerError::Format("Not a little-endian TIFF file".to_string()));
    }
    let magic = LittleEndian::read_u16(&header[2..4]);
    if magic != TIFF_MAGIC {
      return Err(GeoTilerError::Format(format!("Invalid TIFF magic {}", magic)));
    }
    let ifd_offset = LittleEndian::read_u32(&header[4..8]) as usize;
    let count = LittleEndian::read_u16(slice(buf, ifd_offset, 2)?) as usize;

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
      let pos = ifd_offset + 2 + i * IFD_ENTRY_SIZE as usize;
      let raw = slice(buf, pos, IFD_ENTRY_SIZE as usize)?;
      let tag = LittleEndian::read_u16(&raw[0..2]);
      let typ = LittleEndian::read_u16(&raw[2..4]);
      let typ = FieldType::try_from(typ).map_err(|_| GeoTilerError::Format(format!("Tag {} has unsupported field type {}", tag, typ)))?;
      let count = LittleEndian::read_u32(&raw[4..8]) as usize;
      let size = count
        .checked_mul(typ.byte_len())
        .ok_or_else(|| GeoTilerError::Format(format!("Tag {} value count {} overflows", tag, count)))?;
      let data = if size <= 4 {
        &raw[8..12]
      } else {
        slice(buf, LittleEndian::read_u32(&raw[8..12]) as usize, size)?
      };
      entries.push(Entry {
        tag,
        value: Value::read_le(typ, count, data)?,
      });
    }
    let next_ifd = LittleEndian::read_u32(slice(buf, ifd_offset + 2 + count * IFD_ENTRY_SIZE as usize, 4)?);

    Ok(Self { buf, entries, next_ifd })
  }

  pub fn entries(&self) -> &[Entry] {
    &self.entries
  }

  pub fn get_entry(&self, tag: GeoTiffTag) -> Option<&Entry> {
    self.entries.iter().find(|e| e.is(tag))
  }

  /// Entry value, failing if the tag is missing
  pub fn value(&self, tag: GeoTiffTag) -> Result<&Value> {
    self
      .get_entry(tag)
      .map(|e| &e.value)
      .ok_or_else(|| GeoTilerError::Format(format!("Missing tag {}", tag.name())))
  }

  pub fn get_u32(&self, tag: GeoTiffTag) -> Result<u32> {
    self
      .value(tag)?
      .get_u32(0)
      .ok_or_else(|| GeoTilerError::Format(format!("Tag {} is not an integer", tag.name())))
  }

  /// Offset of a chained directory, 0 for the last one
  pub fn next_ifd(&self) -> u32 {
    self.next_ifd
  }

  pub fn data(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
    slice(self.buf, offset, len)
  }
}
