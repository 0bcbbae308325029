// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Minimal little-endian classic TIFF layer: typed values, directory
//! entries, layout planning and byte serialization of a single IFD.

pub mod entry;
pub mod layout;
pub mod reader;
pub mod tags;
pub mod value;
pub mod writer;

pub use entry::Entry;
pub use layout::{LayoutPlan, Placement, PlannedEntry};
pub use reader::TiffReader;
pub use tags::{GeoTiffTag, TAG_TABLE, TagCount, TagSpec};
pub use value::{FieldType, Value};
pub use writer::serialize;

pub const TIFF_MAGIC: u16 = 42;

/// Byte order marker for little-endian files
pub const LITTLE_ENDIAN_MARKER: [u8; 2] = *b"II";

pub const HEADER_SIZE: u32 = 8;
pub const IFD_ENTRY_SIZE: u32 = 12;

/// Size of an IFD with `entries` entries: count, entries and next-IFD pointer
pub fn ifd_size(entries: usize) -> u64 {
  2 + IFD_ENTRY_SIZE as u64 * entries as u64 + 4
}

pub enum CompressionMethod {
  Deflate = 8,
}

impl From<CompressionMethod> for Value {
  fn from(value: CompressionMethod) -> Self {
    Value::Short(vec![value as u16])
  }
}

pub enum PhotometricInterpretation {
  BlackIsZero = 1,
}

impl From<PhotometricInterpretation> for Value {
  fn from(value: PhotometricInterpretation) -> Self {
    Value::Short(vec![value as u16])
  }
}

pub enum PlanarConfiguration {
  Chunky = 1,
}

impl From<PlanarConfiguration> for Value {
  fn from(value: PlanarConfiguration) -> Self {
    Value::Short(vec![value as u16])
  }
}

#[allow(clippy::upper_case_acronyms)]
pub enum SampleFormat {
  IEEEFP = 3,
}

impl From<SampleFormat> for Value {
  fn from(value: SampleFormat) -> Self {
    Value::Short(vec![value as u16])
  }
}
