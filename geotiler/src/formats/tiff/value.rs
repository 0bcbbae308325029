// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use byteorder::{ByteOrder, LittleEndian};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{GeoTilerError, Result};

/// TIFF field types used by GeoTIFF float rasters
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum FieldType {
  Short = 3,
  Long = 4,
  Double = 12,
}

impl FieldType {
  /// Size of a single value of this type
  pub fn byte_len(self) -> usize {
    match self {
      Self::Short => 2,
      Self::Long => 4,
      Self::Double => 8,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::Short => "SHORT",
      Self::Long => "LONG",
      Self::Double => "DOUBLE",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  Short(Vec<u16>),
  Long(Vec<u32>),
  Double(Vec<f64>),
}

impl Value {
  pub fn field_type(&self) -> FieldType {
    match self {
      Self::Short(_) => FieldType::Short,
      Self::Long(_) => FieldType::Long,
      Self::Double(_) => FieldType::Double,
    }
  }

  pub fn count(&self) -> usize {
    match self {
      Self::Short(v) => v.len(),
      Self::Long(v) => v.len(),
      Self::Double(v) => v.len(),
    }
  }

  pub fn byte_size(&self) -> usize {
    self.count() * self.field_type().byte_len()
  }

  /// Values of 4 bytes or less live in the entry itself
  pub fn fits_inline(&self) -> bool {
    self.byte_size() <= 4
  }

  /// Pack all values little-endian into the front of `buf`.
  pub fn write_le(&self, buf: &mut [u8]) -> Result<()> {
    let size = self.byte_size();
    let avail = buf.len();
    let dst = buf.get_mut(..size).ok_or_else(|| {
      GeoTilerError::LayoutInconsistency(format!(
        "Value of {} {} needs {} bytes, only {} available",
        self.count(),
        self.field_type().name(),
        size,
        avail
      ))
    })?;
    match self {
      Self::Short(v) => LittleEndian::write_u16_into(v, dst),
      Self::Long(v) => LittleEndian::write_u32_into(v, dst),
      Self::Double(v) => LittleEndian::write_f64_into(v, dst),
    }
    Ok(())
  }

  /// Decode `count` values of type `typ` from the front of `buf`.
  pub fn read_le(typ: FieldType, count: usize, buf: &[u8]) -> Result<Self> {
    let size = count
      .checked_mul(typ.byte_len())
      .ok_or_else(|| GeoTilerError::Format(format!("Value count {} overflows", count)))?;
    let src = buf
      .get(..size)
      .ok_or_else(|| GeoTilerError::Format(format!("Value of {} {} exceeds available data", count, typ.name())))?;
    Ok(match typ {
      FieldType::Short => {
        let mut v = vec![0; count];
        LittleEndian::read_u16_into(src, &mut v);
        Self::Short(v)
      }
      FieldType::Long => {
        let mut v = vec![0; count];
        LittleEndian::read_u32_into(src, &mut v);
        Self::Long(v)
      }
      FieldType::Double => {
        let mut v = vec![0.0; count];
        LittleEndian::read_f64_into(src, &mut v);
        Self::Double(v)
      }
    })
  }

  pub fn get_u32(&self, idx: usize) -> Option<u32> {
    match self {
      Self::Short(v) => v.get(idx).map(|v| *v as u32),
      Self::Long(v) => v.get(idx).copied(),
      Self::Double(_) => None,
    }
  }

  pub fn get_f64(&self, idx: usize) -> Option<f64> {
    match self {
      Self::Short(v) => v.get(idx).map(|v| *v as f64),
      Self::Long(v) => v.get(idx).map(|v| *v as f64),
      Self::Double(v) => v.get(idx).copied(),
    }
  }

  /// All values widened to `u32`, `None` for doubles
  pub fn as_u32_vec(&self) -> Option<Vec<u32>> {
    match self {
      Self::Short(v) => Some(v.iter().map(|v| *v as u32).collect()),
      Self::Long(v) => Some(v.clone()),
      Self::Double(_) => None,
    }
  }
}

impl From<u16> for Value {
  fn from(value: u16) -> Self {
    Value::Short(vec![value])
  }
}

impl From<Vec<u16>> for Value {
  fn from(value: Vec<u16>) -> Self {
    Value::Short(value)
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Long(vec![value])
  }
}

impl From<Vec<u32>> for Value {
  fn from(value: Vec<u32>) -> Self {
    Value::Long(value)
  }
}

impl From<Vec<f64>> for Value {
  fn from(value: Vec<f64>) -> Self {
    Value::Double(value)
  }
}

impl<const N: usize> From<[f64; N]> for Value {
  fn from(value: [f64; N]) -> Self {
    Value::Double(value.to_vec())
  }
}
