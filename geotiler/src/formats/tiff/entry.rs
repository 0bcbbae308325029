// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::{FieldType, GeoTiffTag, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
  pub tag: u16,
  pub value: Value,
}

impl Entry {
  pub fn new(tag: impl Into<u16>, value: impl Into<Value>) -> Self {
    Self {
      tag: tag.into(),
      value: value.into(),
    }
  }

  pub fn field_type(&self) -> FieldType {
    self.value.field_type()
  }

  pub fn count(&self) -> usize {
    self.value.count()
  }

  pub fn byte_size(&self) -> usize {
    self.value.byte_size()
  }

  pub fn is(&self, tag: GeoTiffTag) -> bool {
    self.tag == tag.to_u16()
  }

  /// Human readable tag name, numeric id for unknown tags
  pub fn tag_name(&self) -> String {
    GeoTiffTag::from_u16(self.tag).map_or_else(|| format!("Tag{}", self.tag), |t| t.name().to_string())
  }
}
