// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! GeoKey directory stored in tag 34735.

use serde::Serialize;

use crate::{GeoTilerError, Result};

pub const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

pub const RASTER_PIXEL_IS_AREA: u16 = 1;

const KEY_DIRECTORY_VERSION: u16 = 1;
const KEY_REVISION: u16 = 1;
const MINOR_REVISION: u16 = 0;

/// EPSG codes in this range are treated as geographic systems
const GEOGRAPHIC_EPSG: std::ops::Range<u16> = 4000..5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
  Projected = 1,
  Geographic = 2,
}

impl ModelType {
  pub fn for_epsg(epsg: u16) -> Self {
    if GEOGRAPHIC_EPSG.contains(&epsg) { Self::Geographic } else { Self::Projected }
  }

  pub fn from_u16(value: u16) -> Option<Self> {
    match value {
      1 => Some(Self::Projected),
      2 => Some(Self::Geographic),
      _ => None,
    }
  }

  /// Key that carries the EPSG code for this model type
  pub fn crs_key(self) -> u16 {
    match self {
      Self::Projected => PROJECTED_CS_TYPE_GEO_KEY,
      Self::Geographic => GEOGRAPHIC_TYPE_GEO_KEY,
    }
  }
}

/// Single key with its value stored directly in the directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeoKey {
  pub id: u16,
  pub value: u16,
}

impl GeoKey {
  pub fn new(id: u16, value: u16) -> Self {
    Self { id, value }
  }

  /// `[id, location, count, value]`, location 0 means the value is inline
  pub fn to_shorts(&self) -> [u16; 4] {
    [self.id, 0, 1, self.value]
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoKeyDirectory {
  keys: Vec<GeoKey>,
}

impl GeoKeyDirectory {
  pub fn for_epsg(epsg: u16) -> Self {
    let model = ModelType::for_epsg(epsg);
    Self {
      keys: vec![
        GeoKey::new(GT_MODEL_TYPE_GEO_KEY, model as u16),
        GeoKey::new(GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA),
        GeoKey::new(model.crs_key(), epsg),
      ],
    }
  }

  pub fn keys(&self) -> &[GeoKey] {
    &self.keys
  }

  pub fn get(&self, id: u16) -> Option<u16> {
    self.keys.iter().find(|k| k.id == id).map(|k| k.value)
  }

  pub fn model_type(&self) -> Option<ModelType> {
    self.get(GT_MODEL_TYPE_GEO_KEY).and_then(ModelType::from_u16)
  }

  /// EPSG code from whichever CRS key is present
  pub fn epsg(&self) -> Option<u16> {
    self.get(PROJECTED_CS_TYPE_GEO_KEY).or_else(|| self.get(GEOGRAPHIC_TYPE_GEO_KEY))
  }

  pub fn to_shorts(&self) -> Vec<u16> {
    let mut out = vec![KEY_DIRECTORY_VERSION, KEY_REVISION, MINOR_REVISION, self.keys.len() as u16];
    out.extend(self.keys.iter().flat_map(GeoKey::to_shorts));
    out
  }

  /// Parse a directory, only keys with inline values are supported
  pub fn from_shorts(shorts: &[u16]) -> Result<Self> {
    let (header, body) = shorts
      .split_at_checked(4)
      .ok_or_else(|| GeoTilerError::Format("GeoKey directory shorter than its header".to_string()))?;
    let count = header[3] as usize;
    if body.len() < count * 4 {
      return Err(GeoTilerError::Format(format!("GeoKey directory declares {} keys, has room for {}", count, body.len() / 4)));
    }
    let keys = body
      .chunks_exact(4)
      .take(count)
      .map(|k| {
        if k[1] != 0 || k[2] != 1 {
          return Err(GeoTilerError::Format(format!("GeoKey {} does not store an inline value", k[0])));
        }
        Ok(GeoKey::new(k[0], k[3]))
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self { keys })
  }
}
