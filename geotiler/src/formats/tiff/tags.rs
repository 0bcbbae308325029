// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use super::value::FieldType;

macro_rules! tags {
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident {
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$ident_attr])* $tag,)*
        }

        impl $name {
            #[inline(always)]
            pub fn from_u16(val: u16) -> Option<Self> {
                match val {
                    $( $val => Some($name::$tag), )*
                    _ => None,
                }
            }

            #[inline(always)]
            pub fn to_u16(&self) -> u16 {
                match *self {
                    $( $name::$tag => $val, )*
                }
            }

            pub fn name(&self) -> &'static str {
                match *self {
                    $( $name::$tag => stringify!($tag), )*
                }
            }
        }

        impl From<$name> for u16 {
            fn from(tag: $name) -> u16 {
                tag.to_u16()
            }
        }
    };
}

tags! {
/// Tags written into a tiled float GeoTIFF
pub enum GeoTiffTag {
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    SamplesPerPixel = 277,
    PlanarConfiguration = 284,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SampleFormat = 339,
    ModelPixelScale = 33550,
    ModelTiepoint = 33922,
    GeoKeyDirectory = 34735,
}
}

/// Number of values a tag carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagCount {
  Fixed(usize),
  /// One value per band
  PerBand,
  /// One value per tile
  PerTile,
}

impl TagCount {
  pub fn resolve(self, bands: usize, tiles: usize) -> usize {
    match self {
      Self::Fixed(n) => n,
      Self::PerBand => bands,
      Self::PerTile => tiles,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagSpec {
  pub tag: GeoTiffTag,
  pub field_type: FieldType,
  pub count: TagCount,
}

const fn spec(tag: GeoTiffTag, field_type: FieldType, count: TagCount) -> TagSpec {
  TagSpec { tag, field_type, count }
}

/// Every entry of the image directory, ascending by tag id
pub const TAG_TABLE: [TagSpec; 15] = [
  spec(GeoTiffTag::ImageWidth, FieldType::Long, TagCount::Fixed(1)),
  spec(GeoTiffTag::ImageLength, FieldType::Long, TagCount::Fixed(1)),
  spec(GeoTiffTag::BitsPerSample, FieldType::Short, TagCount::PerBand),
  spec(GeoTiffTag::Compression, FieldType::Short, TagCount::Fixed(1)),
  spec(GeoTiffTag::PhotometricInterpretation, FieldType::Short, TagCount::Fixed(1)),
  spec(GeoTiffTag::SamplesPerPixel, FieldType::Short, TagCount::Fixed(1)),
  spec(GeoTiffTag::PlanarConfiguration, FieldType::Short, TagCount::Fixed(1)),
  spec(GeoTiffTag::TileWidth, FieldType::Long, TagCount::Fixed(1)),
  spec(GeoTiffTag::TileLength, FieldType::Long, TagCount::Fixed(1)),
  spec(GeoTiffTag::TileOffsets, FieldType::Long, TagCount::PerTile),
  spec(GeoTiffTag::TileByteCounts, FieldType::Long, TagCount::PerTile),
  spec(GeoTiffTag::SampleFormat, FieldType::Short, TagCount::PerBand),
  spec(GeoTiffTag::ModelPixelScale, FieldType::Double, TagCount::Fixed(3)),
  spec(GeoTiffTag::ModelTiepoint, FieldType::Double, TagCount::Fixed(6)),
  spec(GeoTiffTag::GeoKeyDirectory, FieldType::Short, TagCount::Fixed(16)),
];

#[cfg(test)]
mod tests {
  use itertools::Itertools;

  use super::*;

  #[test]
  fn table_is_strictly_ascending() {
    assert!(TAG_TABLE.iter().tuple_windows().all(|(a, b)| a.tag.to_u16() < b.tag.to_u16()));
  }

  #[test]
  fn tag_ids_round_trip() {
    for s in TAG_TABLE {
      assert_eq!(GeoTiffTag::from_u16(s.tag.to_u16()), Some(s.tag));
    }
    assert_eq!(GeoTiffTag::from_u16(34736), None);
    assert_eq!(GeoTiffTag::TileOffsets.name(), "TileOffsets");
  }
}
