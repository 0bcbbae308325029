// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

#![allow(dead_code)]

use std::path::PathBuf;

use geotiler::{BoundingBox, GeoReference, RasterBand, RasterImage};

pub(crate) const SCENE_WIDTH: usize = 700;
pub(crate) const SCENE_HEIGHT: usize = 600;
pub(crate) const SCENE_EPSG: u32 = 32718;

/// Pixel edges of the 700x600 test scene, 20 m pixels
pub(crate) fn scene_edges() -> BoundingBox {
  BoundingBox::new(434160.0, 9275760.0, 448160.0, 9287760.0)
}

pub(crate) fn scene_georef() -> GeoReference {
  GeoReference::from_pixel_edges(scene_edges(), SCENE_EPSG).expect("valid scene bounds")
}

/// Bands with recognizable patterns: horizontal, vertical and diagonal
/// gradients, repeating for more than three bands.
pub(crate) fn gradient_bands(width: usize, height: usize, names: &[&str]) -> RasterImage {
  let bands = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let data = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| match i % 3 {
          0 => x as f32 / width as f32,
          1 => y as f32 / height as f32,
          _ => (x + y) as f32 / (width + height) as f32,
        })
        .collect();
      RasterBand::new(*name, width, height, data).expect("valid band")
    })
    .collect();
  RasterImage::new(bands).expect("valid image")
}

pub(crate) fn scene_image() -> RasterImage {
  gradient_bands(SCENE_WIDTH, SCENE_HEIGHT, &["HHHH", "HVHV", "VVVV"])
}

/// Empty scratch directory unique to this test process
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("geotiler-{}-{}", name, std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).expect("scratch directory");
  dir
}
