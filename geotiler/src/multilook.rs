// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

//! Box filter decimation (multilook) of Float32 grids.
//!
//! Only samples strictly greater than zero take part in the average,
//! zero and negative values are treated as no-data. A block without any
//! valid sample decimates to `0.0`.

use log::debug;
use rayon::prelude::*;

use crate::{
  GeoTilerError, Result,
  raster::{RasterBand, RasterImage},
};

/// Output dimension (width, height) of a multilook operation
pub fn multilook_dimension(width: usize, height: usize, factor: usize, max_rows: Option<usize>) -> (usize, usize) {
  let ew = width / factor.max(1);
  let eh = height / factor.max(1);
  (ew, max_rows.map_or(eh, |rows| eh.min(rows)))
}

/// Decimate a single band by `factor`, optionally limiting the
/// number of output rows. Remainder rows and columns are dropped.
pub fn multilook(band: &RasterBand, factor: usize, max_rows: Option<usize>) -> Result<RasterBand> {
  if factor == 0 {
    return Err(GeoTilerError::InvalidInput("Multilook factor must be at least 1".to_string()));
  }
  let (ew, eh) = multilook_dimension(band.width(), band.height(), factor, max_rows);
  if ew == 0 || eh == 0 {
    return Err(GeoTilerError::InvalidInput(format!(
      "Multilook factor {} reduces band '{}' ({}x{}) to an empty grid",
      factor,
      band.name(),
      band.width(),
      band.height()
    )));
  }

  let mut out = vec![0.0_f32; ew * eh];
  for (oy, out_row) in out.chunks_exact_mut(ew).enumerate() {
    for (ox, out_pix) in out_row.iter_mut().enumerate() {
      let mut sum = 0.0_f64;
      let mut valid = 0_usize;
      for sy in oy * factor..(oy + 1) * factor {
        for &v in &band.row(sy)[ox * factor..(ox + 1) * factor] {
          if v > 0.0 {
            sum += v as f64;
            valid += 1;
          }
        }
      }
      if valid > 0 {
        *out_pix = (sum / valid as f64) as f32;
      }
    }
  }

  RasterBand::new(band.name(), ew, eh, out)
}

/// Decimate all bands of an image. Bands are processed in parallel,
/// the band order is preserved.
pub fn multilook_image(image: &RasterImage, factor: usize, max_rows: Option<usize>) -> Result<RasterImage> {
  let (ew, eh) = multilook_dimension(image.width(), image.height(), factor, max_rows);
  debug!(
    "Multilook {}x: [{}x{}] -> [{}x{}], {} bands",
    factor,
    image.width(),
    image.height(),
    ew,
    eh,
    image.band_count()
  );
  let bands = image
    .bands()
    .par_iter()
    .map(|band| multilook(band, factor, max_rows))
    .collect::<Result<Vec<RasterBand>>>()?;
  RasterImage::new(bands)
}
