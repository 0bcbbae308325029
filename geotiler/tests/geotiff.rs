// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use geotiler::{
  BoundingBox, BoundsConvention, ExportParams, GeoReference, GeoTilerError, PixelScale, RasterBand, RasterImage, Spacing,
  formats::tiff::{GeoTiffTag, TiffReader, Value},
  geotiff::{ExportRequest, GeoTiffEncoder, export, export_file, geokeys::ModelType, inspect, read_bands},
};
use libflate::zlib::Decoder;

mod common;
use common::*;

fn init_test_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[test]
fn scene_700x600_three_bands() -> TestResult {
  init_test_logger();
  let image = scene_image();
  let buf = GeoTiffEncoder::new(&image, scene_georef()).encode()?;

  let info = inspect(&buf)?;
  assert_eq!((info.width, info.height, info.bands), (700, 600, 3));
  assert_eq!(info.bits_per_sample, vec![32; 3]);
  assert_eq!(info.sample_format, vec![3; 3]);
  assert_eq!(info.compression, 8);
  assert_eq!(info.planar_configuration, 1);
  assert_eq!((info.tile_width, info.tile_height), (512, 512));
  assert_eq!((info.tiles_across, info.tiles_down, info.tile_count), (2, 2, 4));
  assert_eq!(info.pixel_scale, PixelScale { x: 20.0, y: 20.0 });
  assert_eq!(info.tiepoint, vec![0.0, 0.0, 0.0, 434160.0, 9287760.0, 0.0]);
  assert_eq!(info.epsg, Some(32718));
  assert_eq!(info.model_type, Some(ModelType::Projected));
  assert_eq!(info.raster_type, Some(1));
  assert!(info.transform.e < 0.0);
  assert_eq!(info.bounds, scene_edges());
  assert_eq!(info.corners.upper_left, (434160.0, 9287760.0));
  assert_eq!(info.corners.lower_right, (448160.0, 9275760.0));
  assert_eq!(info.file_size, buf.len());
  Ok(())
}

#[test]
fn bands_round_trip_through_edge_tiles() -> TestResult {
  init_test_logger();
  let image = scene_image();
  let buf = GeoTiffEncoder::new(&image, scene_georef()).encode()?;
  let bands = read_bands(&buf)?;
  assert_eq!(bands.len(), 3);
  for (decoded, band) in bands.iter().zip(image.bands()) {
    assert_eq!(decoded.as_slice(), band.data());
  }
  Ok(())
}

#[test]
fn last_tile_is_zero_padded() -> TestResult {
  let image = scene_image();
  let buf = GeoTiffEncoder::new(&image, scene_georef()).encode()?;
  let reader = TiffReader::new(&buf)?;
  let offset = reader.value(GeoTiffTag::TileOffsets)?.get_u32(3).unwrap_or_default();
  let count = reader.value(GeoTiffTag::TileByteCounts)?.get_u32(3).unwrap_or_default();

  let mut raw = Vec::new();
  Decoder::new(reader.data(offset as usize, count as usize)?)?.read_to_end(&mut raw)?;
  assert_eq!(raw.len(), 512 * 512 * 3 * 4);
  let mut samples = vec![0.0_f32; raw.len() / 4];
  LittleEndian::read_f32_into(&raw, &mut samples);

  // Tile 3 covers columns 512..700 and rows 512..600: 188x88 valid pixels
  let pixel = |x: usize, y: usize| &samples[(y * 512 + x) * 3..(y * 512 + x + 1) * 3];
  assert_eq!(pixel(0, 0), &[512.0_f32 / 700.0, 512.0 / 600.0, 1024.0 / 1300.0]);
  assert_eq!(pixel(187, 87)[0], 699.0 / 700.0);
  assert_eq!(pixel(188, 0), &[0.0_f32; 3]);
  assert_eq!(pixel(0, 88), &[0.0_f32; 3]);
  assert_eq!(pixel(511, 511), &[0.0_f32; 3]);
  Ok(())
}

#[test]
fn header_and_ascending_directory() -> TestResult {
  let image = scene_image();
  let buf = GeoTiffEncoder::new(&image, scene_georef()).encode()?;
  assert_eq!(&buf[0..4], b"II\x2a\x00");
  assert_eq!(LittleEndian::read_u32(&buf[4..8]), 8);

  let reader = TiffReader::new(&buf)?;
  let ids: Vec<u16> = reader.entries().iter().map(|e| e.tag).collect();
  assert_eq!(ids, vec![256, 257, 258, 259, 262, 277, 284, 322, 323, 324, 325, 339, 33550, 33922, 34735]);
  assert!(ids.windows(2).all(|w| w[0] < w[1]));
  assert_eq!(reader.next_ifd(), 0);
  assert_eq!(
    reader.value(GeoTiffTag::GeoKeyDirectory)?,
    &Value::Short(vec![1, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 32718])
  );
  Ok(())
}

#[test]
fn overflow_values_are_even_aligned_and_tiles_follow() -> TestResult {
  let image = gradient_bands(100, 40, &["A", "B", "C", "D", "E"]);
  let buf = GeoTiffEncoder::new(&image, scene_georef()).tile_size(32).encode()?;

  let count = LittleEndian::read_u16(&buf[8..10]) as usize;
  let ifd_end = 8 + 2 + count * 12 + 4;
  let mut overflow_end = ifd_end;
  for i in 0..count {
    let raw = &buf[10 + i * 12..10 + (i + 1) * 12];
    let typ = LittleEndian::read_u16(&raw[2..4]);
    let n = LittleEndian::read_u32(&raw[4..8]) as usize;
    let size = n * match typ {
      3 => 2,
      4 => 4,
      12 => 8,
      other => panic!("unexpected field type {}", other),
    };
    if size > 4 {
      let offset = LittleEndian::read_u32(&raw[8..12]) as usize;
      assert_eq!(offset % 2, 0);
      assert!(offset >= ifd_end);
      overflow_end = overflow_end.max(offset + size + size % 2);
    }
  }

  let reader = TiffReader::new(&buf)?;
  let offsets = reader.value(GeoTiffTag::TileOffsets)?.as_u32_vec().unwrap_or_default();
  let counts = reader.value(GeoTiffTag::TileByteCounts)?.as_u32_vec().unwrap_or_default();
  assert_eq!(offsets.len(), 4 * 2);
  assert_eq!(offsets[0] as usize, overflow_end);
  for i in 1..offsets.len() {
    assert_eq!(offsets[i], offsets[i - 1] + counts[i - 1]);
  }
  assert_eq!(*offsets.last().unwrap() as usize + *counts.last().unwrap() as usize, buf.len());
  Ok(())
}

#[test]
fn single_tile_offset_is_readable() -> TestResult {
  let image = gradient_bands(10, 7, &["HHHH"]);
  let georef = GeoReference::from_pixel_edges(BoundingBox::new(0.0, 0.0, 10.0, 7.0), 32633)?;
  let buf = GeoTiffEncoder::new(&image, georef).tile_size(16).encode()?;

  let reader = TiffReader::new(&buf)?;
  let offsets = reader.value(GeoTiffTag::TileOffsets)?.as_u32_vec().unwrap_or_default();
  let counts = reader.value(GeoTiffTag::TileByteCounts)?.as_u32_vec().unwrap_or_default();
  assert_eq!(offsets.len(), 1);
  assert_eq!((offsets[0] + counts[0]) as usize, buf.len());
  assert_eq!(read_bands(&buf)?[0].as_slice(), image.bands()[0].data());
  Ok(())
}

#[test]
fn geographic_crs_keys() -> TestResult {
  let image = gradient_bands(36, 18, &["HHHH", "HVHV"]);
  let georef = GeoReference::from_pixel_edges(BoundingBox::new(-180.0, -90.0, 180.0, 90.0), 4326)?;
  let buf = GeoTiffEncoder::new(&image, georef).tile_size(16).encode()?;
  let info = inspect(&buf)?;
  assert_eq!(info.model_type, Some(ModelType::Geographic));
  assert_eq!(info.epsg, Some(4326));
  assert_eq!(info.pixel_scale, PixelScale { x: 10.0, y: 10.0 });

  let reader = TiffReader::new(&buf)?;
  let keys = reader.value(GeoTiffTag::GeoKeyDirectory)?.as_u32_vec().unwrap_or_default();
  assert_eq!(&keys[12..16], &[2048, 0, 1, 4326]);
  assert_eq!(keys[7], 2);
  Ok(())
}

#[test]
fn output_independent_of_thread_count() -> TestResult {
  let image = gradient_bands(300, 200, &["A", "B"]);
  let one = GeoTiffEncoder::new(&image, scene_georef()).tile_size(64).threads(Some(1)).encode()?;
  let many = GeoTiffEncoder::new(&image, scene_georef()).tile_size(64).threads(Some(4)).encode()?;
  let global = GeoTiffEncoder::new(&image, scene_georef()).tile_size(64).encode()?;
  assert_eq!(one, many);
  assert_eq!(one, global);
  Ok(())
}

#[test]
fn invalid_input_is_rejected_before_encoding() -> TestResult {
  let image = scene_image();
  let encode = |tile_size: usize| GeoTiffEncoder::new(&image, scene_georef()).tile_size(tile_size).encode();
  assert!(matches!(encode(0), Err(GeoTilerError::InvalidInput(_))));
  assert!(matches!(encode(500), Err(GeoTilerError::InvalidInput(_))));
  assert!(matches!(
    GeoTiffEncoder::new(&image, scene_georef()).threads(Some(0)).encode(),
    Err(GeoTilerError::InvalidInput(_))
  ));
  assert!(matches!(
    GeoReference::from_pixel_edges(scene_edges(), 100_000),
    Err(GeoTilerError::InvalidInput(_))
  ));
  assert!(matches!(Spacing::new(-20.0, 20.0), Err(GeoTilerError::InvalidInput(_))));
  assert!(matches!(RasterImage::new(Vec::new()), Err(GeoTilerError::InvalidInput(_))));
  assert!(matches!(
    RasterBand::new("HHHH", 700, 600, vec![0.0; 10]),
    Err(GeoTilerError::InvalidInput(_))
  ));
  Ok(())
}

#[test]
fn write_file_replaces_destination_atomically() -> TestResult {
  init_test_logger();
  let dir = scratch_dir("write");
  let image = gradient_bands(40, 30, &["HHHH"]);
  let encoder = GeoTiffEncoder::new(&image, scene_georef()).tile_size(16);

  let path = dir.join("out.tif");
  std::fs::write(&path, b"stale")?;
  encoder.write_file(&path)?;
  assert_eq!(std::fs::read(&path)?, encoder.encode()?);

  // A directory can not be replaced by a file
  let blocked = dir.join("blocked.tif");
  std::fs::create_dir(&blocked)?;
  assert!(matches!(encoder.write_file(&blocked), Err(GeoTilerError::Io(_))));
  assert!(blocked.is_dir());

  let mut names: Vec<String> = std::fs::read_dir(&dir)?
    .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
    .collect::<std::io::Result<_>>()?;
  names.sort();
  assert_eq!(names, vec!["blocked.tif", "out.tif"]);
  std::fs::remove_dir_all(&dir)?;
  Ok(())
}

#[test]
fn export_with_multilook_and_row_limit() -> TestResult {
  init_test_logger();
  let centers = BoundingBox::new(434170.0, 9275770.0, 448150.0, 9287750.0);
  let request = ExportRequest {
    image: scene_image(),
    bounds: centers,
    spacing: Some(Spacing::from_signed(20.0, -20.0)?),
    epsg: SCENE_EPSG,
    params: ExportParams {
      tile_size: 128,
      multilook: 2,
      max_rows: Some(100),
      ..Default::default()
    },
  };
  let output = export(&request)?;
  assert_eq!((output.width, output.height), (350, 100));
  // 300 decimated rows span 12000 m, 100 of them are kept
  assert_eq!(output.georef.edges(), &BoundingBox::new(434160.0, 9283760.0, 448160.0, 9287760.0));

  let info = inspect(&output.data)?;
  assert_eq!((info.width, info.height, info.bands), (350, 100, 3));
  assert_eq!(info.pixel_scale, PixelScale { x: 40.0, y: 40.0 });
  assert_eq!(info.tiepoint[3..5], [434160.0, 9287760.0]);

  let bands = read_bands(&output.data)?;
  // Column gradient: mean of x = 0, 1 (x = 0 is no-data) over 700
  assert_eq!(bands[0][0], 1.0 / 700.0);
  Ok(())
}

#[test]
fn export_full_resolution_edges_to_file() -> TestResult {
  let dir = scratch_dir("export");
  let request = ExportRequest {
    image: scene_image(),
    bounds: scene_edges(),
    spacing: None,
    epsg: SCENE_EPSG,
    params: ExportParams {
      convention: BoundsConvention::PixelEdge,
      ..Default::default()
    },
  };
  let path = dir.join("scene.tif");
  let output = export_file(&request, &path)?;
  assert_eq!((output.width, output.height), (700, 600));
  let buf = std::fs::read(&path)?;
  assert_eq!(buf, output.data);
  assert_eq!(inspect(&buf)?.bounds, scene_edges());

  // Pixel center bounds without spacing can not be corrected
  let missing = ExportRequest {
    params: ExportParams::default(),
    ..request
  };
  assert!(matches!(export(&missing), Err(GeoTilerError::InvalidInput(_))));
  std::fs::remove_dir_all(&dir)?;
  Ok(())
}

#[test]
fn no_data_rule_does_not_depend_on_row_limit() -> TestResult {
  let band = RasterBand::new("HHHH", 2, 2, vec![-1.0, 2.0, 0.5, -3.0])?;
  let request = |max_rows: Option<usize>| -> std::result::Result<ExportRequest, GeoTilerError> {
    Ok(ExportRequest {
      image: RasterImage::new(vec![band.clone()])?,
      bounds: BoundingBox::new(0.0, 0.0, 2.0, 2.0),
      spacing: None,
      epsg: 32633,
      params: ExportParams {
        tile_size: 16,
        max_rows,
        convention: BoundsConvention::PixelEdge,
        ..Default::default()
      },
    })
  };
  let unlimited = export(&request(None)?)?;
  let all_rows = export(&request(Some(2))?)?;
  assert_eq!(unlimited.data, all_rows.data);
  assert_eq!(read_bands(&unlimited.data)?[0], vec![0.0, 2.0, 0.5, 0.0]);
  Ok(())
}

#[test]
fn wide_source_raises_multilook() -> TestResult {
  let image = gradient_bands(20000, 4, &["HHHH"]);
  let request = ExportRequest {
    image,
    bounds: BoundingBox::new(0.0, 0.0, 400000.0, 80.0),
    spacing: None,
    epsg: 32633,
    params: ExportParams {
      convention: BoundsConvention::PixelEdge,
      ..Default::default()
    },
  };
  let output = export(&request)?;
  assert_eq!(output.multilook, 4);
  assert_eq!((output.width, output.height), (5000, 1));
  assert_eq!(inspect(&output.data)?.pixel_scale, PixelScale { x: 80.0, y: 80.0 });
  Ok(())
}
