// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::PathBuf;

use clap::{
  Arg, ArgAction, Command,
  builder::{NonEmptyStringValueParser, TypedValueParser},
  crate_version, value_parser,
};
use geotiler::{BoundingBox, BoundsConvention, Spacing};
use log::debug;

pub fn create_app() -> Command {
  debug!("Creating CLAP app configuration");
  Command::new("gtiler")
    .version(crate_version!())
    .author("Daniel V. <daniel@chaospixel.com>")
    .about("gtiler - Export Float32 raster bands into tiled GeoTIFF files")
    .subcommand_required(true)
    .arg_required_else_help(true)
    .arg(
      Arg::new("debug")
        .short('d')
        .action(ArgAction::Count)
        .global(true)
        .help("Sets the level of debugging information"),
    )
    .subcommand(
      Command::new("export")
        .about("Encode raw little-endian Float32 bands into a GeoTIFF")
        .arg(
          Arg::new("band")
            .long("band")
            .value_name("NAME=FILE")
            .action(ArgAction::Append)
            .required(true)
            .value_parser(BandArgParser)
            .help("Band name and raw Float32 file, repeat for each band"),
        )
        .arg(
          Arg::new("width")
            .long("width")
            .required(true)
            .value_parser(value_parser!(usize))
            .help("Raster width in pixels"),
        )
        .arg(
          Arg::new("height")
            .long("height")
            .required(true)
            .value_parser(value_parser!(usize))
            .help("Raster height in pixels"),
        )
        .arg(
          Arg::new("epsg")
            .long("epsg")
            .required(true)
            .value_parser(value_parser!(u32))
            .help("EPSG code of the coordinate system"),
        )
        .arg(
          Arg::new("bounds")
            .long("bounds")
            .value_name("MINX,MINY,MAXX,MAXY")
            .required(true)
            .allow_hyphen_values(true)
            .value_parser(BoundsArgParser)
            .help("Bounds of the pixel centers (or edges with --edge)"),
        )
        .arg(
          Arg::new("spacing")
            .long("spacing")
            .value_name("SX,SY")
            .allow_hyphen_values(true)
            .value_parser(SpacingArgParser)
            .help("Pixel spacing, sign is ignored"),
        )
        .arg(
          Arg::new("edge")
            .long("edge")
            .action(ArgAction::SetTrue)
            .help("Bounds are pixel edges, no correction is applied"),
        )
        .arg(
          Arg::new("convention")
            .long("convention")
            .value_parser(value_parser!(BoundsConvention))
            .conflicts_with("edge")
            .help("How --bounds is expressed"),
        )
        .arg(
          Arg::new("multilook")
            .long("multilook")
            .value_parser(value_parser!(usize))
            .help("Multilook factor"),
        )
        .arg(
          Arg::new("max_width")
            .long("max-width")
            .value_parser(value_parser!(usize))
            .help("Raise the multilook factor until the output is at most this wide"),
        )
        .arg(
          Arg::new("rows")
            .long("rows")
            .value_parser(value_parser!(usize))
            .help("Keep only the first rows after multilook"),
        )
        .arg(
          Arg::new("tile_size")
            .long("tile-size")
            .value_parser(value_parser!(usize))
            .help("Tile size in pixels (multiple of 16)"),
        )
        .arg(
          Arg::new("threads")
            .long("threads")
            .value_parser(value_parser!(usize))
            .help("Compression threads"),
        )
        .arg(
          Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("Export parameters from TOML file"),
        )
        .arg(
          Arg::new("override")
            .short('f')
            .long("override")
            .action(ArgAction::SetTrue)
            .help("Override existing files"),
        )
        .arg(
          Arg::new("OUTPUT")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Output GeoTIFF file"),
        ),
    )
    .subcommand(
      Command::new("inspect")
        .about("Print structure and georeferencing of a GeoTIFF")
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Format output as JSON (default)"))
        .arg(
          Arg::new("yaml")
            .long("yaml")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Format output as YAML"),
        )
        .arg(Arg::new("FILE").required(true).value_parser(value_parser!(PathBuf)).help("Input file")),
    )
}

fn value_error(cmd: &clap::Command, arg: Option<&clap::Arg>, val: String, fail: &str) -> clap::Error {
  let mut err = clap::Error::new(clap::error::ErrorKind::ValueValidation).with_cmd(cmd);
  if let Some(arg) = arg {
    err.insert(clap::error::ContextKind::InvalidArg, clap::error::ContextValue::String(arg.to_string()));
  }
  err.insert(clap::error::ContextKind::InvalidValue, clap::error::ContextValue::String(val));
  err.insert(clap::error::ContextKind::Suggested, clap::error::ContextValue::String(fail.to_string()));
  err
}

fn parse_floats<const N: usize>(val: &str) -> Option<[f64; N]> {
  let values: Vec<f64> = val.split(',').map(|v| v.trim().parse::<f64>()).collect::<Result<_, _>>().ok()?;
  values.try_into().ok()
}

#[derive(Clone, Debug)]
pub struct BandArg {
  pub name: String,
  pub path: PathBuf,
}

#[derive(Clone)]
pub struct BandArgParser;

impl TypedValueParser for BandArgParser {
  type Value = BandArg;

  fn parse_ref(&self, cmd: &clap::Command, arg: Option<&clap::Arg>, value: &std::ffi::OsStr) -> std::result::Result<Self::Value, clap::Error> {
    let inner = NonEmptyStringValueParser::new();
    let val = inner.parse_ref(cmd, arg, value)?;

    match val.split_once('=') {
      Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(BandArg {
        name: name.to_string(),
        path: PathBuf::from(path),
      }),
      _ => Err(value_error(cmd, arg, val, "NAME=FILE, for example HHHH=hh.f32")),
    }
  }
}

#[derive(Clone)]
pub struct BoundsArgParser;

impl TypedValueParser for BoundsArgParser {
  type Value = BoundingBox;

  fn parse_ref(&self, cmd: &clap::Command, arg: Option<&clap::Arg>, value: &std::ffi::OsStr) -> std::result::Result<Self::Value, clap::Error> {
    let inner = NonEmptyStringValueParser::new();
    let val = inner.parse_ref(cmd, arg, value)?;

    let bounds = parse_floats::<4>(&val).map(|[min_x, min_y, max_x, max_y]| BoundingBox::new(min_x, min_y, max_x, max_y));
    match bounds {
      Some(bounds) if bounds.validate().is_ok() => Ok(bounds),
      _ => Err(value_error(cmd, arg, val, "MINX,MINY,MAXX,MAXY with MINX < MAXX and MINY < MAXY")),
    }
  }
}

#[derive(Clone)]
pub struct SpacingArgParser;

impl TypedValueParser for SpacingArgParser {
  type Value = Spacing;

  fn parse_ref(&self, cmd: &clap::Command, arg: Option<&clap::Arg>, value: &std::ffi::OsStr) -> std::result::Result<Self::Value, clap::Error> {
    let inner = NonEmptyStringValueParser::new();
    let val = inner.parse_ref(cmd, arg, value)?;

    match parse_floats::<2>(&val).map(|[x, y]| Spacing::from_signed(x, y)) {
      Some(Ok(spacing)) => Ok(spacing),
      _ => Err(value_error(cmd, arg, val, "SX,SY with non-zero values")),
    }
  }
}
