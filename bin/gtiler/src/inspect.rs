// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::path::PathBuf;

use clap::ArgMatches;
use log::debug;
use serde::Serialize;

use crate::AppError;

fn print_output<T: Serialize + ?Sized>(obj: &T, options: &ArgMatches) -> crate::Result<()> {
  if options.get_flag("yaml") {
    let yaml = serde_yaml::to_string(obj)?;
    println!("{}", yaml);
  } else {
    let json = serde_json::to_string_pretty(obj)?;
    println!("{}", json);
  }
  Ok(())
}

/// Entry point for Clap sub command `inspect`
pub async fn inspect(options: &ArgMatches) -> crate::Result<()> {
  let in_file: &PathBuf = options
    .get_one("FILE")
    .ok_or_else(|| AppError::InvalidCmdSwitch("Missing argument 'FILE'".to_string()))?;
  debug!("Infile: {:?}", in_file);

  if !in_file.exists() {
    return Err(AppError::NotFound(in_file.clone()));
  }
  let buf = tokio::fs::read(in_file).await?;
  let info = geotiler::geotiff::inspect(&buf)?;
  print_output(&info, options)
}
