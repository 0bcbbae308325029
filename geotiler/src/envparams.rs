// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use log::warn;

pub(crate) fn geotiler_threads() -> Option<usize> {
  match std::env::var("GEOTILER_THREADS").map(|val| val.parse::<usize>()) {
    Ok(Ok(0)) => {
      warn!("GEOTILER_THREADS must be at least 1, ignored");
      None
    }
    Ok(Ok(value)) => Some(value),
    Ok(Err(_)) => {
      warn!("Invalid value for GEOTILER_THREADS");
      None
    }
    Err(_) => None,
  }
}
