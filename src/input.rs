// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/input.rs - Record dump reader.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io::BufReader;
use std::io::prelude::*;
use std::path::Path;

use flate2::read::ZlibDecoder;
use log::debug;

use crate::error::InputError;
use crate::layout::LayoutMode;

fn is_zlib(data: &[u8]) -> bool {
    match data {
        [0x78, flags, ..] => (u16::from(0x78u8) << 8 | u16::from(*flags)) % 31 == 0,
        _ => false,
    }
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, InputError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut buffer = Vec::new();
    decoder
        .read_to_end(&mut buffer)
        .map_err(InputError::Decompress)?;
    Ok(buffer)
}

/// Turns the bytes of a dump into dissector input.
///
/// Zlib-compressed dumps are inflated first. `dsect` input loses all
/// whitespace, so hex may be wrapped or grouped freely; `raw` input only
/// loses its line terminators.
pub fn prepare_input(data: &[u8], mode: LayoutMode) -> Result<String, InputError> {
    let inflated;
    let data = if is_zlib(data) {
        inflated = decompress(data)?;
        debug!("Inflated {} bytes of input to {}", data.len(), inflated.len());
        &inflated[..]
    } else {
        data
    };

    let text = String::from_utf8_lossy(data);
    Ok(match mode {
        LayoutMode::Dsect => text.chars().filter(|c| !c.is_whitespace()).collect(),
        LayoutMode::Raw => text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect(),
    })
}

/// Reads a dump file with [prepare_input].
pub fn read_input(path: &Path, mode: LayoutMode) -> Result<String, InputError> {
    let io_error = |source| InputError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    let mut reader = BufReader::new(file);

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).map_err(io_error)?;

    prepare_input(&buffer, mode)
}
