// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  dissect.rs - Record dissection demo.
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

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dissector::convert::Charset;
use dissector::dissector::{DEFAULT_MAX_DEPTH, DissectOptions, Dissector};
use dissector::input::{prepare_input, read_input};
use dissector::layout::Layout;
use dissector::report::OffsetRadix;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The XML layout describing the record.
    layout: PathBuf,

    /// The record dump to dissect.
    #[arg(required_unless_present = "hex")]
    input: Option<PathBuf>,

    /// Dissect this string instead of reading a file.
    #[arg(long, value_name = "STRING", conflicts_with = "input")]
    hex: Option<String>,

    /// Show field offsets in hexadecimal.
    #[arg(long)]
    hex_offsets: bool,

    /// Decode text fields as ASCII instead of EBCDIC.
    #[arg(long)]
    ascii: bool,

    /// Maximum layout nesting depth.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log substructure resolution to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_module("dissector", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();

    let layout = match Layout::from_file(&args.layout) {
        Ok(layout) => layout,
        Err(error) => {
            eprintln!("Error loading layout {:?}: {}", &args.layout, error);
            return ExitCode::FAILURE;
        }
    };

    let input = match (&args.hex, &args.input) {
        (Some(hex), _) => prepare_input(hex.as_bytes(), layout.mode),
        (None, Some(path)) => read_input(path, layout.mode),
        (None, None) => {
            eprintln!("No input given");
            return ExitCode::FAILURE;
        }
    };
    let input = match input {
        Ok(input) => input,
        Err(error) => {
            eprintln!("Error reading input: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let options = DissectOptions {
        offset_radix: if args.hex_offsets {
            OffsetRadix::Hex
        } else {
            OffsetRadix::Decimal
        },
        charset: if args.ascii {
            Charset::Ascii
        } else {
            Charset::Ebcdic
        },
        max_depth: args.max_depth,
    };

    let source = layout.sibling_source();
    let mut dissector = Dissector::new(&layout).with_options(options);
    if let Some(source) = &source {
        dissector = dissector.with_source(source);
    }

    let dissection = dissector.dissect(&input);
    print!("{}", dissection.report);

    // Exit statuses are a single byte; keep the low byte of the negative code.
    ExitCode::from(dissection.code() as u8)
}
