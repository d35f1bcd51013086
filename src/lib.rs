// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/lib.rs - Layout-driven dissector for mainframe binary records.
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

/*!
 * # `dissector` Crate
 *
 * A library for breaking mainframe records into named, typed fields using
 * DSECT-style XML layouts.
 *
 * The pipeline has three stages:
 *
 * 1. [input]: Reads a record dump, inflating it if it is zlib-compressed.
 * 2. [layout]: Loads the XML layout that describes the record.
 * 3. [dissector]: Walks the layout over the record and writes a report.
 *
 * Field values are rendered by [convert] (dates, times, numbers and EBCDIC
 * text), and value labels come from [values].
 *
 * ## Usage Example
 *
 * ```no_run
 * use std::path::Path;
 *
 * use dissector::dissector::Dissector;
 * use dissector::input::read_input;
 * use dissector::layout::Layout;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     // Load the layout
 *     let layout = Layout::from_file(Path::new("record.xml"))?;
 *
 *     // Read the record dump
 *     let input = read_input(Path::new("record.hex"), layout.mode)?;
 *
 *     // Resolve external layouts next to the main one
 *     let source = layout.sibling_source();
 *     let mut dissector = Dissector::new(&layout);
 *     if let Some(source) = &source {
 *         dissector = dissector.with_source(source);
 *     }
 *
 *     let dissection = dissector.dissect(&input);
 *     print!("{}", dissection.report);
 *     if let Err(error) = dissection.status {
 *         eprintln!("Dissection failed with status {}", error.code());
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

pub mod convert;
pub mod cursor;
pub mod dissector;
pub mod ebcdic;
pub mod error;
pub mod input;
pub mod layout;
pub mod report;
pub mod values;
