// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/report.rs - Text report produced by a dissection.
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

use std::fmt::Display;

/// Width of the right-justified `(offset.length) name` column.
pub const LABEL_WIDTH: usize = 35;

/// How field offsets are rendered in labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetRadix {
    #[default]
    Decimal,
    Hex,
}

/// An append-only report.
#[derive(Debug, Default)]
pub struct Report {
    text: String,
    radix: OffsetRadix,
}

impl Report {
    pub fn new(radix: OffsetRadix) -> Self {
        Self {
            text: String::new(),
            radix,
        }
    }

    /// Formats a `(offset.length) name` label.
    pub fn label(&self, offset: i64, length: impl Display, name: &str) -> String {
        match self.radix {
            OffsetRadix::Decimal => format!("({}.{}) {}", offset, length, name),
            OffsetRadix::Hex => format!("({:x}.{}) {}", offset, length, name),
        }
    }

    /// Starts a field line; the value follows with [`Report::line`].
    pub fn field(&mut self, label: &str) {
        self.text
            .push_str(&format!("{:>width$} : ", label, width = LABEL_WIDTH));
    }

    /// Appends `text` and ends the line.
    pub fn line(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    /// Appends lines indented to the value column.
    pub fn block<S: AsRef<str>>(&mut self, lines: &[S]) {
        for line in lines {
            self.text.push_str(&" ".repeat(LABEL_WIDTH + 3));
            self.line(line.as_ref());
        }
    }

    pub fn warning(&mut self, message: impl Display) {
        self.line(&format!("Warning: {}", message));
    }

    pub fn error(&mut self, message: impl Display) {
        self.line(&format!("Error: {}", message));
    }

    /// Ends a field line left open by [`Report::field`] before an error.
    pub fn finish_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_line() {
        let mut report = Report::new(OffsetRadix::Decimal);
        let label = report.label(0, 4, "Len");
        report.field(&label);
        report.line("00000004 = '4'");
        assert_eq!(
            report.into_string(),
            format!("{:>35} : 00000004 = '4'\n", "(0.4) Len")
        );
    }

    #[test]
    fn test_hex_offsets() {
        let report = Report::new(OffsetRadix::Hex);
        assert_eq!(report.label(26, 2, "Flags"), "(1a.2) Flags");
    }

    #[test]
    fn test_warning_error_and_finish_line() {
        let mut report = Report::default();
        report.field("(0.1) X");
        report.finish_line();
        report.finish_line();
        report.warning("short");
        report.error("broken");
        assert!(report.into_string().ends_with(" : \nWarning: short\nError: broken\n"));
    }

    #[test]
    fn test_block_is_indented() {
        let mut report = Report::default();
        report.block(&["one", "two"]);
        let indent = " ".repeat(38);
        assert_eq!(report.into_string(), format!("{indent}one\n{indent}two\n"));
    }
}
