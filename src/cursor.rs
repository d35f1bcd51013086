// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/cursor.rs - Input consumption and offset bookkeeping.
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

use crate::layout::LayoutMode;

/// The unconsumed part of a record plus the display offset.
///
/// Lengths are given in layout units: bytes in [`LayoutMode::Dsect`] (two hex
/// digits each) and characters in [`LayoutMode::Raw`].
#[derive(Debug)]
pub struct Cursor<'i> {
    remaining: &'i str,
    offset: i64,
    mode: LayoutMode,
}

impl<'i> Cursor<'i> {
    pub fn new(input: &'i str, mode: LayoutMode) -> Self {
        Self {
            remaining: input,
            offset: 0,
            mode,
        }
    }

    /// Consumes `len` units, or everything left when `len <= 0`.
    ///
    /// A short read returns whatever is left; callers compare the result with
    /// the declared length.
    pub fn take(&mut self, len: i64) -> &'i str {
        let (value, rest) = self.split(len);
        self.remaining = rest;
        value
    }

    /// Returns what [`Cursor::take`] would, without consuming it.
    pub fn peek(&self, len: i64) -> &'i str {
        self.split(len).0
    }

    /// Advances the display offset by a field's declared length.
    pub fn advance_display(&mut self, len: i64) {
        self.offset = self.offset.saturating_add(len);
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn remaining(&self) -> &'i str {
        self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Replaces the remaining input with `sub`, returning the previous input
    /// for [`Cursor::restore`].
    pub fn narrow(&mut self, sub: &'i str) -> &'i str {
        std::mem::replace(&mut self.remaining, sub)
    }

    pub fn restore(&mut self, saved: &'i str) {
        self.remaining = saved;
    }

    /// Number of input characters that make up `len` layout units.
    pub fn chars_for(&self, len: i64) -> i64 {
        match self.mode {
            LayoutMode::Dsect => len.saturating_mul(2),
            LayoutMode::Raw => len,
        }
    }

    fn split(&self, len: i64) -> (&'i str, &'i str) {
        if len <= 0 {
            return (self.remaining, "");
        }
        let chars = usize::try_from(self.chars_for(len)).unwrap_or(usize::MAX);
        match self.remaining.char_indices().nth(chars) {
            Some((at, _)) => self.remaining.split_at(at),
            None => (self.remaining, ""),
        }
    }
}
