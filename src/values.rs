// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/values.rs - Value meaning maps for layout fields.
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

use std::collections::HashMap;

use csv;

/// Bit masks of a one-byte flag field, most significant bit first.
const BIT_MASKS: [(&str, u8); 8] = [
    ("80", 0x80),
    ("40", 0x40),
    ("20", 0x20),
    ("10", 0x10),
    ("08", 0x08),
    ("04", 0x04),
    ("02", 0x02),
    ("01", 0x01),
];

/// Labels for a field's values, parsed from its `values` attribute.
///
/// The attribute has the form `key=label,key=label`. Entries without exactly
/// one `=` are dropped.
#[derive(Debug, Default)]
pub struct ValueMeanings {
    labels: HashMap<String, String>,
}

impl ValueMeanings {
    pub fn parse(values: &str) -> Self {
        let mut labels = HashMap::new();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b',')
            .quoting(false)
            .flexible(true)
            .has_headers(false)
            .from_reader(values.as_bytes());

        for record in reader.records().flatten() {
            for pair in record.iter() {
                let mut parts: Vec<&str> = pair.split('=').collect();
                while parts.last().is_some_and(|part| part.is_empty()) {
                    parts.pop();
                }
                if let [key, label] = parts[..] {
                    labels.insert(key.to_string(), label.to_string());
                }
            }
        }

        Self { labels }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Labels of the bits set in `byte`, most significant bit first.
    pub fn bit_labels(&self, byte: u8) -> Vec<&str> {
        BIT_MASKS
            .iter()
            .filter(|(_, mask)| byte & mask != 0)
            .filter_map(|(key, _)| self.get(key))
            .collect()
    }
}
