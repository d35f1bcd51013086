// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/error.rs - Error types for the record dissector.
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

use thiserror::Error;

/// Errors raised while loading a layout document.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The layout file could not be read.
    #[error("cannot read layout {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The layout document is not well-formed XML.
    #[error("malformed layout XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element carries an attribute that could not be decoded.
    #[error("malformed attribute in layout: {0}")]
    Attribute(String),

    /// A field declares a `kind` the engine does not know.
    #[error("field '{field}' has unknown kind '{kind}'")]
    UnknownKind { field: String, kind: String },

    /// The document has no root element.
    #[error("layout document is empty")]
    Empty,

    /// An end tag appeared without a matching start tag.
    #[error("unbalanced end tag in layout")]
    Unbalanced,

    /// No external layout with the requested name exists.
    #[error("layout '{0}' not found")]
    NotFound(String),
}

/// Errors raised by the scalar type conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("empty input")]
    EmptyInput,

    #[error("minimum {required} hex chars are required")]
    TooShort { required: usize },

    #[error("'{0}' is not valid hex")]
    InvalidHex(String),

    #[error("'{0}' has an odd number of hex digits")]
    OddLength(String),
}

/// Errors raised while reading a record dump.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read input {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot inflate compressed input: {0}")]
    Decompress(std::io::Error),
}

/// A structural failure detected while dissecting a record.
///
/// Every variant except [`DissectError::Nested`] is written to the report at
/// the point of detection, then returned outward unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DissectError {
    /// A `length` or `minus` attribute is missing or not an integer.
    #[error("Invalid {attribute} attribute for {field}")]
    InvalidAttribute {
        field: String,
        attribute: &'static str,
    },

    #[error("'{name}' Struc layout not found.")]
    CounterStrucNotFound { name: String },

    #[error("Version '{selector}' not found.")]
    VersionNotFound { selector: String },

    #[error("Group '{selector}' not found.")]
    GroupNotFound { selector: String },

    #[error("'{name}' Struc layout not found.")]
    LengthStrucNotFound { name: String },

    #[error("'{name}' Struc layout not found. {reason}")]
    FillerStrucNotFound { name: String, reason: String },

    #[error("Invalid counter '{value}'")]
    InvalidCounterValue { value: String },

    #[error("Counter value {count} ('{value}') too high (max={max})")]
    CounterTooHigh { count: u64, value: String, max: u64 },

    /// A value could not be decoded where hex (or a typed conversion) is required.
    #[error("Invalid data for {field}: {reason} '{value}'")]
    InvalidHexEncoding {
        field: String,
        value: String,
        reason: String,
    },

    /// Fewer units were available than the field declares.
    #[error("{field} value not lengthy enough (Current length: {actual})")]
    ValueLengthMismatch { field: String, actual: usize },

    #[error("Layout nesting exceeds {limit} levels at '{name}'")]
    RecursionLimit { name: String, limit: usize },

    /// A recursive call already reported this failure.
    #[error("nested structure failed: {0}")]
    Nested(Box<DissectError>),
}

impl DissectError {
    /// The signed status code reported to callers.
    pub fn code(&self) -> i32 {
        match self {
            DissectError::Nested(_) => -1,
            DissectError::InvalidHexEncoding { .. } => -2,
            DissectError::CounterStrucNotFound { .. } => -3,
            DissectError::VersionNotFound { .. } => -4,
            DissectError::GroupNotFound { .. } => -5,
            DissectError::FillerStrucNotFound { .. } => -6,
            DissectError::LengthStrucNotFound { .. } => -7,
            DissectError::InvalidAttribute { .. } => -10,
            DissectError::ValueLengthMismatch { .. } => -11,
            DissectError::InvalidCounterValue { .. } => -12,
            DissectError::CounterTooHigh { .. } => -13,
            DissectError::RecursionLimit { .. } => -14,
        }
    }

    /// The innermost error, looking through any [`DissectError::Nested`] wrappers.
    pub fn root_cause(&self) -> &DissectError {
        let mut error = self;
        while let DissectError::Nested(inner) = error {
            error = inner;
        }
        error
    }

    /// Whether the report shows this failure as a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, DissectError::ValueLengthMismatch { .. })
    }

    pub(crate) fn nested(self) -> Self {
        match self {
            DissectError::Nested(_) => self,
            other => DissectError::Nested(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_code_and_root_cause() {
        let inner = DissectError::CounterTooHigh {
            count: 501,
            value: "501".to_string(),
            max: 500,
        };
        let wrapped = inner.clone().nested().nested();
        assert_eq!(wrapped.code(), -1);
        assert_eq!(wrapped.root_cause(), &inner);
        assert_eq!(inner.code(), -13);
    }

    #[test]
    fn test_struc_not_found_messages() {
        let counter = DissectError::CounterStrucNotFound {
            name: "item".to_string(),
        };
        assert_eq!(counter.to_string(), "'item' Struc layout not found.");
        let filler = DissectError::FillerStrucNotFound {
            name: "TAIL".to_string(),
            reason: "layout 'TAIL' not found".to_string(),
        };
        assert_eq!(
            filler.to_string(),
            "'TAIL' Struc layout not found. layout 'TAIL' not found"
        );
    }
}
