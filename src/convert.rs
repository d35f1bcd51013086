// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/convert.rs - Scalar type conversions for dissected field values.
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
 * # `convert` Module
 *
 * Pure conversions from a field's raw hex digits to a human-readable value.
 * The conversion is selected by the field's `type` attribute:
 *
 * | Tag     | Meaning                                                     |
 * |---------|-------------------------------------------------------------|
 * | `PARSD` | Day count since 1966-01-02, shown as `dd-Mon-yyyy`           |
 * | `TOD`   | TOD clock high word, shown as `dd-Mon-yyyy HH:MM:SS`         |
 * | `ZTOD`  | Minute count since 1966-01-03                               |
 * | `MINS`  | Minute count, shown as `HH:MM`                              |
 * | `HHMM`  | One byte of hours, one byte of minutes                      |
 * | `B`     | One byte as eight binary digits                             |
 * | `D`     | Unsigned integer as decimal                                 |
 * | `N`     | One byte as its two nibbles                                 |
 * | other   | Text in the record's code page                              |
 *
 * ## Usage Example
 *
 * ```
 * use dissector::convert::convert;
 *
 * assert_eq!(convert("4CC1", "PARSD").unwrap(), "20-Oct-2019");
 * assert_eq!(convert("C1C2", "C").unwrap(), "AB");
 * ```
 */

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::ebcdic;
use crate::error::ConvertError;

/// Day zero of `PARSD` dates.
pub const PARS_DATE_EPOCH: (i32, u32, u32) = (1966, 1, 2);
/// Minute zero of `ZTOD` timestamps.
pub const ZTOD_EPOCH: (i32, u32, u32) = (1966, 1, 3);
/// Second zero of `TOD` timestamps.
pub const TOD_EPOCH: (i32, u32, u32) = (1900, 1, 1);

/// Seconds per unit of the TOD high word (2^20 microseconds).
const TOD_SECONDS_PER_UNIT: (i64, u32) = (1_048_576, 6);

const DATE_FORMAT: &str = "%d-%b-%Y";
const DATE_TIME_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// The conversion applied to a field's value, parsed from its `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    ParsDate,
    Tod,
    ZTod,
    Minutes,
    HourMinute,
    Binary,
    Decimal,
    Nibbles,
    #[default]
    Text,
}

impl ValueType {
    /// Parses a `type` tag, case-insensitively. Unknown tags decode as text.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "parsd" => ValueType::ParsDate,
            "tod" => ValueType::Tod,
            "ztod" => ValueType::ZTod,
            "mins" => ValueType::Minutes,
            "hhmm" => ValueType::HourMinute,
            "b" => ValueType::Binary,
            "d" => ValueType::Decimal,
            "n" => ValueType::Nibbles,
            _ => ValueType::Text,
        }
    }
}

/// The code page used to render text fields and dump columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// EBCDIC code page 037.
    #[default]
    Ebcdic,
    /// Bytes pass through unchanged (ASCII/Latin-1).
    Ascii,
}

impl Charset {
    /// Decodes bytes, replacing non-printable characters with `.`.
    pub fn decode_printable(&self, data: &[u8]) -> String {
        match self {
            Charset::Ebcdic => ebcdic::decode_printable(data),
            Charset::Ascii => data
                .iter()
                .map(|&b| char::from(b))
                .map(|c| if c.is_control() { '.' } else { c })
                .collect(),
        }
    }
}

/// Converts hex digits according to a `type` tag, decoding text as EBCDIC.
pub fn convert(hex: &str, tag: &str) -> Result<String, ConvertError> {
    convert_value(hex, ValueType::from_tag(tag), Charset::Ebcdic)
}

/// Converts hex digits according to a parsed [`ValueType`].
///
/// Zero dates and times convert to an empty string, which callers treat as
/// "unset".
pub fn convert_value(
    hex: &str,
    value_type: ValueType,
    charset: Charset,
) -> Result<String, ConvertError> {
    if hex.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    if !hex.is_ascii() {
        return Err(ConvertError::InvalidHex(hex.to_string()));
    }

    match value_type {
        ValueType::ParsDate => {
            require_len(hex, 4)?;
            let days = parse_hex(hex)?;
            if days == 0 {
                return Ok(String::new());
            }
            let date = add(epoch(PARS_DATE_EPOCH), TimeDelta::try_days(to_i64(days)?), hex)?;
            Ok(date.format(DATE_FORMAT).to_string())
        }
        ValueType::Tod => {
            require_len(hex, 8)?;
            let count = parse_hex(&hex[..8])?;
            if count == 0 {
                return Ok(String::new());
            }
            let (minutes, seconds) = tod_minutes_seconds(count);
            let time = add(epoch(TOD_EPOCH), TimeDelta::try_minutes(minutes), hex)?;
            let time = add(time, TimeDelta::try_seconds(seconds), hex)?;
            Ok(time.format(DATE_TIME_FORMAT).to_string())
        }
        ValueType::ZTod => {
            require_len(hex, 8)?;
            let minutes = parse_hex(&hex[..8])?;
            if minutes == 0 {
                return Ok(String::new());
            }
            let time = add(epoch(ZTOD_EPOCH), TimeDelta::try_minutes(to_i64(minutes)?), hex)?;
            Ok(time.format(DATE_TIME_FORMAT).to_string())
        }
        ValueType::Minutes => {
            let minutes = parse_hex(hex)?;
            Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
        }
        ValueType::HourMinute => {
            require_len(hex, 4)?;
            let hours = parse_hex(&hex[..2])?;
            let minutes = parse_hex(&hex[2..4])?;
            if hours == 0 && minutes == 0 {
                return Ok(String::new());
            }
            Ok(format!("{:02}:{:02}", hours, minutes))
        }
        ValueType::Binary => Ok(format!("{:08b}", parse_hex(hex)? & 0xFF)),
        ValueType::Decimal => Ok(parse_hex(hex)?.to_string()),
        ValueType::Nibbles => {
            let byte = parse_hex(hex)? & 0xFF;
            Ok(format!("{},{}", byte >> 4, byte & 0x0F))
        }
        ValueType::Text => Ok(charset.decode_printable(&decode_hex(hex)?)),
    }
}

/// Parses hex digits as an unsigned integer.
pub fn parse_hex(hex: &str) -> Result<u64, ConvertError> {
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConvertError::InvalidHex(hex.to_string()));
    }
    u64::from_str_radix(hex, 16).map_err(|_| ConvertError::InvalidHex(hex.to_string()))
}

/// Decodes pairs of hex digits into bytes.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, ConvertError> {
    if hex.len() % 2 != 0 {
        return Err(ConvertError::OddLength(hex.to_string()));
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .ok_or_else(|| ConvertError::InvalidHex(hex.to_string()))
        })
        .collect()
}

/// Renders hex digits as a dump of 16 bytes per line.
///
/// Each line holds the relative offset, the bytes in groups of four and the
/// decoded text.
pub fn hex_dump(hex: &str, charset: Charset) -> Result<Vec<String>, ConvertError> {
    let data = decode_hex(hex)?;
    Ok(data
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let groups = chunk
                .chunks(4)
                .map(|group| group.iter().map(|b| format!("{:02X}", b)).collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "{:04X}  {:<35}  {}",
                row * 16,
                groups,
                charset.decode_printable(chunk)
            )
        })
        .collect())
}

// Whole minutes are the quotient rounded up at six decimal places and then
// truncated, so only quotients within 1e-6 of the next minute round up.
fn tod_minutes_seconds(count: u64) -> (i64, i64) {
    let (mantissa, scale) = TOD_SECONDS_PER_UNIT;
    let seconds = Decimal::new(mantissa, scale) * Decimal::from(count);
    let sixty = Decimal::from(60);
    let minutes = (seconds / sixty)
        .round_dp_with_strategy(6, RoundingStrategy::ToPositiveInfinity)
        .trunc();
    let remainder = (seconds % sixty).trunc();
    (
        minutes.to_i64().unwrap_or_default(),
        remainder.to_i64().unwrap_or_default(),
    )
}

fn epoch((year, month, day): (i32, u32, u32)) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn add(
    time: NaiveDateTime,
    delta: Option<TimeDelta>,
    hex: &str,
) -> Result<NaiveDateTime, ConvertError> {
    delta
        .and_then(|delta| time.checked_add_signed(delta))
        .ok_or_else(|| ConvertError::InvalidHex(hex.to_string()))
}

fn to_i64(value: u64) -> Result<i64, ConvertError> {
    i64::try_from(value).map_err(|_| ConvertError::InvalidHex(format!("{:X}", value)))
}

fn require_len(hex: &str, required: usize) -> Result<(), ConvertError> {
    if hex.len() < required {
        return Err(ConvertError::TooShort { required });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pars_date() {
        assert_eq!(convert("4CC1", "PARSD").unwrap(), "20-Oct-2019");
        assert_eq!(convert("0001", "parsd").unwrap(), "03-Jan-1966");
        assert_eq!(convert("0000", "PARSD").unwrap(), "");
        assert_eq!(
            convert("4CC", "PARSD"),
            Err(ConvertError::TooShort { required: 4 })
        );
    }

    #[test]
    fn test_tod_uses_high_word_only() {
        assert_eq!(
            convert("D2124223FECD1335", "TOD").unwrap(),
            "09-Feb-2017 07:22:53"
        );
        assert_eq!(convert("D2124223", "TOD").unwrap(), "09-Feb-2017 07:22:53");
        assert_eq!(convert("0000000012345678", "TOD").unwrap(), "");
        assert_eq!(
            convert("D21242", "TOD"),
            Err(ConvertError::TooShort { required: 8 })
        );
    }

    #[test]
    fn test_ztod() {
        assert_eq!(convert("0000003C", "ZTOD").unwrap(), "03-Jan-1966 01:00:00");
        assert_eq!(convert("000005A0", "ZTOD").unwrap(), "04-Jan-1966 00:00:00");
        assert_eq!(convert("00000000", "ZTOD").unwrap(), "");
    }

    #[test]
    fn test_minutes_and_hour_minute() {
        assert_eq!(convert("0190", "MINS").unwrap(), "06:40");
        assert_eq!(convert("05DC", "MINS").unwrap(), "25:00");
        assert_eq!(convert("0D2D", "HHMM").unwrap(), "13:45");
        assert_eq!(convert("0000", "HHMM").unwrap(), "");
    }

    #[test]
    fn test_binary_decimal_nibbles() {
        assert_eq!(convert("2F", "B").unwrap(), "00101111");
        assert_eq!(convert("2F", "N").unwrap(), "2,15");
        assert_eq!(convert("0A", "D").unwrap(), "10");
        assert_eq!(convert("00000100", "d").unwrap(), "256");
    }

    #[test]
    fn test_text() {
        assert_eq!(convert("C1C2", "C").unwrap(), "AB");
        assert_eq!(convert("C1C2", "").unwrap(), "AB");
        assert_eq!(
            convert_value("4142", ValueType::Text, Charset::Ascii).unwrap(),
            "AB"
        );
        assert_eq!(convert("C100", "C").unwrap(), "A.");
        assert!(matches!(
            convert("C1C", "C"),
            Err(ConvertError::OddLength(_))
        ));
    }

    #[test]
    fn test_errors() {
        assert_eq!(convert("", "D"), Err(ConvertError::EmptyInput));
        assert_eq!(convert("", "C"), Err(ConvertError::EmptyInput));
        assert!(matches!(convert("XYZ", "D"), Err(ConvertError::InvalidHex(_))));
        assert!(matches!(convert("+1", "D"), Err(ConvertError::InvalidHex(_))));
    }

    #[test]
    fn test_hex_dump() {
        let hex = "C1C2C3C4C5C6C7C8C9F0F1F2F3F4F5F6C1C2";
        let lines = hex_dump(hex, Charset::Ebcdic).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0000  C1C2C3C4 C5C6C7C8 C9F0F1F2 F3F4F5F6  ABCDEFGHI0123456"
        );
        assert_eq!(lines[1], format!("0010  {:<35}  AB", "C1C2"));
    }
}
