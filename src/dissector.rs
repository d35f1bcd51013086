// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/dissector.rs - Layout-driven record dissection.
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
 * # `dissector` Module
 *
 * This module walks a [Layout] over a record and produces a field-by-field
 * text report.
 *
 * Each `field` of an element is handled according to its kind:
 *
 * - `plain`: a fixed-length value, optionally labelled through `values`.
 * - `counter`: a repeat count for a named `struc`.
 * - `version` and `group`: a selector choosing one of several variants.
 * - `length`: the size of an embedded `struc` region that follows.
 * - `filler`: whatever is left, either shown as-is or dissected as a `struc`.
 *
 * ## Usage Example
 *
 * ```
 * use dissector::dissector::Dissector;
 * use dissector::layout::Layout;
 *
 * let layout = Layout::from_xml_str(
 *     r#"<layout type="dsect"><field name="Name" length="2" type="C"/></layout>"#,
 * )?;
 * let dissection = Dissector::new(&layout).dissect("C1C2");
 * assert!(dissection.status.is_ok());
 * assert!(dissection.report.ends_with("(0.2) Name : C1C2 = 'AB'\n"));
 * # Ok::<(), dissector::error::LayoutError>(())
 * ```
 */

use log::{debug, trace, warn};

use crate::convert::{Charset, ValueType, convert_value, hex_dump, parse_hex};
use crate::cursor::Cursor;
use crate::error::DissectError;
use crate::layout::{Attr, Element, FieldKind, Layout, LayoutMode, LayoutSource, MatchMode, Tag};
use crate::report::{OffsetRadix, Report};
use crate::values::ValueMeanings;

/// The largest repeat count a `counter` field may carry.
pub const MAX_COUNTER: u64 = 500;

/// Default limit on nested element processing.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Values longer than this many hex digits are shown as a dump.
const INLINE_HEX_LIMIT: usize = 32;

/// Settings for a [Dissector].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DissectOptions {
    pub offset_radix: OffsetRadix,
    pub charset: Charset,
    pub max_depth: usize,
}

impl Default for DissectOptions {
    fn default() -> Self {
        Self {
            offset_radix: OffsetRadix::Decimal,
            charset: Charset::Ebcdic,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The outcome of one dissection run.
///
/// The report holds everything written before a failure, so callers may
/// show it even when `status` is an error.
#[derive(Debug)]
pub struct Dissection {
    pub report: String,
    pub status: Result<(), DissectError>,
    /// The display offset reached, in layout units.
    pub offset: i64,
}

impl Dissection {
    /// `0` on success, otherwise the error's status code.
    pub fn code(&self) -> i32 {
        match &self.status {
            Ok(()) => 0,
            Err(error) => error.code(),
        }
    }
}

/// Dissects records against a layout.
///
/// The layout is only read, so one `Dissector` can process any number of
/// records, each with its own cursor and report.
pub struct Dissector<'l> {
    layout: &'l Layout,
    options: DissectOptions,
    source: Option<&'l dyn LayoutSource>,
}

#[derive(Debug, Default)]
struct FillerTracker {
    active: bool,
    accumulated: i64,
    declared_total: i64,
}

impl FillerTracker {
    fn begin(&mut self, declared_total: i64) {
        self.active = true;
        self.accumulated = 0;
        self.declared_total = declared_total;
    }

    fn record(&mut self, length: i64) {
        if self.active {
            self.accumulated = self.accumulated.saturating_add(length);
        }
    }

    /// The filler's length, if tracking was active. Always resets the tracker.
    fn finish(&mut self) -> Option<i64> {
        let length = self
            .active
            .then(|| self.declared_total - self.accumulated);
        *self = Self::default();
        length
    }
}

/// Mutable state of a single run.
struct Context<'i> {
    cursor: Cursor<'i>,
    report: Report,
    filler: FillerTracker,
    depth: usize,
}

/// An element being processed, linked to the elements enclosing it.
#[derive(Clone, Copy)]
struct Scope<'s> {
    element: &'s Element,
    outer: Option<&'s Scope<'s>>,
}

impl<'a> Scope<'a> {
    fn nested<'s>(&'s self, element: &'s Element) -> Scope<'s>
    where
        'a: 's,
    {
        Scope {
            element,
            outer: Some(self),
        }
    }

    /// Searches this element, then each enclosing one.
    fn lookup(&self, find: impl Fn(&'a Element) -> Option<&'a Element>) -> Option<&'a Element> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(found) = find(current.element) {
                return Some(found);
            }
            scope = current.outer;
        }
        None
    }

    fn find_struc(&self, name: &str) -> Option<&'a Element> {
        self.lookup(|e| e.find_named(&Tag::Struc, name))
    }
}

fn fail<T>(ctx: &mut Context<'_>, error: DissectError) -> Result<T, DissectError> {
    ctx.report.finish_line();
    if error.is_warning() {
        ctx.report.warning(&error);
    } else {
        ctx.report.error(&error);
    }
    Err(error)
}

fn invalid_data(field: &Element, value: &str, reason: impl ToString) -> DissectError {
    DissectError::InvalidHexEncoding {
        field: field.attrs.name.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Whether fewer characters were read than `length` units need.
fn is_short(ctx: &Context<'_>, value: &str, length: i64) -> bool {
    i64::try_from(value.chars().count()).unwrap_or(i64::MAX) < ctx.cursor.chars_for(length)
}

fn format_converted(value: &str, converted: &str) -> String {
    if converted.is_empty() {
        value.to_string()
    } else {
        format!("{} = '{}'", value, converted)
    }
}

impl<'l> Dissector<'l> {
    pub fn new(layout: &'l Layout) -> Self {
        Self {
            layout,
            options: DissectOptions::default(),
            source: None,
        }
    }

    pub fn with_options(mut self, options: DissectOptions) -> Self {
        self.options = options;
        self
    }

    /// Supplies layouts for `filler` fields whose `struc` is not defined inline.
    pub fn with_source(mut self, source: &'l dyn LayoutSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Dissects one record.
    ///
    /// # Arguments
    ///
    /// * `input` - Hex digits for `dsect` layouts, raw characters otherwise.
    ///
    /// # Returns
    ///
    /// The report and the terminal status of the run.
    pub fn dissect(&self, input: &str) -> Dissection {
        let mut ctx = Context {
            cursor: Cursor::new(input, self.layout.mode),
            report: Report::new(self.options.offset_radix),
            filler: FillerTracker::default(),
            depth: 0,
        };

        let scope = Scope {
            element: &self.layout.root,
            outer: None,
        };
        let status = self.process(&mut ctx, &scope);
        if let Err(error) = &status {
            warn!(
                "Dissection stopped with status {}: {}",
                error.code(),
                error.root_cause()
            );
        }

        Dissection {
            offset: ctx.cursor.offset(),
            report: ctx.report.into_string(),
            status,
        }
    }

    fn mode(&self) -> LayoutMode {
        self.layout.mode
    }

    fn convert(&self, field: &Element, value: &str) -> Result<String, DissectError> {
        convert_value(value, field.attrs.value_type, self.options.charset)
            .map_err(|e| invalid_data(field, value, e))
    }

    fn process(&self, ctx: &mut Context<'_>, scope: &Scope<'_>) -> Result<(), DissectError> {
        if ctx.depth >= self.options.max_depth {
            let error = DissectError::RecursionLimit {
                name: scope.element.attrs.name.clone(),
                limit: self.options.max_depth,
            };
            return fail(ctx, error);
        }

        ctx.depth += 1;
        let result = self.process_fields(ctx, scope);
        ctx.depth -= 1;
        result
    }

    fn process_fields(&self, ctx: &mut Context<'_>, scope: &Scope<'_>) -> Result<(), DissectError> {
        let mut fields = scope.element.fields().peekable();
        if fields.peek().is_none() {
            ctx.report.warning("No fields found in the layout to parse");
            ctx.report.line(ctx.cursor.remaining());
            return Ok(());
        }

        for (index, field) in fields {
            self.process_field(ctx, scope, index, field)?;
        }
        Ok(())
    }

    fn process_field(
        &self,
        ctx: &mut Context<'_>,
        scope: &Scope<'_>,
        index: usize,
        field: &Element,
    ) -> Result<(), DissectError> {
        let attrs = &field.attrs;
        let name = attrs.name.as_str();

        let minus = match attrs.minus.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(minus) => match minus.parse::<i64>() {
                Ok(minus) => minus,
                Err(_) => {
                    let error = DissectError::InvalidAttribute {
                        field: name.to_string(),
                        attribute: "minus",
                    };
                    return fail(ctx, error);
                }
            },
        };

        let declared = attrs.length.as_deref().map(str::trim).filter(|l| !l.is_empty());
        let length = if attrs.kind == FieldKind::Filler {
            0
        } else {
            match declared.map(str::parse::<i64>) {
                Some(Ok(length)) if length >= 0 => length,
                _ => {
                    let error = DissectError::InvalidAttribute {
                        field: name.to_string(),
                        attribute: "length",
                    };
                    return fail(ctx, error);
                }
            }
        };

        let label = ctx
            .report
            .label(ctx.cursor.offset(), declared.unwrap_or_default(), name);
        trace!("{:?} field {} at {}", attrs.kind, name, ctx.cursor.offset());

        if declared.is_some() {
            ctx.cursor.advance_display(length);
        }

        if attrs.use_for_filler {
            let value = ctx.cursor.peek(length);
            let total = convert_value(value, ValueType::Decimal, self.options.charset)
                .map_err(|e| e.to_string())
                .and_then(|total| total.parse::<i64>().map_err(|e| e.to_string()));
            match total {
                Ok(total) => ctx.filler.begin(total),
                Err(reason) => return fail(ctx, invalid_data(field, value, reason)),
            }
        } else if declared.is_some() && attrs.kind != FieldKind::Filler {
            ctx.filler.record(length);
        }

        match attrs.kind {
            FieldKind::Plain => self.plain(ctx, field, &label, length),
            FieldKind::Counter => self.counter(ctx, scope, index, field, &label, length),
            FieldKind::Version => self.version(ctx, scope, index, field, &label, length),
            FieldKind::Group => self.group(ctx, scope, index, field, &label, length),
            FieldKind::Length => self.length(ctx, scope, index, field, &label, length, minus),
            FieldKind::Filler => self.filler(ctx, scope, field),
        }
    }

    fn head(&self, ctx: &mut Context<'_>, scope: &Scope<'_>, index: usize) -> Result<(), DissectError> {
        match scope.element.next_head_sibling(index) {
            Some(head) => self.process(ctx, &scope.nested(head)),
            None => Ok(()),
        }
    }

    fn plain(
        &self,
        ctx: &mut Context<'_>,
        field: &Element,
        label: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        let attrs = &field.attrs;
        ctx.report.field(label);
        let value = ctx.cursor.take(length);
        let short = is_short(ctx, value, length);

        let meanings = ValueMeanings::parse(&attrs.values);
        let mut meaning = meanings.get(value).map(String::from);
        let mut bit_labels = Vec::new();
        if attrs.value_type == ValueType::Binary && !meanings.is_empty() && !short {
            let byte = match parse_hex(value) {
                Ok(byte) => (byte & 0xFF) as u8,
                Err(e) => return fail(ctx, invalid_data(field, value, e)),
            };
            match meanings.bit_labels(byte).as_slice() {
                [] => (),
                [single] => meaning = Some(single.to_string()),
                many => bit_labels = many.to_vec(),
            }
        }

        match self.mode() {
            LayoutMode::Dsect => {
                // A short value is shown raw and reported by `check_length`.
                let converted = if short {
                    String::new()
                } else {
                    match self.convert(field, value) {
                        Ok(converted) => converted,
                        Err(error) => return fail(ctx, error),
                    }
                };
                if meaning.is_none() {
                    meaning = meanings.get(&converted).map(String::from);
                }
                let meaning = meaning.map(|m| format!(" ({})", m)).unwrap_or_default();

                if value.len() > INLINE_HEX_LIMIT && !short {
                    let dump = match hex_dump(value, self.options.charset) {
                        Ok(dump) => dump,
                        Err(e) => return fail(ctx, invalid_data(field, value, e)),
                    };
                    ctx.report.line(&format!("[{} bytes]{}", value.len() / 2, meaning));
                    ctx.report.block(&dump);
                } else {
                    ctx.report
                        .line(&format!("{}{}", format_converted(value, &converted), meaning));
                }
            }
            LayoutMode::Raw => match meaning {
                Some(meaning) => ctx.report.line(&format!("'{}' ({})", value, meaning)),
                None => ctx.report.line(&format!("'{}'", value)),
            },
        }
        ctx.report.block(&bit_labels);

        self.check_length(ctx, field, value, length)
    }

    fn check_length(
        &self,
        ctx: &mut Context<'_>,
        field: &Element,
        value: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        let chars = value.chars().count();
        if i64::try_from(chars).unwrap_or(i64::MAX) == ctx.cursor.chars_for(length) {
            return Ok(());
        }
        let actual = match self.mode() {
            LayoutMode::Dsect => chars / 2,
            LayoutMode::Raw => chars,
        };
        let error = DissectError::ValueLengthMismatch {
            field: field.attrs.name.clone(),
            actual,
        };
        fail(ctx, error)
    }

    /// Shows a selector value: converted in `dsect` mode, quoted otherwise.
    fn selector(
        &self,
        ctx: &mut Context<'_>,
        field: &Element,
        value: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        match self.mode() {
            LayoutMode::Dsect if !is_short(ctx, value, length) => match self.convert(field, value) {
                Ok(converted) => ctx.report.line(&format_converted(value, &converted)),
                Err(error) => return fail(ctx, error),
            },
            _ => ctx.report.line(&format!("'{}'", value)),
        }
        Ok(())
    }

    fn counter(
        &self,
        ctx: &mut Context<'_>,
        scope: &Scope<'_>,
        index: usize,
        field: &Element,
        label: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        let target = field.attrs.target.as_str();
        ctx.report.field(label);
        let value = ctx.cursor.take(length);
        ctx.report.line(&format!("'{}'", value));

        let Some(struc) = scope.find_struc(target) else {
            let error = DissectError::CounterStrucNotFound {
                name: target.to_string(),
            };
            return fail(ctx, error);
        };

        let radix = match self.mode() {
            LayoutMode::Dsect => 16,
            LayoutMode::Raw => 10,
        };
        let count = match u64::from_str_radix(value, radix) {
            Ok(count) if !value.starts_with('+') => count,
            _ => {
                let error = DissectError::InvalidCounterValue {
                    value: value.to_string(),
                };
                return fail(ctx, error);
            }
        };
        if count > MAX_COUNTER {
            let error = DissectError::CounterTooHigh {
                count,
                value: value.to_string(),
                max: MAX_COUNTER,
            };
            return fail(ctx, error);
        }

        self.head(ctx, scope, index).map_err(DissectError::nested)?;

        debug!("Repeating struc {} {} times", struc.attrs.name, count);
        for i in 1..=count {
            ctx.report.line(&format!("{} {} of {} :", target, i, count));
            self.process(ctx, &scope.nested(struc))
                .map_err(DissectError::nested)?;
        }
        Ok(())
    }

    fn version(
        &self,
        ctx: &mut Context<'_>,
        scope: &Scope<'_>,
        index: usize,
        field: &Element,
        label: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        ctx.report.field(label);
        let selector = ctx.cursor.take(length);
        self.selector(ctx, field, selector, length)?;
        self.head(ctx, scope, index)?;

        let Some(version) = scope.lookup(|e| e.find_named(&Tag::Version, selector)) else {
            let error = DissectError::VersionNotFound {
                selector: selector.to_string(),
            };
            return fail(ctx, error);
        };

        for include in &version.attrs.include {
            let found = scope.lookup(|e| {
                e.find_by_attribute(&Tag::Version, Attr::Name, include, MatchMode::Exact)
            });
            let Some(included) = found else {
                let error = DissectError::VersionNotFound {
                    selector: include.clone(),
                };
                return fail(ctx, error);
            };
            ctx.report
                .line(&format!("---Version {} (included)", included.attrs.name));
            self.process(ctx, &scope.nested(included))?;
        }

        debug!("Selected version {} for {}", version.attrs.name, selector);
        ctx.report.line(&format!("---Version {}", version.attrs.name));
        self.process(ctx, &scope.nested(version))
    }

    fn group(
        &self,
        ctx: &mut Context<'_>,
        scope: &Scope<'_>,
        index: usize,
        field: &Element,
        label: &str,
        length: i64,
    ) -> Result<(), DissectError> {
        ctx.report.field(label);
        let selector = ctx.cursor.take(length);
        self.selector(ctx, field, selector, length)?;

        let group = scope
            .lookup(|e| e.find_named(&Tag::Group, selector))
            .or_else(|| {
                scope.lookup(|e| e.find_by_attribute(&Tag::Group, Attr::Name, "", MatchMode::Exact))
            });
        let Some(group) = group else {
            let error = DissectError::GroupNotFound {
                selector: selector.to_string(),
            };
            return fail(ctx, error);
        };

        let title = match group.attrs.name.as_str() {
            "" => "---Default group".to_string(),
            name => format!("---Group {}", name),
        };
        match &group.attrs.alias {
            Some(alias) => ctx.report.line(&format!("{} ({})", title, alias)),
            None => ctx.report.line(&title),
        }

        self.head(ctx, scope, index)?;
        self.process(ctx, &scope.nested(group))
    }

    #[allow(clippy::too_many_arguments)]
    fn length<'i>(
        &self,
        ctx: &mut Context<'i>,
        scope: &Scope<'_>,
        index: usize,
        field: &Element,
        label: &str,
        length: i64,
        minus: i64,
    ) -> Result<(), DissectError> {
        let attrs = &field.attrs;
        ctx.report.field(label);
        let value = ctx.cursor.take(length);

        let parsed = match parse_hex(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                ctx.report.line(&format!("'{}'", value));
                return fail(ctx, invalid_data(field, value, e));
            }
        };

        match self.mode() {
            LayoutMode::Dsect if is_short(ctx, value, length) => {
                ctx.report.line(value);
                ctx.report.warning(DissectError::ValueLengthMismatch {
                    field: attrs.name.clone(),
                    actual: value.len() / 2,
                });
            }
            LayoutMode::Dsect => {
                let converted = match self.convert(field, value) {
                    Ok(converted) => converted,
                    Err(error) => return fail(ctx, error),
                };
                ctx.report.line(&format_converted(value, &converted));
            }
            LayoutMode::Raw => ctx.report.line(&format!("'{}'", value)),
        }

        let mut size = i64::try_from(parsed).unwrap_or(i64::MAX);
        if attrs.part_of_struc {
            size -= length;
        }
        size = size.saturating_sub(minus);
        if size <= 0 {
            debug!("Length field {} leaves no data for {}", attrs.name, attrs.target);
            return Ok(());
        }

        self.head(ctx, scope, index)?;
        let sub = ctx.cursor.take(size);

        let Some(struc) = scope.find_struc(&attrs.target) else {
            let error = DissectError::LengthStrucNotFound {
                name: attrs.target.clone(),
            };
            return fail(ctx, error);
        };

        ctx.report
            .line(&format!("---{} Size={}", attrs.target, size));
        if (sub.chars().count() as i64) < ctx.cursor.chars_for(size) {
            ctx.report
                .warning(format!("{} data shorter than its declared size", attrs.target));
        }
        self.repeat(ctx, scope, struc, sub)
    }

    fn filler<'i>(
        &self,
        ctx: &mut Context<'i>,
        scope: &Scope<'_>,
        field: &Element,
    ) -> Result<(), DissectError> {
        let attrs = &field.attrs;
        let value = match ctx.filler.finish() {
            Some(length) if length > 0 => ctx.cursor.take(length),
            // Unlike `Cursor::take`, a non-positive tracked length takes nothing.
            Some(_) => "",
            None => ctx.cursor.take(0),
        };
        if value.is_empty() {
            return Ok(());
        }

        if attrs.target.is_empty() {
            let chars = value.chars().count();
            let units = match self.mode() {
                LayoutMode::Dsect => chars / 2,
                LayoutMode::Raw => chars,
            };
            let label = ctx
                .report
                .label(ctx.cursor.offset(), units, &attrs.name);
            ctx.report.field(&label);
            ctx.cursor
                .advance_display(i64::try_from(units).unwrap_or(i64::MAX));

            match self.mode() {
                LayoutMode::Dsect => {
                    let converted = match self.convert(field, value) {
                        Ok(converted) => converted,
                        Err(error) => return fail(ctx, error),
                    };
                    if value.len() > INLINE_HEX_LIMIT {
                        let dump = match hex_dump(value, self.options.charset) {
                            Ok(dump) => dump,
                            Err(e) => return fail(ctx, invalid_data(field, value, e)),
                        };
                        ctx.report.line(&format!("[{} bytes]", units));
                        ctx.report.block(&dump);
                    } else {
                        ctx.report.line(&format_converted(value, &converted));
                    }
                }
                LayoutMode::Raw => ctx.report.line(&format!("'{}'", value)),
            }
            return Ok(());
        }

        if let Some(struc) = scope.find_struc(&attrs.target) {
            ctx.report
                .line(&format!("---{} [Rest of the data]:", attrs.target));
            return self.repeat(ctx, scope, struc, value);
        }

        let external = match self.source {
            Some(source) => source.load(&attrs.target).map_err(|e| e.to_string()),
            None => Err("No external layout source".to_string()),
        };
        match external {
            Ok(layout) => {
                debug!("Loaded external layout {} for filler {}", attrs.target, attrs.name);
                ctx.report
                    .line(&format!("---{} [Rest of the data]:", attrs.target));
                self.repeat(ctx, scope, &layout.root, value)
            }
            Err(reason) => {
                let error = DissectError::FillerStrucNotFound {
                    name: attrs.target.clone(),
                    reason,
                };
                fail(ctx, error)
            }
        }
    }

    /// Dissects `sub` with `struc` until it is used up, then restores the
    /// outer input.
    fn repeat<'i>(
        &self,
        ctx: &mut Context<'i>,
        scope: &Scope<'_>,
        struc: &Element,
        sub: &'i str,
    ) -> Result<(), DissectError> {
        let outer = ctx.cursor.narrow(sub);
        let inner = scope.nested(struc);
        let mut result = Ok(());
        while !ctx.cursor.is_empty() {
            let before = ctx.cursor.remaining().len();
            result = self.process(ctx, &inner);
            if result.is_err() {
                break;
            }
            if ctx.cursor.remaining().len() == before {
                ctx.report.warning(format!(
                    "'{}' consumed no data, {} left undissected",
                    struc.attrs.name,
                    ctx.cursor.remaining()
                ));
                break;
            }
        }
        ctx.cursor.restore(outer);
        result
    }
}
