// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/layout.rs - Layout tree, loader, and lookup helpers.
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
 * # `layout` Module
 *
 * This module loads XML record layouts into an immutable tree of
 * [Element]s and provides the lookups the dissector uses to resolve named
 * substructures.
 *
 * A layout looks like this:
 *
 * ```xml
 * <layout type="dsect">
 *   <field name="Len" length="4" type="D" kind="length" for="data"/>
 *   <struc name="data">
 *     <field name="Data" length="4" type="C"/>
 *   </struc>
 * </layout>
 * ```
 *
 * ## Usage Example
 *
 * ```
 * use dissector::layout::{Layout, LayoutMode, Tag};
 *
 * let layout = Layout::from_xml_str(r#"<layout type="dsect"><struc name="data"/></layout>"#)?;
 * assert_eq!(layout.mode, LayoutMode::Dsect);
 * assert!(layout.root.find_named(&Tag::Struc, "data").is_some());
 * # Ok::<(), dissector::error::LayoutError>(())
 * ```
 */

use std::path::{Path, PathBuf};

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::convert::ValueType;
use crate::error::LayoutError;

/// How declared lengths relate to the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Lengths count bytes; input is hex digits, two per byte.
    Dsect,
    /// Lengths count characters; input is consumed as-is.
    Raw,
}

/// The per-field dispatch discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Plain,
    Counter,
    Version,
    Group,
    Length,
    Filler,
}

impl FieldKind {
    /// Parses a `kind` attribute. An absent or empty kind is [`FieldKind::Plain`].
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "" | "plain" => Some(FieldKind::Plain),
            "counter" => Some(FieldKind::Counter),
            "version" => Some(FieldKind::Version),
            "group" => Some(FieldKind::Group),
            "length" => Some(FieldKind::Length),
            "filler" => Some(FieldKind::Filler),
            _ => None,
        }
    }
}

/// An element's tag, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Field,
    Struc,
    Version,
    Group,
    Head,
    /// Any other tag, lowercased. The document root usually lands here.
    Other(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "field" => Tag::Field,
            "struc" => Tag::Struc,
            "version" => Tag::Version,
            "group" => Tag::Group,
            "head" => Tag::Head,
            other => Tag::Other(other.to_string()),
        }
    }
}

/// Attributes that [`Element::find_by_attribute`] can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Name,
    Alias,
}

/// How a candidate's attribute is compared with the searched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive equality.
    Exact,
    /// The searched value starts with the candidate's value.
    Prefix,
    /// The searched value ends with the candidate's value.
    Suffix,
}

/// The attributes of a layout element.
///
/// `length` and `minus` stay as written; the dissector validates them so that
/// a bad value is reported at the field that carries it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub name: String,
    /// The `type` attribute as written.
    pub type_tag: String,
    /// The conversion selected by `type`.
    pub value_type: ValueType,
    pub kind: FieldKind,
    /// The `for` attribute: the substructure a field refers to.
    pub target: String,
    pub length: Option<String>,
    pub values: String,
    pub minus: Option<String>,
    pub use_for_filler: bool,
    pub part_of_struc: bool,
    pub include: Vec<String>,
    pub alias: Option<String>,
}

impl Attributes {
    fn from_pairs(pairs: &[(String, String)]) -> Result<Self, LayoutError> {
        let mut attrs = Attributes::default();
        let mut kind = String::new();

        for (key, value) in pairs {
            match key.as_str() {
                "name" => attrs.name = value.clone(),
                "type" => {
                    attrs.type_tag = value.clone();
                    attrs.value_type = ValueType::from_tag(value);
                }
                "kind" => kind = value.clone(),
                "for" => attrs.target = value.clone(),
                "length" => attrs.length = Some(value.clone()),
                "values" => attrs.values = value.clone(),
                "minus" => attrs.minus = Some(value.clone()),
                "useForFiller" => attrs.use_for_filler = !value.is_empty(),
                "partofstruc" => attrs.part_of_struc = value.eq_ignore_ascii_case("y"),
                "include" => {
                    attrs.include = value
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect()
                }
                "alias" => attrs.alias = Some(value.clone()).filter(|alias| !alias.is_empty()),
                _ => (),
            }
        }

        attrs.kind = FieldKind::parse(&kind).ok_or_else(|| LayoutError::UnknownKind {
            field: attrs.name.clone(),
            kind,
        })?;

        Ok(attrs)
    }

    /// Returns the value of a searchable attribute.
    pub fn get(&self, attr: Attr) -> &str {
        match attr {
            Attr::Name => &self.name,
            Attr::Alias => self.alias.as_deref().unwrap_or_default(),
        }
    }
}

/// A node of the layout tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub attrs: Attributes,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Result<Self, LayoutError> {
        let tag = Tag::from_name(&String::from_utf8_lossy(start.name().as_ref()));

        let mut pairs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| LayoutError::Attribute(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| LayoutError::Attribute(e.to_string()))?
                .to_string();
            pairs.push((key, value));
        }

        Ok(Self {
            tag,
            attrs: Attributes::from_pairs(&pairs)?,
            children: Vec::new(),
        })
    }

    /// Children with the given tag, in document order.
    pub fn children_by_tag(&self, tag: &Tag) -> Vec<&Element> {
        self.children.iter().filter(|c| &c.tag == tag).collect()
    }

    /// The `field` children with their positions among all children.
    pub fn fields(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tag == Tag::Field)
    }

    /// Finds the first child with `tag` whose `attr` matches `value`.
    ///
    /// In [`MatchMode::Prefix`] and [`MatchMode::Suffix`] mode a candidate
    /// with an empty attribute never matches.
    pub fn find_by_attribute(
        &self,
        tag: &Tag,
        attr: Attr,
        value: &str,
        mode: MatchMode,
    ) -> Option<&Element> {
        self.children
            .iter()
            .filter(|c| &c.tag == tag)
            .find(|c| {
                let candidate = c.attrs.get(attr);
                match mode {
                    MatchMode::Exact => candidate.eq_ignore_ascii_case(value),
                    MatchMode::Prefix => !candidate.is_empty() && value.starts_with(candidate),
                    MatchMode::Suffix => !candidate.is_empty() && value.ends_with(candidate),
                }
            })
    }

    /// Finds a child by `name`, preferring an exact match over a prefix match.
    pub fn find_named(&self, tag: &Tag, name: &str) -> Option<&Element> {
        self.find_by_attribute(tag, Attr::Name, name, MatchMode::Exact)
            .or_else(|| self.find_by_attribute(tag, Attr::Name, name, MatchMode::Prefix))
    }

    /// The `head` element immediately after child `index`, if any.
    pub fn next_head_sibling(&self, index: usize) -> Option<&Element> {
        self.children
            .get(index + 1)
            .filter(|sibling| sibling.tag == Tag::Head)
    }
}

/// A loaded layout document.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub root: Element,
    pub mode: LayoutMode,
    /// The directory the layout was loaded from, for external references.
    pub dir: Option<PathBuf>,
}

impl Layout {
    /// Wraps an already-built tree. The mode comes from the root's `type`.
    pub fn from_root(root: Element, dir: Option<PathBuf>) -> Self {
        let mode = if root.attrs.type_tag.eq_ignore_ascii_case("dsect") {
            LayoutMode::Dsect
        } else {
            LayoutMode::Raw
        };
        Self { root, mode, dir }
    }

    /// Parses a layout from an XML string.
    pub fn from_xml_str(xml: &str) -> Result<Self, LayoutError> {
        Ok(Self::from_root(parse_document(xml)?, None))
    }

    /// Reads and parses a layout file.
    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let xml = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root = parse_document(&xml)?;
        debug!("Loaded layout {:?} ({} top-level elements)", path, root.children.len());
        Ok(Self::from_root(root, path.parent().map(Path::to_path_buf)))
    }

    /// A source for layouts stored next to this one.
    pub fn sibling_source(&self) -> Option<DirLayoutSource> {
        self.dir.clone().map(DirLayoutSource::new)
    }
}

/// Supplies layouts that a layout refers to by name.
pub trait LayoutSource {
    fn load(&self, name: &str) -> Result<Layout, LayoutError>;
}

/// Loads referenced layouts from a directory, trying `name` and `name.xml`.
#[derive(Debug, Clone)]
pub struct DirLayoutSource {
    dir: PathBuf,
}

impl DirLayoutSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl LayoutSource for DirLayoutSource {
    fn load(&self, name: &str) -> Result<Layout, LayoutError> {
        let candidates = [self.dir.join(name), self.dir.join(format!("{}.xml", name))];
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Layout::from_file(path),
            None => Err(LayoutError::NotFound(name.to_string())),
        }
    }
}

fn parse_document(xml: &str) -> Result<Element, LayoutError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => attach(&mut stack, &mut root, Element::from_start(&start)?),
            Event::End(_) => {
                let element = stack.pop().ok_or(LayoutError::Unbalanced)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Eof => break,
            _ => (),
        }
    }

    if !stack.is_empty() {
        return Err(LayoutError::Unbalanced);
    }
    root.ok_or(LayoutError::Empty)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
