//! Cell format table (`cellXfs`) of a workbook's style sheet.
//!
//! Cells in the worksheet model carry their style facets by value. On load,
//! every `xf` record is decoded into a [`CellStyle`]; on save, a cell whose
//! style still matches the record it was loaded from keeps that record, and
//! any other style is looked up again. Records that existed in the template
//! keep their index and original XML, and combinations that did not exist
//! (centered copies of bordered cells, for example) are appended.

use std::collections::HashMap;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::template::model::{
    Alignment, CellStyle, HorizontalAlignment, Protection, VerticalAlignment,
};

/// Decoded `cellXfs` table plus the location of its XML.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    /// Original style sheet, when the package has one
    source: Option<String>,
    /// Byte range of the `cellXfs` element in `source`
    span: Option<(usize, usize)>,
    /// Namespace prefix used by the style sheet (`x:` in some producers)
    prefix: String,
    /// Decoded records with the XML each is written back as
    records: Vec<(CellStyle, String)>,
    index: HashMap<CellStyle, u32>,
}

impl StyleTable {
    /// Table for a package without a style sheet.
    ///
    /// Such a table resolves every index to the default style and writes no
    /// style references.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode the `cellXfs` table of a style sheet.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut table = StyleTable {
            source: Some(xml.to_string()),
            ..Self::default()
        };

        let mut in_cell_xfs = false;
        let mut xfs_start = 0;
        let mut current: Option<(CellStyle, usize)> = None;

        loop {
            let before = reader.buffer_position();
            match reader.read_event()? {
                Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                    in_cell_xfs = true;
                    xfs_start = before;
                    table.prefix = prefix_of(e);
                },
                Event::Empty(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                    table.prefix = prefix_of(e);
                    table.span = Some((before, reader.buffer_position()));
                },
                Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                    in_cell_xfs = false;
                    table.span = Some((xfs_start, reader.buffer_position()));
                },
                Event::Start(ref e) if in_cell_xfs && e.local_name().as_ref() == b"xf" => {
                    current = Some((parse_xf(e)?, before));
                },
                Event::Empty(ref e) if in_cell_xfs && e.local_name().as_ref() == b"xf" => {
                    let raw = xml[before..reader.buffer_position()].to_string();
                    table.push(parse_xf(e)?, raw);
                },
                Event::End(ref e) if in_cell_xfs && e.local_name().as_ref() == b"xf" => {
                    if let Some((style, start)) = current.take() {
                        let raw = xml[start..reader.buffer_position()].to_string();
                        table.push(style, raw);
                    }
                },
                Event::Empty(ref e) | Event::Start(ref e) if current.is_some() => {
                    if let Some((style, _)) = current.as_mut() {
                        match e.local_name().as_ref() {
                            b"alignment" => style.alignment = Some(parse_alignment(e)?),
                            b"protection" => style.protection = Some(parse_protection(e)?),
                            _ => {},
                        }
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        log::debug!("Loaded {} cell formats", table.records.len());
        Ok(table)
    }

    fn push(&mut self, style: CellStyle, raw: String) {
        let id = self.records.len() as u32;
        self.index.entry(style.clone()).or_insert(id);
        self.records.push((style, raw));
    }

    /// Number of records, including appended ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Style of record `id`; unknown ids resolve to the default style.
    pub fn style(&self, id: u32) -> CellStyle {
        self.records
            .get(id as usize)
            .map(|(style, _)| style.clone())
            .unwrap_or_default()
    }

    /// Record index for a cell's style.
    ///
    /// `original` is the record the cell was loaded with; it is kept while it
    /// still decodes to `style`, even when an earlier record decodes the same.
    /// Otherwise this falls back to [`StyleTable::intern`].
    pub fn resolve(&mut self, style: &CellStyle, original: Option<u32>) -> Option<u32> {
        self.source.as_ref()?;
        if let Some(id) = original {
            if self.records.get(id as usize).is_some_and(|(decoded, _)| decoded == style) {
                return Some(id);
            }
        }
        self.intern(style)
    }

    /// Record index for `style`, appending a record if none matches.
    ///
    /// Returns `None` when the package has no style sheet to write into.
    pub fn intern(&mut self, style: &CellStyle) -> Option<u32> {
        self.source.as_ref()?;
        if let Some(id) = self.index.get(style) {
            return Some(*id);
        }
        let raw = xf_xml(style, &self.prefix);
        let id = self.records.len() as u32;
        self.push(style.clone(), raw);
        Some(id)
    }

    /// Style sheet with the `cellXfs` element regenerated.
    ///
    /// Returns `None` when the package has no style sheet.
    pub fn to_xml(&self) -> Option<Result<String>> {
        let source = self.source.as_ref()?;
        let (start, end) = match self.span {
            Some(span) => span,
            None => {
                return Some(Err(Error::TemplateLoad(
                    "style sheet has no cellXfs table".to_string(),
                )))
            },
        };

        let tag = format!("{}cellXfs", self.prefix);
        let mut xml = String::with_capacity(source.len() + 256);
        xml.push_str(&source[..start]);
        xml.push_str(&format!("<{} count=\"{}\">", tag, self.records.len()));
        for (_, raw) in &self.records {
            xml.push_str(raw);
        }
        xml.push_str(&format!("</{}>", tag));
        xml.push_str(&source[end..]);
        Some(Ok(xml))
    }
}

pub(crate) fn prefix_of(e: &BytesStart) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

fn attr_u32(value: &str) -> u32 {
    value.trim().parse().unwrap_or(0)
}

fn attr_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

fn parse_xf(e: &BytesStart) -> Result<CellStyle> {
    let mut style = CellStyle::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"numFmtId" => style.number_format = attr_u32(&value),
            b"fontId" => style.font = attr_u32(&value),
            b"fillId" => style.fill = attr_u32(&value),
            b"borderId" => style.border = attr_u32(&value),
            b"xfId" => style.parent = attr_u32(&value),
            _ => {},
        }
    }
    Ok(style)
}

fn parse_alignment(e: &BytesStart) -> Result<Alignment> {
    let mut alignment = Alignment::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"horizontal" => alignment.horizontal = horizontal_from_str(&value),
            b"vertical" => alignment.vertical = vertical_from_str(&value),
            b"wrapText" => alignment.wrap_text = attr_bool(&value),
            b"indent" => alignment.indent = Some(attr_u32(&value)),
            b"textRotation" => alignment.text_rotation = Some(attr_u32(&value)),
            b"shrinkToFit" => alignment.shrink_to_fit = attr_bool(&value),
            _ => {},
        }
    }
    Ok(alignment)
}

fn parse_protection(e: &BytesStart) -> Result<Protection> {
    let mut protection = Protection::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"locked" => protection.locked = Some(attr_bool(&value)),
            b"hidden" => protection.hidden = Some(attr_bool(&value)),
            _ => {},
        }
    }
    Ok(protection)
}

fn horizontal_from_str(value: &str) -> Option<HorizontalAlignment> {
    Some(match value {
        "general" => HorizontalAlignment::General,
        "left" => HorizontalAlignment::Left,
        "center" => HorizontalAlignment::Center,
        "right" => HorizontalAlignment::Right,
        "fill" => HorizontalAlignment::Fill,
        "justify" => HorizontalAlignment::Justify,
        "centerContinuous" => HorizontalAlignment::CenterContinuous,
        "distributed" => HorizontalAlignment::Distributed,
        _ => return None,
    })
}

fn horizontal_str(value: HorizontalAlignment) -> &'static str {
    match value {
        HorizontalAlignment::General => "general",
        HorizontalAlignment::Left => "left",
        HorizontalAlignment::Center => "center",
        HorizontalAlignment::Right => "right",
        HorizontalAlignment::Fill => "fill",
        HorizontalAlignment::Justify => "justify",
        HorizontalAlignment::CenterContinuous => "centerContinuous",
        HorizontalAlignment::Distributed => "distributed",
    }
}

fn vertical_from_str(value: &str) -> Option<VerticalAlignment> {
    Some(match value {
        "top" => VerticalAlignment::Top,
        "center" => VerticalAlignment::Middle,
        "bottom" => VerticalAlignment::Bottom,
        "justify" => VerticalAlignment::Justify,
        "distributed" => VerticalAlignment::Distributed,
        _ => return None,
    })
}

fn vertical_str(value: VerticalAlignment) -> &'static str {
    match value {
        VerticalAlignment::Top => "top",
        VerticalAlignment::Middle => "center",
        VerticalAlignment::Bottom => "bottom",
        VerticalAlignment::Justify => "justify",
        VerticalAlignment::Distributed => "distributed",
    }
}

/// XML for a new `xf` record.
fn xf_xml(style: &CellStyle, prefix: &str) -> String {
    let mut xml = format!(
        "<{p}xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"{}\"",
        style.number_format,
        style.font,
        style.fill,
        style.border,
        style.parent,
        p = prefix
    );
    for (flag, set) in [
        ("applyNumberFormat", style.number_format != 0),
        ("applyFont", style.font != 0),
        ("applyFill", style.fill != 0),
        ("applyBorder", style.border != 0),
        ("applyAlignment", style.alignment.is_some()),
        ("applyProtection", style.protection.is_some()),
    ] {
        if set {
            xml.push_str(&format!(" {}=\"1\"", flag));
        }
    }

    if style.alignment.is_none() && style.protection.is_none() {
        xml.push_str("/>");
        return xml;
    }
    xml.push('>');

    if let Some(alignment) = &style.alignment {
        xml.push_str(&format!("<{}alignment", prefix));
        if let Some(h) = alignment.horizontal {
            xml.push_str(&format!(" horizontal=\"{}\"", horizontal_str(h)));
        }
        if let Some(v) = alignment.vertical {
            xml.push_str(&format!(" vertical=\"{}\"", vertical_str(v)));
        }
        if let Some(rotation) = alignment.text_rotation {
            xml.push_str(&format!(" textRotation=\"{}\"", rotation));
        }
        if alignment.wrap_text {
            xml.push_str(" wrapText=\"1\"");
        }
        if let Some(indent) = alignment.indent {
            xml.push_str(&format!(" indent=\"{}\"", indent));
        }
        if alignment.shrink_to_fit {
            xml.push_str(" shrinkToFit=\"1\"");
        }
        xml.push_str("/>");
    }

    if let Some(protection) = &style.protection {
        xml.push_str(&format!("<{}protection", prefix));
        if let Some(locked) = protection.locked {
            xml.push_str(&format!(" locked=\"{}\"", u8::from(locked)));
        }
        if let Some(hidden) = protection.hidden {
            xml.push_str(&format!(" hidden=\"{}\"", u8::from(hidden)));
        }
        xml.push_str("/>");
    }

    xml.push_str(&format!("</{}xf>", prefix));
    xml
}

/// Escape text for element content or attribute values.
pub(crate) fn escape_text(text: &str) -> String {
    escape(text).into_owned()
}

/// Unescaped value of an attribute.
///
/// Package parts are read as UTF-8 strings, so the raw bytes are decoded
/// directly instead of through the reader's encoding.
pub(crate) fn attr_value(attr: &Attribute) -> Result<String> {
    let raw = String::from_utf8_lossy(&attr.value);
    unescape(&raw)
        .map(|value| value.into_owned())
        .map_err(|err| Error::Xml(err.to_string()))
}
