//! Spreadsheet package codec.
//!
//! Loads the first worksheet of an `.xlsx` package into a [`Worksheet`] and
//! writes it back. XLSX files are ZIP archives of XML parts; the workbook part
//! and its relationships locate the worksheet, shared strings and style sheet.
//!
//! Saving regenerates only what the worksheet model owns: the worksheet's
//! `dimension`, `sheetData` and `mergeCells` elements and the style sheet's
//! `cellXfs` table. Every other part and every other element of those parts is
//! carried over byte for byte.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::template::address::{cell_ref, column_letters, parse_cell_ref, parse_range};
use crate::template::model::{Cell, CellValue, Formula, Row, Worksheet};
use crate::template::styles::{attr_value, escape_text, prefix_of, StyleTable};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_STYLES_PART: &str = "xl/styles.xml";
const DEFAULT_CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Worksheet children that must come after `mergeCells`, in schema order.
const AFTER_MERGE_CELLS: &[&[u8]] = &[
    b"phoneticPr",
    b"conditionalFormatting",
    b"dataValidations",
    b"hyperlinks",
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"drawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

/// One workbook relationship.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

/// Byte ranges of the worksheet elements regenerated on save.
#[derive(Debug, Clone, Default)]
struct SheetSpans {
    prefix: String,
    dimension: Option<(usize, usize)>,
    sheet_data: Option<(usize, usize)>,
    merge_cells: Option<(usize, usize)>,
    /// Where a `mergeCells` element goes when the template has none
    merge_cells_insert: usize,
}

/// A loaded template package.
///
/// # Examples
///
/// ```no_run
/// use ship_ticket::template::XlsxTemplate;
///
/// let bytes = std::fs::read("template.xlsx")?;
/// let mut template = XlsxTemplate::load(&bytes)?;
/// template.worksheet_mut().set_value(9, 1, "WIDGET-1".into());
/// std::fs::write("out.xlsx", template.to_bytes()?)?;
/// # Ok::<(), ship_ticket::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct XlsxTemplate {
    source: Vec<u8>,
    sheet_path: String,
    sheet_xml: String,
    spans: SheetSpans,
    styles_path: String,
    styles: StyleTable,
    calc_chain_path: String,
    drop_calc_chain: bool,
    worksheet: Worksheet,
}

impl XlsxTemplate {
    /// Load a template from package bytes.
    ///
    /// Fails with [`Error::TemplateLoad`] when the bytes are not a readable
    /// package and with [`Error::MissingWorksheet`] when the workbook declares
    /// no sheet.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Self::parse_package(bytes).map_err(|e| match e {
            Error::Xml(reason) | Error::Zip(reason) => Error::TemplateLoad(reason),
            Error::Io(err) => Error::TemplateLoad(err.to_string()),
            other => other,
        })
    }

    fn parse_package(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let workbook = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| Error::TemplateLoad(format!("missing {}", WORKBOOK_PART)))?;
        let relationships = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => Vec::new(),
        };

        let (sheet_name, sheet_rel) = first_sheet(&workbook)?.ok_or(Error::MissingWorksheet)?;
        let sheet_path = relationships
            .iter()
            .find(|r| r.id == sheet_rel)
            .map(|r| resolve_target(&r.target))
            .ok_or(Error::MissingWorksheet)?;
        let sheet_xml = read_part(&mut archive, &sheet_path)?.ok_or(Error::MissingWorksheet)?;

        let part_for = |suffix: &str, default: &str| {
            relationships
                .iter()
                .find(|r| r.kind.ends_with(suffix))
                .map(|r| resolve_target(&r.target))
                .unwrap_or_else(|| default.to_string())
        };
        let shared_path = part_for("/sharedStrings", DEFAULT_SHARED_STRINGS_PART);
        let styles_path = part_for("/styles", DEFAULT_STYLES_PART);
        let calc_chain_path = part_for("/calcChain", DEFAULT_CALC_CHAIN_PART);

        let shared = match read_part(&mut archive, &shared_path)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let styles = match read_part(&mut archive, &styles_path)? {
            Some(xml) => StyleTable::parse(&xml)?,
            None => StyleTable::empty(),
        };

        let (worksheet, spans) = parse_sheet(&sheet_xml, &sheet_name, &shared, &styles)?;
        log::info!(
            "Loaded worksheet '{}' from {}: {} rows, {} merges",
            worksheet.name,
            sheet_path,
            worksheet.rows().count(),
            worksheet.merges().len()
        );

        Ok(Self {
            source: bytes.to_vec(),
            sheet_path,
            sheet_xml,
            spans,
            styles_path,
            styles,
            calc_chain_path,
            drop_calc_chain: false,
            worksheet,
        })
    }

    /// The loaded worksheet.
    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    /// The loaded worksheet, for editing.
    pub fn worksheet_mut(&mut self) -> &mut Worksheet {
        &mut self.worksheet
    }

    /// Leave the calculation chain out of the saved package.
    ///
    /// Needed once rows have moved, as the chain lists cells by address and
    /// spreadsheet applications reject a chain naming cells without formulas.
    pub fn discard_calc_chain(&mut self) {
        self.drop_calc_chain = true;
    }

    /// Serialize the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut styles = self.styles.clone();
        let sheet_xml = self.render_sheet(&mut styles)?;

        let mut replaced: HashMap<String, String> = HashMap::new();
        replaced.insert(self.sheet_path.clone(), sheet_xml);
        if let Some(xml) = styles.to_xml() {
            replaced.insert(self.styles_path.clone(), xml?);
        }

        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut dropped: HashSet<String> = HashSet::new();
        if self.drop_calc_chain && archive.by_name(&self.calc_chain_path).is_ok() {
            let part_name = format!("/{}", self.calc_chain_path);
            if let Some(xml) = read_part(&mut archive, CONTENT_TYPES_PART)? {
                let xml = strip_empty_elements(&xml, b"Override", |attrs| {
                    attr(attrs, "PartName") == Some(part_name.as_str())
                })?;
                replaced.insert(CONTENT_TYPES_PART.to_string(), xml);
            }
            if let Some(xml) = read_part(&mut archive, WORKBOOK_RELS_PART)? {
                let xml = strip_empty_elements(&xml, b"Relationship", |attrs| {
                    attr(attrs, "Type").map_or(false, |t| t.ends_with("/calcChain"))
                })?;
                replaced.insert(WORKBOOK_RELS_PART.to_string(), xml);
            }
            dropped.insert(self.calc_chain_path.clone());
            log::debug!("Dropping {}", self.calc_chain_path);
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            let name = file.name().to_string();
            if dropped.contains(&name) {
                continue;
            }
            match replaced.get(&name) {
                Some(content) => {
                    drop(file);
                    writer.start_file(name, options)?;
                    writer.write_all(content.as_bytes())?;
                },
                None => writer.raw_copy_file(file)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    fn render_sheet(&self, styles: &mut StyleTable) -> Result<String> {
        let spans = &self.spans;
        let p = &spans.prefix;
        let sheet_data = spans
            .sheet_data
            .ok_or_else(|| Error::TemplateLoad(format!("{} has no sheetData", self.sheet_path)))?;

        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        if let Some((start, end)) = spans.dimension {
            edits.push((start, end, format!("<{}dimension ref=\"{}\"/>", p, self.used_range())));
        }
        edits.push((sheet_data.0, sheet_data.1, self.render_sheet_data(styles)));

        let merges = self.render_merge_cells();
        match spans.merge_cells {
            Some((start, end)) => edits.push((start, end, merges)),
            None if !merges.is_empty() => {
                edits.push((spans.merge_cells_insert, spans.merge_cells_insert, merges))
            },
            None => {},
        }

        edits.sort_by_key(|(start, _, _)| *start);
        let source = &self.sheet_xml;
        let mut xml = String::with_capacity(source.len() + 1024);
        let mut cursor = 0;
        for (start, end, text) in edits {
            xml.push_str(&source[cursor..start]);
            xml.push_str(&text);
            cursor = end;
        }
        xml.push_str(&source[cursor..]);
        Ok(xml)
    }

    fn used_range(&self) -> String {
        let sheet = &self.worksheet;
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (index, row) in sheet.rows() {
            for (col, _) in row.cells() {
                bounds = Some(match bounds {
                    None => (index, col, index, col),
                    Some((top, left, bottom, right)) => {
                        (top.min(index), left.min(col), bottom.max(index), right.max(col))
                    },
                });
            }
        }
        match bounds {
            Some((top, left, bottom, right)) if (top, left) != (bottom, right) => format!(
                "{}{}:{}{}",
                column_letters(left),
                top,
                column_letters(right),
                bottom
            ),
            Some((top, left, _, _)) => cell_ref(top, left),
            None => "A1".to_string(),
        }
    }

    fn render_sheet_data(&self, styles: &mut StyleTable) -> String {
        let p = &self.spans.prefix;
        let mut xml = format!("<{}sheetData>", p);

        for (index, row) in self.worksheet.rows() {
            if row.is_empty() && row.height.is_none() && row.attrs.is_empty() {
                continue;
            }
            xml.push_str(&format!("<{}row r=\"{}\"", p, index));
            if let Some(height) = row.height {
                xml.push_str(&format!(" ht=\"{}\"", height));
                if row.custom_height {
                    xml.push_str(" customHeight=\"1\"");
                }
            }
            for (key, value) in &row.attrs {
                xml.push_str(&format!(" {}=\"{}\"", key, escape_text(value)));
            }
            if row.is_empty() {
                xml.push_str("/>");
                continue;
            }
            xml.push('>');
            for (col, cell) in row.cells() {
                render_cell(&mut xml, p, index, col, cell, styles);
            }
            xml.push_str(&format!("</{}row>", p));
        }

        xml.push_str(&format!("</{}sheetData>", p));
        xml
    }

    fn render_merge_cells(&self) -> String {
        let merges = self.worksheet.merges();
        if merges.is_empty() {
            return String::new();
        }
        let p = &self.spans.prefix;
        let mut xml = format!("<{}mergeCells count=\"{}\">", p, merges.len());
        for region in merges {
            xml.push_str(&format!("<{}mergeCell ref=\"{}\"/>", p, region.range_ref()));
        }
        xml.push_str(&format!("</{}mergeCells>", p));
        xml
    }
}

fn render_cell(
    xml: &mut String,
    p: &str,
    row: u32,
    col: u32,
    cell: &Cell,
    styles: &mut StyleTable,
) {
    xml.push_str(&format!("<{}c r=\"{}\"", p, cell_ref(row, col)));
    if let Some(id) = styles.resolve(&cell.style, cell.xf_id).filter(|id| *id != 0) {
        xml.push_str(&format!(" s=\"{}\"", id));
    }

    match &cell.value {
        CellValue::Empty => xml.push_str("/>"),
        CellValue::Number(n) => xml.push_str(&format!("><{p}v>{}</{p}v></{p}c>", n, p = p)),
        CellValue::Text(text) => xml.push_str(&format!(
            " t=\"inlineStr\"><{p}is><{p}t xml:space=\"preserve\">{}</{p}t></{p}is></{p}c>",
            escape_text(text),
            p = p
        )),
        CellValue::Bool(b) => {
            xml.push_str(&format!(" t=\"b\"><{p}v>{}</{p}v></{p}c>", u8::from(*b), p = p))
        },
        CellValue::Error(e) => xml.push_str(&format!(
            " t=\"e\"><{p}v>{}</{p}v></{p}c>",
            escape_text(e),
            p = p
        )),
        CellValue::Formula(formula) => {
            if let Some(kind) = &formula.cached_type {
                xml.push_str(&format!(" t=\"{}\"", escape_text(kind)));
            }
            xml.push_str(&format!("><{}f", p));
            for (key, value) in &formula.attrs {
                xml.push_str(&format!(" {}=\"{}\"", key, escape_text(value)));
            }
            if formula.expr.is_empty() {
                xml.push_str("/>");
            } else {
                xml.push_str(&format!(">{}</{}f>", escape_text(&formula.expr), p));
            }
            if let Some(cached) = &formula.cached {
                xml.push_str(&format!("<{p}v>{}</{p}v>", escape_text(cached), p = p));
            }
            xml.push_str(&format!("</{}c>", p));
        },
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            if let Some(stripped) = content.strip_prefix('\u{feff}') {
                content = stripped.to_string();
            }
            Ok(Some(content))
        },
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Package path of a workbook relationship target.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        attrs.push((key, attr_value(&attr)?));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let attrs = attributes(e)?;
                relationships.push(Relationship {
                    id: attr(&attrs, "Id").unwrap_or_default().to_string(),
                    kind: attr(&attrs, "Type").unwrap_or_default().to_string(),
                    target: attr(&attrs, "Target").unwrap_or_default().to_string(),
                });
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(relationships)
}

/// Name and relationship id of the first sheet declared by the workbook.
fn first_sheet(xml: &str) -> Result<Option<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut rel = None;
                for a in e.attributes() {
                    let a = a.map_err(|err| Error::Xml(err.to_string()))?;
                    match a.key.local_name().as_ref() {
                        b"name" => name = attr_value(&a)?,
                        // r:id, whatever the relationship prefix is called
                        b"id" if a.key.prefix().is_some() => rel = Some(attr_value(&a)?),
                        _ => {},
                    }
                }
                return Ok(rel.map(|rel| (name, rel)));
            },
            Event::Eof => return Ok(None),
            _ => {},
        }
    }
}

/// Plain text of every shared string item. Rich runs are flattened and
/// phonetic hints skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" if !in_phonetic => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {},
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {},
            },
            Event::Text(ref e) if in_text => current.push_str(&e.unescape()?),
            Event::CData(e) if in_text => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()))
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(strings)
}

/// Where text content goes while inside a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextSlot {
    Value,
    Formula,
    Inline,
}

/// A `c` element being read.
#[derive(Debug, Default)]
struct PendingCell {
    col: u32,
    style: u32,
    kind: Option<String>,
    value: Option<String>,
    formula: Option<(Vec<(String, String)>, String)>,
    inline: String,
}

impl PendingCell {
    fn from_element(e: &BytesStart, default_col: u32) -> Result<Self> {
        let mut cell = PendingCell {
            col: default_col,
            ..Self::default()
        };
        for (key, value) in attributes(e)? {
            match key.as_str() {
                "r" => {
                    if let Some((_, col)) = parse_cell_ref(&value) {
                        cell.col = col;
                    }
                },
                "s" => cell.style = value.trim().parse().unwrap_or(0),
                "t" => cell.kind = Some(value),
                _ => {},
            }
        }
        Ok(cell)
    }

    fn push_text(&mut self, slot: TextSlot, text: &str) {
        match slot {
            TextSlot::Value => self.value.get_or_insert_with(String::new).push_str(text),
            TextSlot::Formula => {
                if let Some((_, expr)) = self.formula.as_mut() {
                    expr.push_str(text);
                }
            },
            TextSlot::Inline => self.inline.push_str(text),
        }
    }

    fn into_value(self, shared: &[String]) -> CellValue {
        if let Some((attrs, expr)) = self.formula {
            return CellValue::Formula(Formula {
                expr,
                attrs,
                cached: self.value,
                cached_type: self.kind.filter(|k| k != "n"),
            });
        }

        let value = self.value;
        match self.kind.as_deref() {
            Some("s") => value
                .and_then(|v| v.trim().parse::<usize>().ok())
                .and_then(|i| shared.get(i))
                .map(|s| CellValue::text(s.as_str()))
                .unwrap_or_default(),
            Some("inlineStr") => CellValue::text(self.inline),
            Some("str") | Some("d") => value.map(CellValue::text).unwrap_or_default(),
            Some("b") => value
                .map(|v| CellValue::Bool(v.trim() == "1"))
                .unwrap_or_default(),
            Some("e") => value.map(CellValue::Error).unwrap_or_default(),
            _ => match value {
                Some(v) => v
                    .trim()
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::text(v)),
                None => CellValue::Empty,
            },
        }
    }
}

fn parse_row_element(e: &BytesStart, default_index: u32) -> Result<(u32, Row)> {
    let mut index = default_index;
    let mut row = Row::new();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "r" => index = value.trim().parse().unwrap_or(default_index),
            "ht" => row.height = value.trim().parse().ok(),
            "customHeight" => row.custom_height = matches!(value.trim(), "1" | "true"),
            // Stale once cells move
            "spans" => {},
            _ => row.attrs.push((key, value)),
        }
    }
    Ok((index, row))
}

/// Decode a worksheet part into the model, recording where the regenerated
/// elements sit.
fn parse_sheet(
    xml: &str,
    name: &str,
    shared: &[String],
    styles: &StyleTable,
) -> Result<(Worksheet, SheetSpans)> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = Worksheet::new(name);
    let mut spans = SheetSpans::default();

    let mut depth = 0usize;
    let mut sheet_data_start = 0;
    let mut merge_cells_start = 0;
    let mut insert_at: Option<usize> = None;
    let mut after_sheet_data = false;

    let mut row: Option<(u32, Row)> = None;
    let mut last_row = 0u32;
    let mut cell: Option<PendingCell> = None;
    let mut last_col = 0u32;
    let mut slot: Option<TextSlot> = None;
    let mut in_phonetic = false;

    loop {
        let before = reader.buffer_position();
        let event = reader.read_event()?;
        let after = reader.buffer_position();

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let local = e.local_name();
                let local = local.as_ref();

                if depth == 1
                    && after_sheet_data
                    && insert_at.is_none()
                    && AFTER_MERGE_CELLS.contains(&local)
                {
                    insert_at = Some(before);
                }

                match local {
                    b"dimension" if depth == 1 => {
                        spans.dimension = Some((before, after));
                    },
                    b"sheetData" => {
                        spans.prefix = prefix_of(e);
                        sheet_data_start = before;
                        if empty {
                            spans.sheet_data = Some((before, after));
                            after_sheet_data = true;
                        }
                    },
                    b"row" => {
                        let parsed = parse_row_element(e, last_row + 1)?;
                        last_row = parsed.0;
                        last_col = 0;
                        if empty {
                            sheet.set_row(parsed.0, parsed.1);
                        } else {
                            row = Some(parsed);
                        }
                    },
                    b"c" => {
                        let pending = PendingCell::from_element(e, last_col + 1)?;
                        last_col = pending.col;
                        if empty {
                            finish_cell(&mut row, pending, shared, styles);
                        } else {
                            cell = Some(pending);
                        }
                    },
                    b"v" if cell.is_some() && !empty => slot = Some(TextSlot::Value),
                    b"f" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.formula = Some((attributes(e)?, String::new()));
                            if !empty {
                                slot = Some(TextSlot::Formula);
                            }
                        }
                    },
                    b"t" if cell.is_some() && !empty && !in_phonetic => {
                        slot = Some(TextSlot::Inline)
                    },
                    b"rPh" if !empty => {
                        in_phonetic = true;
                        slot = None;
                    },
                    b"mergeCells" => {
                        merge_cells_start = before;
                        if empty {
                            spans.merge_cells = Some((before, after));
                        }
                    },
                    b"mergeCell" => {
                        let attrs = attributes(e)?;
                        match attr(&attrs, "ref").and_then(parse_range) {
                            Some(region) => {
                                if let Err(err) = sheet.merge(region) {
                                    log::warn!("Ignoring merge in template: {}", err);
                                }
                            },
                            None => log::warn!("Ignoring malformed merge reference {:?}", attrs),
                        }
                    },
                    _ => {},
                }

                if !empty {
                    depth += 1;
                }
            },
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"sheetData" => {
                        spans.sheet_data = Some((sheet_data_start, after));
                        after_sheet_data = true;
                    },
                    b"row" => {
                        if let Some((index, finished)) = row.take() {
                            sheet.set_row(index, finished);
                        }
                    },
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            finish_cell(&mut row, pending, shared, styles);
                        }
                        slot = None;
                    },
                    b"v" | b"f" | b"t" => slot = None,
                    b"rPh" => in_phonetic = false,
                    b"mergeCells" => spans.merge_cells = Some((merge_cells_start, after)),
                    b"worksheet" => {
                        if insert_at.is_none() {
                            insert_at = Some(before);
                        }
                    },
                    _ => {},
                }
            },
            Event::Text(ref e) => {
                if let (Some(pending), Some(target)) = (cell.as_mut(), slot) {
                    pending.push_text(target, &e.unescape()?);
                }
            },
            Event::CData(e) => {
                if let (Some(pending), Some(target)) = (cell.as_mut(), slot) {
                    pending.push_text(target, &String::from_utf8_lossy(&e.into_inner()));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if spans.sheet_data.is_none() {
        return Err(Error::TemplateLoad("worksheet has no sheetData".to_string()));
    }
    spans.merge_cells_insert = insert_at.unwrap_or(xml.len());
    Ok((sheet, spans))
}

fn finish_cell(
    row: &mut Option<(u32, Row)>,
    pending: PendingCell,
    shared: &[String],
    styles: &StyleTable,
) {
    if let Some((_, row)) = row.as_mut() {
        let col = pending.col;
        let xf_id = pending.style;
        let mut cell = Cell::new(pending.into_value(shared), styles.style(xf_id));
        cell.xf_id = Some(xf_id);
        row.set_cell(col, cell);
    }
}

/// Remove empty elements named `local` whose attributes satisfy `matches`.
fn strip_empty_elements<F>(xml: &str, local: &[u8], matches: F) -> Result<String>
where
    F: Fn(&[(String, String)]) -> bool,
{
    let mut reader = Reader::from_str(xml);
    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    loop {
        let before = reader.buffer_position();
        match reader.read_event()? {
            Event::Empty(ref e) if e.local_name().as_ref() == local => {
                if matches(&attributes(e)?) {
                    out.push_str(&xml[cursor..before]);
                    cursor = reader.buffer_position();
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    out.push_str(&xml[cursor..]);
    Ok(out)
}
