//! In-memory worksheet model.
//!
//! A worksheet is an arena of rows keyed by 1-based row index, each row an
//! arena of cells keyed by 1-based column index. Copying a row or a cell is a
//! value copy into another slot; nothing is shared between slots.

use std::collections::BTreeMap;
use std::fmt;

use crate::template::address::{cell_ref, column_letters};

/// A rectangular merged-cell span, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRegion {
    /// First row
    pub top: u32,
    /// First column
    pub left: u32,
    /// Last row
    pub bottom: u32,
    /// Last column
    pub right: u32,
}

impl MergeRegion {
    /// Create a region from its corner coordinates.
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Whether the coordinates describe a non-empty, 1-based rectangle.
    pub fn is_valid(&self) -> bool {
        self.top >= 1 && self.left >= 1 && self.top <= self.bottom && self.left <= self.right
    }

    /// A1 address of the top-left cell, which identifies the region.
    ///
    /// # Examples
    ///
    /// ```
    /// use ship_ticket::template::MergeRegion;
    ///
    /// assert_eq!(MergeRegion::new(24, 1, 25, 3).address(), "A24");
    /// ```
    pub fn address(&self) -> String {
        cell_ref(self.top, self.left)
    }

    /// A1 range reference such as `A24:C25`.
    pub fn range_ref(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letters(self.left),
            self.top,
            column_letters(self.right),
            self.bottom
        )
    }

    /// Whether the region covers the given cell.
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }

    /// Whether two regions share at least one cell.
    pub fn intersects(&self, other: &MergeRegion) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }

    /// The same region moved down by `rows`.
    pub fn shifted_down(&self, rows: u32) -> MergeRegion {
        MergeRegion::new(self.top + rows, self.left, self.bottom + rows, self.right)
    }
}

impl fmt::Display for MergeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.range_ref())
    }
}

/// A merge or unmerge request the current topology cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The coordinates do not describe a rectangle
    #[error("invalid merge range {0:?}")]
    InvalidRange(MergeRegion),

    /// The requested range overlaps an existing merge
    #[error("merge {requested} overlaps existing merge {existing}")]
    Overlaps {
        /// Range that was requested
        requested: MergeRegion,
        /// Existing merge it collides with
        existing: MergeRegion,
    },

    /// No merge with exactly these coordinates exists
    #[error("{0} is not a merged range")]
    NotMerged(MergeRegion),
}

/// A formula cell, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    /// Formula text without the leading `=`; empty for shared-formula children
    pub expr: String,
    /// Attributes of the formula element (`t`, `ref`, `si`, ...)
    pub attrs: Vec<(String, String)>,
    /// Cached result as stored in the file
    pub cached: Option<String>,
    /// Type tag of the cached result (`str`, `b`, `e`), if any
    pub cached_type: Option<String>,
}

/// The value held by a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No value
    #[default]
    Empty,
    /// Numeric value (dates included)
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Error literal such as `#N/A`
    Error(String),
    /// Formula with its cached result
    Formula(Formula),
}

impl CellValue {
    /// Text value, or [`CellValue::Empty`] for an empty string.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text)
        }
    }

    /// Whether the cell holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text content for string cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::text(text)
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::text(text)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    /// Type-dependent default
    General,
    /// Left
    Left,
    /// Center
    Center,
    /// Right
    Right,
    /// Repeat to fill
    Fill,
    /// Justify
    Justify,
    /// Center across selection
    CenterContinuous,
    /// Distributed
    Distributed,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    /// Top
    Top,
    /// Middle
    Middle,
    /// Bottom
    Bottom,
    /// Justify
    Justify,
    /// Distributed
    Distributed,
}

/// Cell alignment facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    /// Horizontal alignment
    pub horizontal: Option<HorizontalAlignment>,
    /// Vertical alignment
    pub vertical: Option<VerticalAlignment>,
    /// Wrap text inside the cell
    pub wrap_text: bool,
    /// Indent level
    pub indent: Option<u32>,
    /// Text rotation in degrees
    pub text_rotation: Option<u32>,
    /// Shrink text to fit
    pub shrink_to_fit: bool,
}

impl Alignment {
    /// Vertically and horizontally centered, wrapping.
    pub fn centered_wrap() -> Self {
        Self {
            horizontal: Some(HorizontalAlignment::Center),
            vertical: Some(VerticalAlignment::Middle),
            wrap_text: true,
            ..Self::default()
        }
    }
}

/// Cell protection facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Protection {
    /// Locked flag
    pub locked: Option<bool>,
    /// Hidden flag
    pub hidden: Option<bool>,
}

/// All style facets of a cell.
///
/// Font, fill, border and number format are references into the workbook's
/// shared style tables; copying them copies the reference, which is what a
/// facet copy means for a single workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellStyle {
    /// Number format id
    pub number_format: u32,
    /// Font id
    pub font: u32,
    /// Fill id
    pub fill: u32,
    /// Border id
    pub border: u32,
    /// Parent named style id
    pub parent: u32,
    /// Alignment
    pub alignment: Option<Alignment>,
    /// Protection
    pub protection: Option<Protection>,
}

/// A cell: value plus style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Value
    pub value: CellValue,
    /// Style facets
    pub style: CellStyle,
    /// Format record `style` was decoded from, for cells read from a file.
    ///
    /// The record is written back as long as `style` still matches it, so
    /// attributes the model does not decode survive a save.
    pub xf_id: Option<u32>,
}

impl Cell {
    /// Create a cell.
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self {
            value,
            style,
            xf_id: None,
        }
    }

    /// Copy of this cell's style with no value.
    pub fn style_only(&self) -> Cell {
        Cell {
            value: CellValue::Empty,
            style: self.style.clone(),
            xf_id: self.xf_id,
        }
    }
}

/// A worksheet row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Height in points
    pub height: Option<f64>,
    /// Whether `height` was set by hand rather than fitted to the content
    pub custom_height: bool,
    /// Other row attributes carried through unchanged (`s`, `hidden`, ...)
    pub attrs: Vec<(String, String)>,
    cells: BTreeMap<u32, Cell>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell at a 1-based column.
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get(&col)
    }

    /// Mutable cell at a 1-based column, created empty if absent.
    pub fn cell_mut(&mut self, col: u32) -> &mut Cell {
        self.cells.entry(col).or_default()
    }

    /// Store a cell, replacing any previous one.
    pub fn set_cell(&mut self, col: u32, cell: Cell) {
        self.cells.insert(col, cell);
    }

    /// Iterate cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, &Cell)> {
        self.cells.iter().map(|(col, cell)| (*col, cell))
    }

    /// Highest column holding a cell.
    pub fn last_column(&self) -> Option<u32> {
        self.cells.keys().next_back().copied()
    }

    /// Whether the row holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A worksheet: rows plus merge topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    /// Sheet name
    pub name: String,
    rows: BTreeMap<u32, Row>,
    merges: Vec<MergeRegion>,
}

impl Worksheet {
    /// Create an empty worksheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Row at a 1-based index.
    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(&index)
    }

    /// Mutable row at a 1-based index, created empty if absent.
    pub fn row_mut(&mut self, index: u32) -> &mut Row {
        self.rows.entry(index).or_default()
    }

    /// Store a row, replacing any previous one.
    pub fn set_row(&mut self, index: u32, row: Row) {
        self.rows.insert(index, row);
    }

    /// Remove and return a row.
    pub fn remove_row(&mut self, index: u32) -> Option<Row> {
        self.rows.remove(&index)
    }

    /// Iterate rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &Row)> {
        self.rows.iter().map(|(index, row)| (*index, row))
    }

    /// Highest row index present.
    pub fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// Highest column index present in any row.
    pub fn last_column(&self) -> Option<u32> {
        self.rows.values().filter_map(Row::last_column).max()
    }

    /// Cell at `(row, col)`.
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.row(row).and_then(|r| r.cell(col))
    }

    /// Value at `(row, col)`; empty when the cell does not exist.
    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cell(row, col).map_or(&EMPTY, |cell| &cell.value)
    }

    /// Set the value at `(row, col)`, keeping the cell's style.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        self.row_mut(row).cell_mut(col).value = value;
    }

    /// Current merge regions.
    pub fn merges(&self) -> &[MergeRegion] {
        &self.merges
    }

    /// Merge region covering a cell, if any.
    pub fn merge_at(&self, row: u32, col: u32) -> Option<&MergeRegion> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// Merge a range.
    ///
    /// Fails when the range is malformed or overlaps an existing merge.
    pub fn merge(&mut self, region: MergeRegion) -> Result<(), MergeError> {
        if !region.is_valid() {
            return Err(MergeError::InvalidRange(region));
        }
        if let Some(existing) = self.merges.iter().find(|m| m.intersects(&region)) {
            return Err(MergeError::Overlaps {
                requested: region,
                existing: *existing,
            });
        }
        self.merges.push(region);
        Ok(())
    }

    /// Remove a merge with exactly these coordinates.
    pub fn unmerge(&mut self, region: MergeRegion) -> Result<(), MergeError> {
        match self.merges.iter().position(|m| *m == region) {
            Some(pos) => {
                self.merges.remove(pos);
                Ok(())
            },
            None => Err(MergeError::NotMerged(region)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_refs() {
        let region = MergeRegion::new(24, 2, 25, 28);
        assert_eq!(region.address(), "B24");
        assert_eq!(region.range_ref(), "B24:AB25");
        assert_eq!(format!("{}", region), "B24:AB25");
    }

    #[test]
    fn test_region_intersects() {
        let a = MergeRegion::new(1, 1, 2, 2);
        assert!(a.intersects(&MergeRegion::new(2, 2, 3, 3)));
        assert!(!a.intersects(&MergeRegion::new(3, 1, 3, 2)));
    }

    #[test]
    fn test_merge_rejects_overlap() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.merge(MergeRegion::new(1, 1, 1, 3)).unwrap();
        let err = sheet.merge(MergeRegion::new(1, 3, 2, 4)).unwrap_err();
        assert!(matches!(err, MergeError::Overlaps { .. }));
        assert_eq!(sheet.merges().len(), 1);
    }

    #[test]
    fn test_merge_rejects_invalid() {
        let mut sheet = Worksheet::new("Sheet1");
        assert_eq!(
            sheet.merge(MergeRegion::new(3, 1, 2, 1)),
            Err(MergeError::InvalidRange(MergeRegion::new(3, 1, 2, 1)))
        );
        assert!(sheet.merge(MergeRegion::new(0, 1, 1, 1)).is_err());
    }

    #[test]
    fn test_unmerge_requires_exact_match() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.merge(MergeRegion::new(1, 1, 1, 3)).unwrap();
        assert!(sheet.unmerge(MergeRegion::new(1, 1, 1, 2)).is_err());
        assert!(sheet.unmerge(MergeRegion::new(1, 1, 1, 3)).is_ok());
        assert!(sheet.merges().is_empty());
    }

    #[test]
    fn test_set_value_keeps_style() {
        let mut sheet = Worksheet::new("Sheet1");
        let style = CellStyle {
            border: 3,
            ..CellStyle::default()
        };
        sheet.row_mut(9).set_cell(1, Cell::new(CellValue::Empty, style.clone()));
        sheet.set_value(9, 1, CellValue::text("WIDGET-1"));
        assert_eq!(sheet.cell(9, 1).unwrap().style, style);
        assert_eq!(sheet.value(9, 1).as_text(), Some("WIDGET-1"));
        assert!(sheet.value(100, 1).is_empty());
    }

    #[test]
    fn test_last_row_and_column() {
        let mut sheet = Worksheet::new("Sheet1");
        assert_eq!(sheet.last_row(), None);
        sheet.set_value(3, 5, CellValue::Number(1.0));
        sheet.set_value(7, 2, CellValue::Bool(true));
        assert_eq!(sheet.last_row(), Some(7));
        assert_eq!(sheet.last_column(), Some(5));
    }

    #[test]
    fn test_style_only_clears_value() {
        let mut cell = Cell::new(CellValue::text("x"), CellStyle { font: 2, ..Default::default() });
        cell.xf_id = Some(4);
        let copy = cell.style_only();
        assert!(copy.value.is_empty());
        assert_eq!(copy.style.font, 2);
        assert_eq!(copy.xf_id, Some(4));
    }
}
