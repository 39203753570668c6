//! Row insertion and data placement on a template worksheet.
//!
//! Filling a template with more records than its data block holds requires
//! growing the block: trailing rows move down, new rows borrow the style of
//! the last data row and the signature block lands below them with its merges
//! intact. The steps run in a fixed order because later steps read snapshots
//! taken by earlier ones.

use crate::error::{Error, Result};
use crate::extractors::RowRecord;
use crate::template::layout::TemplateLayout;
use crate::template::model::{Alignment, Cell, CellValue, MergeRegion, Row, Worksheet};

/// Summary of one fill operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertionReport {
    /// Rows inserted below the data block
    pub rows_inserted: u32,
    /// Signature row after insertion
    pub signature_row: u32,
    /// Records written into the data block
    pub rows_written: usize,
    /// Merge and unmerge requests that were rejected and skipped
    pub warnings: Vec<String>,
}

/// Places records into a template's data block, growing it as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRowEngine {
    layout: TemplateLayout,
}

impl TemplateRowEngine {
    /// Create an engine for a layout.
    pub fn new(layout: TemplateLayout) -> Self {
        Self { layout }
    }

    /// The layout this engine fills.
    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    /// Write `records` into the data block of `sheet`.
    ///
    /// Only the item, description and quantity columns (1 to 3) of each data
    /// row are touched. Fails only when the layout does not fit the sheet;
    /// rejected merge operations are recorded as warnings.
    pub fn fill(&self, sheet: &mut Worksheet, records: &[RowRecord]) -> Result<InsertionReport> {
        let layout = &self.layout;
        layout.check_template(sheet)?;

        let mut report = InsertionReport {
            signature_row: layout.signature_row,
            ..InsertionReport::default()
        };

        let inserted = layout.rows_to_insert(records.len());
        let lowest = sheet
            .merges()
            .iter()
            .map(|m| m.bottom)
            .chain(sheet.last_row())
            .fold(layout.signature_row, u32::max);
        shifted(lowest, inserted)?;

        let merges = sheet.merges().to_vec();
        for region in &merges {
            if let Err(e) = sheet.unmerge(*region) {
                log::warn!("Could not unmerge {}: {}", region, e);
                report.warnings.push(e.to_string());
            }
        }

        if inserted > 0 {
            self.insert_rows(sheet, inserted)?;
            report.rows_inserted = inserted;
            report.signature_row = layout.signature_row + inserted;
            log::info!(
                "Inserted {} rows; signature moved from row {} to {}",
                inserted,
                layout.signature_row,
                report.signature_row
            );
        }

        self.restore_merges(sheet, &merges, inserted, &mut report);

        for (offset, record) in records.iter().enumerate() {
            let row = layout.data_start_row + offset as u32;
            write_record(sheet, row, record);
        }
        report.rows_written = records.len();
        log::debug!(
            "Wrote {} records starting at row {}",
            report.rows_written,
            layout.data_start_row
        );

        Ok(report)
    }

    /// Re-apply the merges snapshotted before insertion, moving those at or
    /// below the signature row by `inserted` rows.
    ///
    /// A merge the sheet rejects is logged, recorded in `report` and skipped.
    fn restore_merges(
        &self,
        sheet: &mut Worksheet,
        merges: &[MergeRegion],
        inserted: u32,
        report: &mut InsertionReport,
    ) {
        for region in merges {
            let target = if region.top >= self.layout.signature_row && inserted > 0 {
                region.shifted_down(inserted)
            } else {
                *region
            };
            if let Err(e) = sheet.merge(target) {
                log::warn!("Could not merge {}: {}", target, e);
                report.warnings.push(e.to_string());
            }
        }
    }

    fn insert_rows(&self, sheet: &mut Worksheet, count: u32) -> Result<()> {
        let layout = &self.layout;
        let signature = sheet.row(layout.signature_row).cloned();

        // Bottom-up, so every target slot has already been vacated.
        let trailing: Vec<u32> = sheet
            .rows()
            .map(|(index, _)| index)
            .filter(|index| *index > layout.data_end_row)
            .collect();
        for index in trailing.into_iter().rev() {
            let target = shifted(index, count)?;
            if let Some(row) = sheet.remove_row(index) {
                sheet.set_row(target, row);
            }
        }

        let style_row = sheet.row(layout.data_end_row).cloned().unwrap_or_default();
        for index in layout.data_end_row + 1..=shifted(layout.data_end_row, count)? {
            sheet.set_row(index, blank_styled_row(&style_row));
        }

        if let Some(signature) = signature {
            let target = sheet.row_mut(shifted(layout.signature_row, count)?);
            target.height = signature.height;
            target.custom_height = signature.custom_height;
            for (col, cell) in signature.cells() {
                target.set_cell(col, cell.clone());
            }
        }
        Ok(())
    }
}

/// Row index `index` moves to after `count` rows are inserted above it.
fn shifted(index: u32, count: u32) -> Result<u32> {
    index.checked_add(count).ok_or_else(|| {
        Error::InvalidLayout(format!("row {} cannot move down by {} rows", index, count))
    })
}

/// Copy of `template` with every value cleared and centered alignment.
fn blank_styled_row(template: &Row) -> Row {
    let mut row = Row::new();
    row.height = template.height;
    row.custom_height = template.custom_height;
    row.attrs = template.attrs.clone();
    for (col, cell) in template.cells() {
        let mut cell = cell.style_only();
        cell.style.alignment = Some(Alignment::centered_wrap());
        row.set_cell(col, cell);
    }
    row
}

fn write_record(sheet: &mut Worksheet, row: u32, record: &RowRecord) {
    let values = [record.product(), record.description(), record.quantity()];

    for (col, value) in (1u32..).zip(values) {
        // Only the anchor of a merged range accepts a value.
        if let Some(region) = sheet.merge_at(row, col) {
            if !is_anchor(region, row, col) {
                continue;
            }
        }
        let cell: &mut Cell = sheet.row_mut(row).cell_mut(col);
        cell.value = CellValue::text(value);
        cell.style.alignment = Some(Alignment::centered_wrap());
    }
}

fn is_anchor(region: &MergeRegion, row: u32, col: u32) -> bool {
    region.top == row && region.left == col
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DESCRIPTION_COLUMN, PRODUCT_COLUMN, QUANTITY_COLUMN};
    use crate::template::model::{CellStyle, HorizontalAlignment};

    fn record(product: &str, description: &str, qty: &str) -> RowRecord {
        RowRecord::from_pairs([
            (PRODUCT_COLUMN, product),
            (DESCRIPTION_COLUMN, description),
            (QUANTITY_COLUMN, qty),
        ])
    }

    fn records(count: usize) -> Vec<RowRecord> {
        (1..=count)
            .map(|i| record(&format!("ITEM-{}", i), &format!("Item {}", i), &i.to_string()))
            .collect()
    }

    fn bordered(border: u32) -> CellStyle {
        CellStyle {
            border,
            ..CellStyle::default()
        }
    }

    /// Data block 9..=23 with bordered cells in columns 1..=5, signature
    /// block at 24..=25 with a merge, and a footer at 27.
    fn template_sheet() -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_value(1, 1, CellValue::text("SHIP TICKET"));
        for row in 9..=23 {
            for col in 1..=5 {
                sheet.row_mut(row).set_cell(col, Cell::new(CellValue::Empty, bordered(1)));
            }
            sheet.set_value(row, 5, CellValue::text("note"));
        }
        sheet.row_mut(23).height = Some(22.5);
        sheet.set_value(24, 1, CellValue::text("Approved by"));
        sheet.row_mut(24).height = Some(30.0);
        sheet.row_mut(24).cell_mut(1).style = bordered(7);
        sheet.set_value(25, 1, CellValue::text("Signature"));
        sheet.set_value(27, 1, CellValue::text("Footer"));
        sheet.merge(MergeRegion::new(1, 1, 1, 5)).unwrap();
        sheet.merge(MergeRegion::new(24, 1, 25, 3)).unwrap();
        sheet
    }

    #[test]
    fn test_fill_within_capacity() {
        let mut sheet = template_sheet();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        let report = engine.fill(&mut sheet, &records(5)).unwrap();

        assert_eq!(report.rows_inserted, 0);
        assert_eq!(report.signature_row, 24);
        assert_eq!(report.rows_written, 5);
        assert!(report.warnings.is_empty());

        assert_eq!(sheet.value(9, 1).as_text(), Some("ITEM-1"));
        assert_eq!(sheet.value(13, 3).as_text(), Some("5"));
        assert!(sheet.value(14, 1).is_empty());
        assert_eq!(sheet.value(24, 1).as_text(), Some("Approved by"));
        assert_eq!(
            sheet.merges(),
            &[MergeRegion::new(1, 1, 1, 5), MergeRegion::new(24, 1, 25, 3)]
        );
    }

    #[test]
    fn test_fill_with_overflow() {
        let mut sheet = template_sheet();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        let report = engine.fill(&mut sheet, &records(20)).unwrap();

        assert_eq!(report.rows_inserted, 5);
        assert_eq!(report.signature_row, 29);

        assert_eq!(sheet.value(28, 1).as_text(), Some("ITEM-20"));
        assert_eq!(sheet.value(29, 1).as_text(), Some("Approved by"));
        assert_eq!(sheet.row(29).unwrap().height, Some(30.0));
        assert_eq!(sheet.cell(29, 1).unwrap().style.border, 7);
        assert_eq!(sheet.value(30, 1).as_text(), Some("Signature"));
        assert_eq!(sheet.value(32, 1).as_text(), Some("Footer"));
        assert!(sheet.value(27, 1).as_text() != Some("Footer"));

        assert!(sheet.merges().contains(&MergeRegion::new(1, 1, 1, 5)));
        assert!(sheet.merges().contains(&MergeRegion::new(29, 1, 30, 3)));
        assert!(!sheet.merges().contains(&MergeRegion::new(24, 1, 25, 3)));
    }

    #[test]
    fn test_new_rows_borrow_style_of_last_data_row() {
        let mut sheet = template_sheet();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        engine.fill(&mut sheet, &records(17)).unwrap();

        // Row 25 was inserted; column 5 is never written.
        let row = sheet.row(25).unwrap();
        assert_eq!(row.height, Some(22.5));
        let cell = row.cell(5).unwrap();
        assert!(cell.value.is_empty());
        assert_eq!(cell.style.border, 1);
        assert_eq!(cell.style.alignment, Some(Alignment::centered_wrap()));
    }

    #[test]
    fn test_only_first_three_columns_written() {
        let mut sheet = template_sheet();
        let before = sheet.cell(9, 5).cloned();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        engine.fill(&mut sheet, &records(3)).unwrap();

        assert_eq!(sheet.cell(9, 5).cloned(), before);
        assert_eq!(sheet.cell(9, 4).unwrap().style, bordered(1));
        let written = &sheet.cell(9, 2).unwrap().style;
        assert_eq!(written.border, 1);
        assert_eq!(
            written.alignment.as_ref().and_then(|a| a.horizontal),
            Some(HorizontalAlignment::Center)
        );
    }

    #[test]
    fn test_missing_field_written_empty() {
        let mut sheet = template_sheet();
        sheet.set_value(9, 2, CellValue::text("stale"));
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        engine
            .fill(&mut sheet, &[RowRecord::from_pairs([(PRODUCT_COLUMN, "ONLY")])])
            .unwrap();
        assert_eq!(sheet.value(9, 1).as_text(), Some("ONLY"));
        assert!(sheet.value(9, 2).is_empty());
    }

    #[test]
    fn test_merged_data_cell_skipped() {
        let mut sheet = template_sheet();
        sheet.merge(MergeRegion::new(9, 2, 9, 3)).unwrap();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        engine.fill(&mut sheet, &[record("A", "B", "7")]).unwrap();

        assert_eq!(sheet.value(9, 2).as_text(), Some("B"));
        assert!(sheet.value(9, 3).is_empty());
    }

    #[test]
    fn test_gap_merge_aborts_before_mutation() {
        let mut sheet = template_sheet();
        sheet.merge(MergeRegion::new(22, 1, 22, 2)).unwrap();
        let layout = TemplateLayout::new(9, 20, 24).unwrap();
        let snapshot = sheet.clone();
        let result = TemplateRowEngine::new(layout).fill(&mut sheet, &records(30));
        assert!(result.is_err());
        assert_eq!(sheet, snapshot);
    }

    #[test]
    fn test_data_block_merge_not_shifted() {
        let mut sheet = template_sheet();
        sheet.merge(MergeRegion::new(20, 4, 23, 4)).unwrap();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        let report = engine.fill(&mut sheet, &records(18)).unwrap();

        assert_eq!(report.rows_inserted, 3);
        assert!(report.warnings.is_empty());
        assert!(sheet.merges().contains(&MergeRegion::new(20, 4, 23, 4)));
        assert!(sheet.merges().contains(&MergeRegion::new(27, 1, 28, 3)));
        assert_eq!(sheet.merges().len(), 3);
    }

    #[test]
    fn test_rejected_merge_reported_and_skipped() {
        let mut sheet = template_sheet();
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        let merges = sheet.merges().to_vec();
        // A1:E1 stays merged, so restoring it collides with itself.
        sheet.unmerge(MergeRegion::new(24, 1, 25, 3)).unwrap();

        let mut report = InsertionReport::default();
        engine.restore_merges(&mut sheet, &merges, 5, &mut report);

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("A1:E1"));
        assert!(sheet.merges().contains(&MergeRegion::new(29, 1, 30, 3)));
        assert_eq!(sheet.merges().len(), 2);
    }

    #[test]
    fn test_shift_past_last_row_index_fails_untouched() {
        let mut sheet = template_sheet();
        sheet.set_value(u32::MAX - 2, 1, CellValue::text("far away"));
        let snapshot = sheet.clone();
        let engine = TemplateRowEngine::new(TemplateLayout::default());

        let result = engine.fill(&mut sheet, &records(20));
        assert!(matches!(result, Err(Error::InvalidLayout(_))));
        assert_eq!(sheet, snapshot);

        // Within capacity nothing moves, so the same sheet fills fine.
        assert!(engine.fill(&mut sheet, &records(3)).is_ok());
    }

    #[test]
    fn test_sparse_trailing_rows_shift() {
        let mut sheet = template_sheet();
        sheet.set_value(40, 2, CellValue::text("remark"));
        let engine = TemplateRowEngine::new(TemplateLayout::default());
        engine.fill(&mut sheet, &records(17)).unwrap();

        assert_eq!(sheet.value(42, 2).as_text(), Some("remark"));
        assert!(sheet.row(40).is_none());
        assert!(sheet.row(41).is_none());
    }
}
