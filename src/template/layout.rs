//! Destination template layout.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::template::model::Worksheet;

/// Default first data row
pub const DEFAULT_DATA_START_ROW: u32 = 9;
/// Default last data row
pub const DEFAULT_DATA_END_ROW: u32 = 23;
/// Default signature row
pub const DEFAULT_SIGNATURE_ROW: u32 = 24;

/// Row coordinates of the data block and signature block in a template.
///
/// All rows are 1-based and must satisfy
/// `data_start_row <= data_end_row < signature_row`.
///
/// # Examples
///
/// ```
/// use ship_ticket::template::TemplateLayout;
///
/// let layout = TemplateLayout::default();
/// assert_eq!(layout.capacity(), 15);
/// assert_eq!(layout.rows_to_insert(20), 5);
/// assert_eq!(layout.rows_to_insert(3), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    /// First row of the data block
    pub data_start_row: u32,
    /// Last row of the data block
    pub data_end_row: u32,
    /// First row of the signature block
    pub signature_row: u32,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            data_start_row: DEFAULT_DATA_START_ROW,
            data_end_row: DEFAULT_DATA_END_ROW,
            signature_row: DEFAULT_SIGNATURE_ROW,
        }
    }
}

impl TemplateLayout {
    /// Create a validated layout.
    pub fn new(data_start_row: u32, data_end_row: u32, signature_row: u32) -> Result<Self> {
        let layout = Self {
            data_start_row,
            data_end_row,
            signature_row,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check the row ordering.
    pub fn validate(&self) -> Result<()> {
        if self.data_start_row == 0 {
            return Err(Error::InvalidLayout("rows are 1-based; data_start_row is 0".to_string()));
        }
        if self.data_start_row > self.data_end_row {
            return Err(Error::InvalidLayout(format!(
                "data_start_row {} is after data_end_row {}",
                self.data_start_row, self.data_end_row
            )));
        }
        if self.data_end_row >= self.signature_row {
            return Err(Error::InvalidLayout(format!(
                "signature_row {} must follow data_end_row {}",
                self.signature_row, self.data_end_row
            )));
        }
        Ok(())
    }

    /// Number of data rows the template holds without insertion.
    pub fn capacity(&self) -> u32 {
        self.data_end_row - self.data_start_row + 1
    }

    /// Rows that must be inserted to place `count` records.
    pub fn rows_to_insert(&self, count: usize) -> u32 {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        count.saturating_sub(self.capacity())
    }

    /// Check the layout against a loaded worksheet.
    ///
    /// Fails when a merge region starts strictly between the data block and
    /// the signature row, since row insertion cannot place it.
    pub fn check_template(&self, sheet: &Worksheet) -> Result<()> {
        self.validate()?;
        if let Some(gap) = sheet
            .merges()
            .iter()
            .find(|m| m.top > self.data_end_row && m.top < self.signature_row)
        {
            return Err(Error::InvalidLayout(format!(
                "merge {} lies between data_end_row {} and signature_row {}",
                gap, self.data_end_row, self.signature_row
            )));
        }
        Ok(())
    }
}
