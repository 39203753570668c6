//! Column mapping from header fragments.

use crate::config::ExtractionConfig;
use crate::geometry::TextFragment;
use crate::utils::safe_float_cmp;

/// Schema position given to header fragments that match no configured title.
pub const UNMATCHED_COLUMN_INDEX: usize = 999;

/// A named column owning the half-open x-interval `[start_x, end_x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Canonical title, or the header text for ad-hoc columns
    pub name: String,
    /// Inclusive left edge
    pub start_x: f32,
    /// Exclusive right edge; `None` for the last column
    pub end_x: Option<f32>,
    /// Position in the canonical schema
    pub expected_index: usize,
}

impl Column {
    /// Whether `x` falls inside this column.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.start_x && self.end_x.map_or(true, |end| x < end)
    }

    /// Whether the column was matched to a configured title.
    pub fn is_canonical(&self) -> bool {
        self.expected_index != UNMATCHED_COLUMN_INDEX
    }
}

/// Pick the configured title contained in `text`, preferring the longest.
///
/// Longest-wins resolves titles that are substrings of one another, such as
/// `"#"` inside a header fragment like `"Product or service #"`.
pub fn best_title<'a>(text: &str, titles: &'a [String]) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    for title in titles {
        if text.contains(title.as_str()) && best.map_or(true, |b| title.len() > b.len()) {
            best = Some(title.as_str());
        }
    }
    best
}

/// Convert header fragments into columns ordered by schema position.
///
/// Column boundaries come from the fragments sorted by `x`: each column
/// starts `column_padding` left of its fragment and ends where the next one
/// starts. The returned list is then reordered by `expected_index`, since
/// header titles are not guaranteed to appear in schema order on the page.
///
/// # Examples
///
/// ```
/// use ship_ticket::config::ExtractionConfig;
/// use ship_ticket::extractors::map_columns;
/// use ship_ticket::geometry::TextFragment;
///
/// let header = vec![
///     TextFragment::at("Qty", 400.0, 520.0),
///     TextFragment::at("Product or service", 100.0, 520.0),
/// ];
/// let columns = map_columns(&header, &ExtractionConfig::default());
/// assert_eq!(columns[0].name, "Product or service");
/// assert_eq!(columns[0].start_x, 95.0);
/// assert_eq!(columns[0].end_x, Some(395.0));
/// assert_eq!(columns[1].end_x, None);
/// ```
pub fn map_columns(header_items: &[TextFragment], config: &ExtractionConfig) -> Vec<Column> {
    let mut by_x: Vec<&TextFragment> = header_items.iter().collect();
    by_x.sort_by(|a, b| safe_float_cmp(a.x, b.x));

    let padding = config.column_padding;
    let mut columns: Vec<Column> = by_x
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let end_x = by_x.get(i + 1).map(|next| next.x - padding);
            let (name, expected_index) =
                match best_title(&fragment.content, &config.target_columns) {
                    Some(title) => (
                        title.to_string(),
                        config.column_index(title).unwrap_or(UNMATCHED_COLUMN_INDEX),
                    ),
                    None => (fragment.content.clone(), UNMATCHED_COLUMN_INDEX),
                };
            Column {
                name,
                start_x: fragment.x - padding,
                end_x,
                expected_index,
            }
        })
        .collect();

    // Stable: ad-hoc columns keep their left-to-right order at the end.
    columns.sort_by_key(|c| c.expected_index);
    columns
}
