//! Table header location.

use crate::config::ExtractionConfig;
use crate::geometry::TextFragment;
use crate::utils::safe_float_cmp;

/// Result of header location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMatch {
    /// Fragments on the header line, sorted by `x`
    pub items: Vec<TextFragment>,
    /// Baseline of the header line; `None` when no title was found
    pub y: Option<f32>,
}

impl HeaderMatch {
    /// Whether a usable header was found.
    pub fn is_found(&self) -> bool {
        self.y.is_some() && !self.items.is_empty()
    }
}

/// Find the header line of the line-item table.
///
/// The first fragment (in the given order) containing any configured column
/// title fixes the header baseline. Every fragment within the line tolerance
/// of that baseline belongs to the header, including titles that matched
/// nothing, which later become ad-hoc columns.
///
/// # Examples
///
/// ```
/// use ship_ticket::config::ExtractionConfig;
/// use ship_ticket::extractors::locate_header;
/// use ship_ticket::geometry::TextFragment;
///
/// let fragments = vec![
///     TextFragment::at("ACME Corp", 20.0, 700.0),
///     TextFragment::at("Description", 250.0, 520.0),
///     TextFragment::at("Product or service", 100.0, 521.0),
///     TextFragment::at("WIDGET-1", 105.0, 500.0),
/// ];
/// let header = locate_header(&fragments, &ExtractionConfig::default());
/// assert_eq!(header.y, Some(520.0));
/// assert_eq!(header.items[0].content, "Product or service");
/// ```
pub fn locate_header(fragments: &[TextFragment], config: &ExtractionConfig) -> HeaderMatch {
    let anchor = fragments.iter().find(|fragment| {
        config
            .target_columns
            .iter()
            .any(|title| fragment.content.contains(title.as_str()))
    });

    let Some(anchor) = anchor else {
        log::debug!("No header title found among {} fragments", fragments.len());
        return HeaderMatch::default();
    };

    let header_y = anchor.y;
    let mut items: Vec<TextFragment> = fragments
        .iter()
        .filter(|fragment| (fragment.y - header_y).abs() <= config.line_tolerance)
        .cloned()
        .collect();
    items.sort_by(|a, b| safe_float_cmp(a.x, b.x));

    log::debug!("Header at y={} with {} fragments", header_y, items.len());

    HeaderMatch {
        items,
        y: Some(header_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header() {
        let fragments = vec![TextFragment::at("Hello", 0.0, 10.0)];
        let header = locate_header(&fragments, &ExtractionConfig::default());
        assert_eq!(header.y, None);
        assert!(!header.is_found());
    }

    #[test]
    fn test_includes_unmatched_titles_on_header_line() {
        let fragments = vec![
            TextFragment::at("Qty", 400.0, 520.0),
            TextFragment::at("Unit", 450.0, 522.0),
            TextFragment::at("Rate", 500.0, 530.0), // outside tolerance
        ];
        let header = locate_header(&fragments, &ExtractionConfig::default());
        let names: Vec<_> = header.items.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(names, ["Qty", "Unit"]);
    }

    #[test]
    fn test_items_sorted_by_x() {
        let fragments = vec![
            TextFragment::at("Amount", 560.0, 520.0),
            TextFragment::at("#", 40.0, 520.0),
            TextFragment::at("Rate", 480.0, 520.0),
        ];
        let header = locate_header(&fragments, &ExtractionConfig::default());
        let xs: Vec<f32> = header.items.iter().map(|f| f.x).collect();
        assert_eq!(xs, [40.0, 480.0, 560.0]);
    }
}
