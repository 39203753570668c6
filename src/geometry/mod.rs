//! Positioned text primitives.
//!
//! Coordinates follow the PDF convention: the origin is the bottom-left corner
//! of the page and `y` grows upward, so a larger `y` is visually higher.

use serde::{Deserialize, Serialize};

/// One positioned run of text reported by a document text layer.
///
/// A fragment is not necessarily a whole word; readers may split or join runs
/// arbitrarily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Text content
    pub content: String,
    /// X coordinate of the run origin
    pub x: f32,
    /// Y coordinate of the run origin (baseline, grows upward)
    pub y: f32,
    /// Advance width of the run
    #[serde(default)]
    pub width: f32,
    /// Height of the run
    #[serde(default)]
    pub height: f32,
}

impl TextFragment {
    /// Create a fragment.
    ///
    /// # Examples
    ///
    /// ```
    /// use ship_ticket::geometry::TextFragment;
    ///
    /// let fragment = TextFragment::new("Qty", 400.0, 520.0, 18.0, 9.0);
    /// assert_eq!(fragment.content, "Qty");
    /// assert_eq!(fragment.x, 400.0);
    /// ```
    pub fn new(content: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            content: content.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Create a fragment with zero extent, as most readers only report origins.
    pub fn at(content: impl Into<String>, x: f32, y: f32) -> Self {
        Self::new(content, x, y, 0.0, 0.0)
    }

    /// Whether two fragments sit on the same visual line.
    ///
    /// # Examples
    ///
    /// ```
    /// use ship_ticket::geometry::TextFragment;
    ///
    /// let a = TextFragment::at("A", 0.0, 100.0);
    /// let b = TextFragment::at("B", 50.0, 104.0);
    /// assert!(a.same_line(&b, 5.0));
    /// assert!(!a.same_line(&b, 3.0));
    /// ```
    pub fn same_line(&self, other: &TextFragment, tolerance: f32) -> bool {
        (self.y - other.y).abs() <= tolerance
    }

    /// Whether the fragment carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_line_is_inclusive() {
        let a = TextFragment::at("A", 0.0, 100.0);
        let b = TextFragment::at("B", 0.0, 105.0);
        assert!(a.same_line(&b, 5.0));
        assert!(b.same_line(&a, 5.0));
    }

    #[test]
    fn test_blank() {
        assert!(TextFragment::at("   ", 0.0, 0.0).is_blank());
        assert!(!TextFragment::at(" x ", 0.0, 0.0).is_blank());
    }

    #[test]
    fn test_deserialize_without_extent() {
        let fragment: TextFragment =
            serde_json::from_str(r#"{"content": "12", "x": 405, "y": 300}"#).unwrap();
        assert_eq!(fragment.x, 405.0);
        assert_eq!(fragment.width, 0.0);
    }
}
