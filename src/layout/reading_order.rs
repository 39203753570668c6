//! Reading order for positioned text fragments.
//!
//! Fragments are ordered top-to-bottom, left-to-right. Two fragments whose
//! baselines differ by no more than the line tolerance count as one line and
//! are ordered by `x`; otherwise the visually higher one (larger `y`) comes
//! first.

use std::cmp::Ordering;

use crate::geometry::TextFragment;
use crate::utils::safe_float_cmp;

/// Compare two fragments in reading order.
pub fn reading_order_cmp(a: &TextFragment, b: &TextFragment, tolerance: f32) -> Ordering {
    if a.same_line(b, tolerance) {
        safe_float_cmp(a.x, b.x)
    } else {
        safe_float_cmp(b.y, a.y)
    }
}

/// Sort one page's fragments into reading order.
///
/// This is a single stable sort, so fragments that compare equal keep their
/// input order and sorting an already sorted page is a no-op.
///
/// # Arguments
///
/// * `fragments` - One page's fragments in arbitrary order
/// * `tolerance` - Maximum baseline distance for fragments on the same line
///
/// # Returns
///
/// A permutation of the input in reading order.
///
/// # Examples
///
/// ```
/// use ship_ticket::geometry::TextFragment;
/// use ship_ticket::layout::sort_fragments;
///
/// let page = vec![
///     TextFragment::at("Bottom", 0.0, 50.0),
///     TextFragment::at("Right", 100.0, 101.0),
///     TextFragment::at("Left", 0.0, 100.0),
/// ];
/// let ordered = sort_fragments(&page, 5.0);
/// let texts: Vec<_> = ordered.iter().map(|f| f.content.as_str()).collect();
/// assert_eq!(texts, ["Left", "Right", "Bottom"]);
/// ```
pub fn sort_fragments(fragments: &[TextFragment], tolerance: f32) -> Vec<TextFragment> {
    // The tolerance makes the comparison non-transitive (a~b, b~c, a<c), which
    // `slice::sort_by` is allowed to reject with a panic. A plain insertion
    // sort only ever compares neighbours and never moves equal elements.
    let mut ordered: Vec<TextFragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let mut pos = ordered.len();
        while pos > 0
            && reading_order_cmp(&ordered[pos - 1], fragment, tolerance) == Ordering::Greater
        {
            pos -= 1;
        }
        ordered.insert(pos, fragment.clone());
    }
    ordered
}
