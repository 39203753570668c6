//! A1-style cell and range references.

use crate::template::model::MergeRegion;

/// Column letters for a 1-based column index (`1` → `A`, `28` → `AB`).
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1 reference for a 1-based `(row, col)`.
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// Parse an A1 reference into 1-based `(row, col)`.
///
/// Absolute markers (`$B$3`) are accepted.
///
/// # Examples
///
/// ```
/// use ship_ticket::template::address::parse_cell_ref;
///
/// assert_eq!(parse_cell_ref("AB12"), Some((12, 28)));
/// assert_eq!(parse_cell_ref("$C$3"), Some((3, 3)));
/// assert_eq!(parse_cell_ref("12"), None);
/// ```
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, col))
}

/// Parse a range reference (`A24:C25`, or a single cell) into a region.
pub fn parse_range(reference: &str) -> Option<MergeRegion> {
    let (start, end) = reference.split_once(':').unwrap_or((reference, reference));
    let (top, left) = parse_cell_ref(start)?;
    let (bottom, right) = parse_cell_ref(end)?;
    Some(MergeRegion::new(
        top.min(bottom),
        left.min(right),
        top.max(bottom),
        left.max(right),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_parse_cell_ref_lowercase() {
        assert_eq!(parse_cell_ref("c24"), Some((24, 3)));
    }

    #[test]
    fn test_parse_cell_ref_rejects_row_zero() {
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("A1B"), None);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("A24:C25"), Some(MergeRegion::new(24, 1, 25, 3)));
        assert_eq!(parse_range("B2"), Some(MergeRegion::new(2, 2, 2, 2)));
        assert_eq!(parse_range("C3:A1"), Some(MergeRegion::new(1, 1, 3, 3)));
        assert_eq!(parse_range("bogus"), None);
    }
}
