//! Line assembly from ordered fragments.

use crate::geometry::TextFragment;

/// A logical line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Fragment texts joined by single spaces
    pub text: String,
    /// Baseline anchor (y of the line's first fragment)
    pub y: f32,
    /// The line's fragments with trimmed content, in reading order
    pub fragments: Vec<TextFragment>,
}

impl TextLine {
    fn start(fragment: TextFragment) -> Self {
        Self {
            text: String::new(),
            y: fragment.y,
            fragments: vec![fragment],
        }
    }

    fn close(mut self) -> Self {
        self.text = self
            .fragments
            .iter()
            .map(|f| f.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self
    }
}

/// Group reading-ordered fragments into lines.
///
/// A fragment opens a new line when its baseline is more than `tolerance`
/// away from the current line's anchor. Fragment content is trimmed and
/// blank fragments are dropped.
///
/// # Examples
///
/// ```
/// use ship_ticket::geometry::TextFragment;
/// use ship_ticket::layout::assemble_lines;
///
/// let ordered = vec![
///     TextFragment::at("Estimate", 10.0, 700.0),
///     TextFragment::at("no. 1042", 60.0, 701.0),
///     TextFragment::at("Bill to", 10.0, 680.0),
/// ];
/// let lines = assemble_lines(&ordered, 5.0);
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[0].text, "Estimate no. 1042");
/// ```
pub fn assemble_lines(ordered: &[TextFragment], tolerance: f32) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut current: Option<TextLine> = None;

    for fragment in ordered {
        let content = fragment.content.trim();
        if content.is_empty() {
            continue;
        }
        let fragment = TextFragment {
            content: content.to_string(),
            ..fragment.clone()
        };

        match current.as_mut() {
            Some(line) if (fragment.y - line.y).abs() <= tolerance => {
                line.fragments.push(fragment);
            },
            _ => {
                if let Some(line) = current.replace(TextLine::start(fragment)) {
                    lines.push(line.close());
                }
            },
        }
    }

    if let Some(line) = current {
        lines.push(line.close());
    }

    lines
}
