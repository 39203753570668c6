//! Estimate number and date extraction.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// `Estimate no. 1042`, `Estimate No: 1042`
    static ref RE_ESTIMATE_NO: Regex = Regex::new(r"(?i)Estimate\s+no\.?\s*:?\s*(\d+)").unwrap();

    /// `Estimate date 03/14/2025`
    static ref RE_ESTIMATE_DATE: Regex =
        Regex::new(r"(?i)Estimate\s+date\s*:?\s*(\d{1,2}/\d{1,2}/\d{2,4})").unwrap();
}

/// Document-level fields found in the assembled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateInfo {
    /// Estimate (document) number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_no: Option<String>,
    /// Estimate date as printed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_date: Option<String>,
}

impl EstimateInfo {
    /// Whether neither field was found.
    pub fn is_empty(&self) -> bool {
        self.estimate_no.is_none() && self.estimate_date.is_none()
    }
}

/// Extract the estimate number and date. Absent fields stay `None`.
///
/// # Examples
///
/// ```
/// use ship_ticket::extractors::extract_estimate_info;
///
/// let info = extract_estimate_info("Estimate no. 1042\nEstimate date 3/14/2025");
/// assert_eq!(info.estimate_no.as_deref(), Some("1042"));
/// assert_eq!(info.estimate_date.as_deref(), Some("3/14/2025"));
/// ```
pub fn extract_estimate_info(text: &str) -> EstimateInfo {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    };

    EstimateInfo {
        estimate_no: capture(&RE_ESTIMATE_NO),
        estimate_date: capture(&RE_ESTIMATE_DATE),
    }
}
