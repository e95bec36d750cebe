//! Phone-number shape helpers for Brazilian numbers. Mobile numbers carry a
//! 9-digit local part starting with `9`; landlines carry 8 digits and cannot
//! receive messages, so they are filtered out before any gateway call.

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Splits a raw number into (area code, local part), stripping an optional
/// `55` country prefix. Returns `None` when the shape is not a plausible
/// Brazilian number (10 or 11 national digits).
pub fn split_national(raw: &str) -> Option<(String, String)> {
    let digits = digits_only(raw);
    let national = if digits.len() >= 12 && digits.starts_with("55") {
        &digits[2..]
    } else {
        digits.as_str()
    };
    if !(10..=11).contains(&national.len()) {
        return None;
    }
    Some((national[..2].to_string(), national[2..].to_string()))
}

/// Landline heuristic: an 8-digit local part not beginning with `9`.
pub fn is_landline(raw: &str) -> bool {
    matches!(
        split_national(raw),
        Some((_, local)) if local.len() == 8 && !local.starts_with('9')
    )
}

/// Canonical wire form: country code plus area code plus local digits.
pub fn to_canonical(raw: &str) -> Option<String> {
    split_national(raw).map(|(area, local)| format!("55{area}{local}"))
}
