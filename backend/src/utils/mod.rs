//! # Utilities Module
//!
//! This module contains helper functions and utilities used
//! across the backend service.

/// Format a whole-rupee amount for display.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(format_pkr(33_500), "Rs 33,500");
/// assert_eq!(format_pkr(950), "Rs 950");
/// ```
pub fn format_pkr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();

    // Add commas
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let grouped: String = result.chars().rev().collect();

    if amount < 0 {
        format!("-Rs {}", grouped)
    } else {
        format!("Rs {}", grouped)
    }
}

/// Shorten text to at most `max_chars` characters, ending in "..." when cut.
///
/// Counts characters rather than bytes so Urdu text is never split
/// mid-codepoint.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = s.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}

/// Mask all but the last four characters, for logging account numbers.
pub fn mask_tail(s: &str) -> String {
    let count = s.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let visible: String = s.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), visible)
}
