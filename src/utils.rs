//! Shared utility functions for label-allocator
//!
//! Contains formatting helpers used by the plan summary and the CLI.

/// Tolerance for comparing minute totals built from float sums
pub const MINUTE_EPSILON: f64 = 1e-6;

/// Render minutes as hours and minutes, rounded to the nearest minute
///
/// # Examples
/// ```
/// use label_allocator::utils::format_minutes;
///
/// assert_eq!(format_minutes(90.0), "1h 30m");
/// assert_eq!(format_minutes(45.0), "45m");
/// assert_eq!(format_minutes(600.0), "10h 00m");
/// ```
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    let (hours, mins) = (total / 60, total % 60);
    if hours == 0 {
        format!("{}m", mins)
    } else {
        format!("{}h {:02}m", hours, mins)
    }
}

/// Render minutes as decimal hours with one fractional digit
#[inline]
pub fn format_hours(minutes: f64) -> String {
    format!("{:.1}", minutes / 60.0)
}
