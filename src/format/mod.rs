//! Display formats: rupiah amounts, Hijri dates, slugs and month names.

pub mod hijri;
pub mod money;
pub mod slug;

pub use hijri::{format_hijri, to_hijri, HijriDate};
pub use money::{as_float, rupiah};
pub use slug::slugify;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Gregorian month name for 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// `"January 2025"`
pub fn month_year(year: i32, month: u32) -> Option<String> {
    month_name(month).map(|name| format!("{} {}", name, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_names() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
        assert_eq!(month_year(2025, 3).as_deref(), Some("March 2025"));
    }
}
