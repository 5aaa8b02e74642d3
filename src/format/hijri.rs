//! Gregorian to Hijri conversion with the arithmetical (tabular) Islamic calendar.

use chrono::{Datelike, NaiveDate};
use std::fmt;

pub const MONTH_NAMES: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabiul Awal",
    "Rabiul Akhir",
    "Jumadil Awal",
    "Jumadil Akhir",
    "Rajab",
    "Sya'ban",
    "Ramadhan",
    "Syawal",
    "Dzulqa'dah",
    "Dzulhijjah",
];

/// Offset from chrono's day count (0001-01-01 = day 1) to the Julian Day Number.
const CE_TO_JDN: i64 = 1_721_425;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HijriDate {
    pub year: i64,
    /// 1..=12
    pub month: u32,
    pub day: u32,
}

impl HijriDate {
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month.clamp(1, 12) - 1) as usize]
    }
}

impl fmt::Display for HijriDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} H", self.day, self.month_name(), self.year)
    }
}

/// Civil-epoch tabular conversion on the Julian Day Number.
pub fn to_hijri(date: NaiveDate) -> HijriDate {
    let jd = i64::from(date.num_days_from_ce()) + CE_TO_JDN;
    let mut l = jd - 1_948_440 + 10_632;
    let n = (l - 1) / 10_631;
    l = l - 10_631 * n + 354;
    let j = ((10_985 - l) / 5_316) * ((50 * l) / 17_719) + (l / 5_670) * ((43 * l) / 15_238);
    l = l - ((30 - j) / 15) * ((17_719 * j) / 50) - (j / 16) * ((15_238 * j) / 43) + 29;
    let month = (24 * l) / 709;
    let day = l - (709 * month) / 24;
    let year = 30 * n + j - 30;
    HijriDate {
        year,
        month: month as u32,
        day: day as u32,
    }
}

/// `"15 Rajab 1446 H"`
pub fn format_hijri(date: NaiveDate) -> String {
    to_hijri(date).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn known_dates() {
        assert_eq!(
            to_hijri(ymd(2025, 1, 15)),
            HijriDate {
                year: 1446,
                month: 7,
                day: 15
            }
        );
        assert_eq!(
            to_hijri(ymd(2000, 1, 1)),
            HijriDate {
                year: 1420,
                month: 9,
                day: 24
            }
        );
    }

    #[test]
    fn rendered_with_indonesian_month_names() {
        assert_eq!(format_hijri(ymd(2025, 1, 15)), "15 Rajab 1446 H");
        assert_eq!(format_hijri(ymd(2000, 1, 1)), "24 Ramadhan 1420 H");
    }

    #[test]
    fn consecutive_days_advance_by_one() {
        let mut prev = to_hijri(ymd(2024, 12, 31));
        let mut date = ymd(2025, 1, 1);
        for _ in 0..400 {
            let cur = to_hijri(date);
            if cur.day == 1 {
                assert!(prev.day == 29 || prev.day == 30, "{:?} -> {:?}", prev, cur);
            } else {
                assert_eq!(cur.day, prev.day + 1);
                assert_eq!(cur.month, prev.month);
            }
            assert!((1..=12).contains(&cur.month));
            prev = cur;
            date = date.succ_opt().unwrap();
        }
    }
}
