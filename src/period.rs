use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local};

use crate::error::{CashplanError, Result};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(CashplanError::InvalidPeriod(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        let today = Local::now();
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The previous month within the same year. January has none.
    pub fn predecessor(&self) -> Option<Self> {
        (self.month > 1).then(|| Self {
            year: self.year,
            month: self.month - 1,
        })
    }

    pub fn months_of_year(year: i32) -> Vec<Self> {
        (1..=12).map(|month| Self { year, month }).collect()
    }

    /// Short human label, e.g. `Mar 2025`.
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = CashplanError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CashplanError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

/// Parse an optional `--month` flag, falling back to the current month.
pub fn parse_month_opt(month: Option<&str>) -> Result<Period> {
    match month {
        Some(m) => m.parse(),
        None => Ok(Period::current()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let p: Period = "2025-03".parse().unwrap();
        assert_eq!(p.year(), 2025);
        assert_eq!(p.month(), 3);
        assert_eq!(p.to_string(), "2025-03");
        assert_eq!("2025-3".parse::<Period>().unwrap(), p);
    }

    #[test]
    fn test_rejects_garbage() {
        for raw in ["2025", "2025-13", "2025-00", "25-01", "abcd-01", "2025-1x", ""] {
            assert!(raw.parse::<Period>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_predecessor_stays_in_year() {
        let march: Period = "2025-03".parse().unwrap();
        assert_eq!(march.predecessor().unwrap().to_string(), "2025-02");
        let january: Period = "2025-01".parse().unwrap();
        assert!(january.predecessor().is_none());
    }

    #[test]
    fn test_ordering() {
        let a: Period = "2024-12".parse().unwrap();
        let b: Period = "2025-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_months_of_year_and_label() {
        let months = Period::months_of_year(2025);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label(), "Jan 2025");
        assert_eq!(months[11].label(), "Dec 2025");
    }
}
