//! Reporting period selector (`all`, `12m`, `6m`, `ytd`)
//!
//! `now` is always passed in by the caller; nothing here reads the clock.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{BrokerstatError, Policy, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "all")]
    All,
    #[default]
    #[serde(rename = "12m")]
    TwelveMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "ytd")]
    YearToDate,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Caller-chosen range; `start` after `end` is rejected.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(BrokerstatError::contract(format!(
                "window starts after it ends ({} > {})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Policies created inside the window; undated policies never are.
    pub fn filter(&self, policies: &[Policy]) -> Vec<Policy> {
        policies
            .iter()
            .filter(|p| p.creation_date.is_some_and(|d| self.contains(d)))
            .cloned()
            .collect()
    }
}

impl Period {
    pub fn key(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::TwelveMonths => "12m",
            Self::SixMonths => "6m",
            Self::YearToDate => "ytd",
        }
    }

    /// Window ending at `now`; `None` for `all`.
    pub fn window(self, now: NaiveDate) -> Option<DateWindow> {
        let start = match self {
            Self::All => return None,
            Self::TwelveMonths => first_of_month_back(now, 11),
            Self::SixMonths => first_of_month_back(now, 5),
            Self::YearToDate => NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap_or(NaiveDate::MIN),
        };
        Some(DateWindow { start, end: now })
    }

    /// Policies created inside the window. Undated policies only survive `all`.
    pub fn filter(self, policies: &[Policy], now: NaiveDate) -> Vec<Policy> {
        match self.window(now) {
            None => policies.to_vec(),
            Some(window) => window.filter(policies),
        }
    }
}

/// First day of the month `months` before `now`'s month.
fn first_of_month_back(now: NaiveDate, months: i32) -> NaiveDate {
    let index = now.year() * 12 + now.month0() as i32 - months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

impl FromStr for Period {
    type Err = BrokerstatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "12m" => Ok(Self::TwelveMonths),
            "6m" => Ok(Self::SixMonths),
            "ytd" => Ok(Self::YearToDate),
            other => Err(BrokerstatError::contract(format!(
                "unrecognized period key '{}' (expected all, 12m, 6m or ytd)",
                other
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
