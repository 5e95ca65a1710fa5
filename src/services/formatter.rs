//! Display formatting for amounts, dates and labels
//!
//! Everything here is pure and independent of the aggregator, so chart and
//! table code can format literal values directly.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BrokerstatError, Result};

const MONTH_LABELS_RU: [&str; 12] = [
    "Янв", "Фев", "Мар", "Апр", "Май", "Июн", "Июл", "Авг", "Сен", "Окт", "Ноя", "Дек",
];

const MONTH_LABELS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Display locale for labels and number grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    fn group_separator(self) -> char {
        match self {
            Self::Ru => '\u{a0}',
            Self::En => ',',
        }
    }

    fn decimal_separator(self) -> char {
        match self {
            Self::Ru => ',',
            Self::En => '.',
        }
    }
}

impl FromStr for Locale {
    type Err = BrokerstatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" | "ru_ru" => Ok(Self::Ru),
            "en" | "en-us" | "en_us" | "en-gb" => Ok(Self::En),
            other => Err(BrokerstatError::Config(format!(
                "unsupported locale '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ru => "ru",
            Self::En => "en",
        })
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Amount in thousands, rounded to the nearest integer.
pub fn to_thousands(value: f64) -> i64 {
    (value / 1000.0).round() as i64
}

/// Group the digits of a non-negative integer string.
fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3 * separator.len_utf8());

    // Digits are ASCII, so byte indexing is safe
    for (i, ch) in digits.bytes().enumerate() {
        if i > 0 && (len - i).is_multiple_of(3) {
            result.push(separator);
        }
        result.push(ch as char);
    }

    result
}

/// Fixed number of decimals with locale grouping.
fn format_fixed(value: f64, decimals: usize, locale: Locale) -> String {
    let fixed = format!("{:.*}", decimals, round_to(value.abs(), decimals as i32));
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, locale.group_separator()));
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator());
        out.push_str(frac);
    }
    out
}

/// Locale-grouped number with up to 3 fraction digits
/// (e.g., 1234567.5 -> "1,234,567.5" in en, "1 234 567,5" in ru)
pub fn format_number(value: f64, locale: Locale) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let full = format_fixed(value, 3, locale);
    let sep = locale.decimal_separator();
    match full.split_once(sep) {
        Some((int_part, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                int_part.to_string()
            } else {
                format!("{}{}{}", int_part, sep, frac)
            }
        }
        None => full,
    }
}

/// Abbreviated amount for cards and chart axes.
///
/// - `>= 1_000_000` -> `"1.5M"` (one decimal)
/// - `>= 1_000` -> `"3k"` (rounded thousands)
/// - otherwise the locale-grouped plain number; zero and non-finite values are `"0"`
///
/// # Examples
/// ```
/// use brokerstat::services::formatter::{format_currency_short, Locale};
///
/// assert_eq!(format_currency_short(1_500_000.0, Locale::En), "1.5M");
/// assert_eq!(format_currency_short(2_500.0, Locale::En), "3k");
/// assert_eq!(format_currency_short(0.0, Locale::En), "0");
/// ```
pub fn format_currency_short(value: f64, locale: Locale) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    if value >= 1_000_000.0 {
        return format!("{:.1}M", round_to(value / 1_000_000.0, 1));
    }
    if value >= 1_000.0 {
        return format!("{}k", to_thousands(value));
    }
    format_number(value, locale)
}

/// Short form followed by the currency code, e.g. `"12k UZS"`.
pub fn format_currency_short_with(value: f64, currency: &str, locale: Locale) -> String {
    format!("{} {}", format_currency_short(value, locale), currency)
}

/// Full amount with currency-specific precision and symbol.
/// Unknown currency codes are formatted like UZS.
pub fn format_currency(amount: f64, currency: &str, locale: Locale) -> String {
    if !amount.is_finite() {
        return "0".to_string();
    }
    let (decimals, symbol) = match currency {
        "USD" => (2, " $"),
        "EUR" => (2, " €"),
        _ => (0, " сум"),
    };
    format!("{}{}", format_fixed(amount, decimals, locale), symbol)
}

/// `DD.MM.YYYY`, or an em dash when the date is unknown.
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%d.%m.%Y").to_string(),
        None => "—".to_string(),
    }
}

/// 3-letter month abbreviation for a 1-based month.
pub fn month_label(month: u32, locale: Locale) -> &'static str {
    let labels = match locale {
        Locale::Ru => &MONTH_LABELS_RU,
        Locale::En => &MONTH_LABELS_EN,
    };
    month
        .checked_sub(1)
        .and_then(|i| labels.get(i as usize))
        .copied()
        .unwrap_or("?")
}

/// Which status vocabulary a label belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Client,
    Policy,
}

/// Human label for a raw status value; unknown values are returned as-is.
pub fn status_label(kind: StatusKind, status: &str, locale: Locale) -> String {
    let label = match (kind, locale, status) {
        (StatusKind::Client, Locale::Ru, "new") => "Новый",
        (StatusKind::Client, Locale::Ru, "active") => "Активный",
        (StatusKind::Client, Locale::Ru, "vip") => "VIP",
        (StatusKind::Client, Locale::Ru, "inactive") => "Неактивный",
        (StatusKind::Client, Locale::En, "new") => "New",
        (StatusKind::Client, Locale::En, "active") => "Active",
        (StatusKind::Client, Locale::En, "vip") => "VIP",
        (StatusKind::Client, Locale::En, "inactive") => "Inactive",
        (StatusKind::Policy, Locale::Ru, "active") => "Активен",
        (StatusKind::Policy, Locale::Ru, "pending") => "Ожидает",
        (StatusKind::Policy, Locale::Ru, "expired") => "Истек",
        (StatusKind::Policy, Locale::Ru, "draft") => "Черновик",
        (StatusKind::Policy, Locale::En, "active") => "Active",
        (StatusKind::Policy, Locale::En, "pending") => "Pending",
        (StatusKind::Policy, Locale::En, "expired") => "Expired",
        (StatusKind::Policy, Locale::En, "draft") => "Draft",
        _ => status,
    };
    label.to_string()
}
