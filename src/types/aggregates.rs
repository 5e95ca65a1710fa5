//! Derived aggregates produced by the aggregator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio-wide sums over a set of policies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PortfolioTotals {
    pub total_premium: f64,
    pub total_rate: f64,
    /// Policies whose status is active or pending
    pub in_force_count: u64,
    pub policy_count: u64,
}

impl PortfolioTotals {
    pub fn average_premium(&self) -> f64 {
        if self.policy_count == 0 {
            return 0.0;
        }
        self.total_premium / self.policy_count as f64
    }

    pub fn average_rate(&self) -> f64 {
        if self.policy_count == 0 {
            return 0.0;
        }
        self.total_rate / self.policy_count as f64
    }

    /// Share of in-force policies, in percent
    pub fn renewal_rate(&self) -> f64 {
        if self.policy_count == 0 {
            return 0.0;
        }
        self.in_force_count as f64 / self.policy_count as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustryAggregate {
    /// `None` collects clients without an industry
    pub name: Option<String>,
    /// Summed premium of the industry's clients
    pub value: f64,
    pub policies: u64,
    pub clients: u64,
}

/// One client's policies and premium
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientAggregate {
    pub id: u64,
    pub name: String,
    pub region: Option<String>,
    pub policies: u64,
    pub premium: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionAggregate {
    pub name: Option<String>,
    /// Summed premium in thousands, rounded
    pub premium: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnderwriterAggregate {
    /// `None` is the "not specified" bucket (missing or empty underwriter)
    pub name: Option<String>,
    pub policies: u64,
    pub total_premium: f64,
    pub average_premium: i64,
    /// Rounded to 2 decimals
    pub average_rate: f64,
}

impl UnderwriterAggregate {
    /// Average rate with exactly two decimals, e.g. "2.00"
    pub fn average_rate_fixed(&self) -> String {
        format!("{:.2}", self.average_rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTrendPoint {
    pub year: i32,
    /// 1-based calendar month
    pub month: u32,
    /// Localized 3-letter abbreviation; display only, never a sort key
    pub label: String,
    /// Summed premium in thousands, rounded
    pub premium: i64,
    pub policies: u64,
    /// Distinct client ids referenced in the month
    pub clients: u64,
}

/// Status label -> occurrence count, keyed in label order
pub type StatusDistribution = BTreeMap<String, u64>;
