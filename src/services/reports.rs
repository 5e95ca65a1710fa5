//! On-demand reports over a caller-chosen date window or the whole book
//!
//! The financial report covers policies created inside a `DateWindow`. The
//! portfolio analysis always covers the whole snapshot and breaks it down
//! either by industry or per client.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::Serialize;

use crate::services::aggregator::Aggregator;
use crate::services::formatter::round_to;
use crate::services::period::DateWindow;
use crate::services::store::Snapshot;
use crate::types::{BrokerstatError, ClientAggregate, IndustryAggregate, Policy, PolicyStatus};

/// Policies listed under a financial report
pub const FINANCIAL_SAMPLE: usize = 10;

/// Default number of rows in a per-client breakdown
pub const CLIENT_ROWS: usize = 10;

/// Premium created in one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPremium {
    pub year: i32,
    pub month: u32,
    /// `M/YYYY`, e.g. "6/2024"
    pub label: String,
    /// In thousands, not rounded
    pub premium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub window: DateWindow,
    pub policy_count: u64,
    pub total_premium: f64,
    /// Rounded to a whole amount; zero for an empty window
    pub average_premium: i64,
    /// Policies whose status is exactly `active`
    pub active_policies: u64,
    pub monthly: Vec<MonthlyPremium>,
    /// First policies of the window, in snapshot order
    pub policies: Vec<Policy>,
}

impl FinancialReport {
    pub fn build(snapshot: &Snapshot, window: DateWindow) -> Self {
        let policies = window.filter(&snapshot.policies);
        let totals = Aggregator::totals(&policies);

        let active_policies = policies
            .iter()
            .filter(|p| p.status == Some(PolicyStatus::Active))
            .count() as u64;

        Self {
            window,
            policy_count: totals.policy_count,
            total_premium: totals.total_premium,
            average_premium: round_to(totals.average_premium(), 0) as i64,
            active_policies,
            monthly: monthly_premium(&policies),
            policies: policies.into_iter().take(FINANCIAL_SAMPLE).collect(),
        }
    }
}

/// Premium per creation month, oldest first. Undated policies are skipped.
pub fn monthly_premium(policies: &[Policy]) -> Vec<MonthlyPremium> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for policy in policies {
        if let Some(date) = policy.creation_date {
            *months.entry((date.year(), date.month())).or_default() += policy.premium_or_zero();
        }
    }

    months
        .into_iter()
        .map(|((year, month), premium)| MonthlyPremium {
            year,
            month,
            label: format!("{}/{}", month, year),
            premium: premium / 1000.0,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioGrouping {
    #[default]
    Industry,
    Client,
}

impl FromStr for PortfolioGrouping {
    type Err = BrokerstatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "industry" => Ok(Self::Industry),
            "client" => Ok(Self::Client),
            other => Err(BrokerstatError::contract(format!(
                "unrecognized grouping '{}' (expected industry or client)",
                other
            ))),
        }
    }
}

impl fmt::Display for PortfolioGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Industry => "industry",
            Self::Client => "client",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "group_by", content = "rows", rename_all = "snake_case")]
pub enum PortfolioBreakdown {
    Industry(Vec<IndustryAggregate>),
    Client(Vec<ClientAggregate>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAnalysis {
    pub client_count: u64,
    pub policy_count: u64,
    pub total_insurance_amount: f64,
    /// Insured amount per policy, rounded; zero without policies
    pub average_insurance_amount: i64,
    pub breakdown: PortfolioBreakdown,
}

impl PortfolioAnalysis {
    /// `limit` caps the per-client rows; industry rows are never cut.
    pub fn build(snapshot: &Snapshot, grouping: PortfolioGrouping, limit: usize) -> Self {
        let clients = &snapshot.clients;
        let policies = &snapshot.policies;

        let total_insurance_amount: f64 = policies
            .iter()
            .map(|p| p.insurance_amount.unwrap_or(0.0))
            .sum();
        let average_insurance_amount = if policies.is_empty() {
            0
        } else {
            round_to(total_insurance_amount / policies.len() as f64, 0) as i64
        };

        let breakdown = match grouping {
            PortfolioGrouping::Industry => {
                PortfolioBreakdown::Industry(Aggregator::by_industry(clients, policies))
            }
            PortfolioGrouping::Client => {
                let mut rows = Aggregator::by_client(clients, policies);
                rows.truncate(limit);
                PortfolioBreakdown::Client(rows)
            }
        };

        Self {
            client_count: clients.len() as u64,
            policy_count: policies.len() as u64,
            total_insurance_amount,
            average_insurance_amount,
            breakdown,
        }
    }
}
