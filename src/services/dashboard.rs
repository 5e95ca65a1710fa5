//! Dashboard cards, premium dynamics and recent activity

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::services::formatter::{month_label, to_thousands, Locale};
use crate::services::period::Period;
use crate::services::store::Snapshot;
use crate::types::{ClientStatus, Policy, PolicyStatus, RecordId};

/// How many policies the "recent activity" list shows
pub const RECENT_POLICIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub active_policies: u64,
    pub total_insurance_amount: f64,
    pub active_clients: u64,
    /// Premium of policies created in the current calendar month
    pub month_premium: f64,
}

/// Gross and net premium for one month, in thousands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumDynamicsPoint {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub gross: i64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPolicy {
    pub id: RecordId,
    pub client_name: String,
    pub creation_date: Option<NaiveDate>,
    pub premium: Option<f64>,
    pub status: Option<PolicyStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub period: Period,
    pub stats: DashboardStats,
    pub dynamics: Vec<PremiumDynamicsPoint>,
    pub recent: Vec<RecentPolicy>,
}

impl DashboardSummary {
    /// Cards and recent activity use the whole snapshot; only the
    /// dynamics chart follows `period`.
    pub fn build(snapshot: &Snapshot, period: Period, now: NaiveDate, locale: Locale) -> Self {
        Self {
            as_of: now,
            period,
            stats: dashboard_stats(snapshot, now),
            dynamics: premium_dynamics(&period.filter(&snapshot.policies, now), locale),
            recent: recent_policies(snapshot, RECENT_POLICIES, locale),
        }
    }
}

pub fn dashboard_stats(snapshot: &Snapshot, now: NaiveDate) -> DashboardStats {
    let policies = &snapshot.policies;

    let active_policies = policies
        .iter()
        .filter(|p| p.status == Some(PolicyStatus::Active))
        .count() as u64;
    let total_insurance_amount = policies
        .iter()
        .map(|p| p.insurance_amount.unwrap_or(0.0))
        .sum();
    let active_clients = snapshot
        .clients
        .iter()
        .filter(|c| c.client_status == Some(ClientStatus::Active))
        .count() as u64;
    let month_premium = policies
        .iter()
        .filter(|p| {
            p.creation_date
                .is_some_and(|d| d.year() == now.year() && d.month() == now.month())
        })
        .map(Policy::premium_or_zero)
        .sum();

    DashboardStats {
        active_policies,
        total_insurance_amount,
        active_clients,
        month_premium,
    }
}

/// Gross/net premium per month, oldest first. Undated policies are skipped.
pub fn premium_dynamics(policies: &[Policy], locale: Locale) -> Vec<PremiumDynamicsPoint> {
    let mut months: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();

    for policy in policies {
        let Some(date) = policy.creation_date else {
            continue;
        };
        let slot = months.entry((date.year(), date.month())).or_default();
        slot.0 += policy.premium_or_zero();
        slot.1 += policy.net_premium.unwrap_or(0.0);
    }

    months
        .into_iter()
        .map(|((year, month), (gross, net))| PremiumDynamicsPoint {
            year,
            month,
            label: month_label(month, locale).to_string(),
            gross: to_thousands(gross),
            net: to_thousands(net),
        })
        .collect()
}

/// Newest policies first (undated last), with the owning client's name.
pub fn recent_policies(snapshot: &Snapshot, limit: usize, locale: Locale) -> Vec<RecentPolicy> {
    let mut policies: Vec<&Policy> = snapshot.policies.iter().collect();
    // Stable sort: same-day policies keep snapshot order
    policies.sort_by_key(|p| Reverse(p.creation_date));

    policies
        .into_iter()
        .take(limit)
        .map(|p| RecentPolicy {
            id: p.id,
            client_name: snapshot
                .client_name(p.client)
                .or(p.client_name.as_deref())
                .map(String::from)
                .unwrap_or_else(|| unknown_client(locale).to_string()),
            creation_date: p.creation_date,
            premium: p.premium,
            status: p.status.clone(),
        })
        .collect()
}

fn unknown_client(locale: Locale) -> &'static str {
    match locale {
        Locale::Ru => "Неизвестный клиент",
        Locale::En => "Unknown client",
    }
}
