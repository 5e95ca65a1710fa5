//! Analytics report bundle and chart/table shaping

use chrono::NaiveDate;
use serde::Serialize;

use crate::services::aggregator::{Aggregator, DEFAULT_MAX_MONTHS};
use crate::services::formatter::{round_to, status_label, Locale, StatusKind};
use crate::services::period::Period;
use crate::services::store::{Snapshot, SnapshotStore};
use crate::types::{
    IndustryAggregate, MonthlyTrendPoint, RegionAggregate, StatusDistribution,
    UnderwriterAggregate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub max_months: usize,
    pub locale: Locale,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_months: DEFAULT_MAX_MONTHS,
            locale: Locale::default(),
        }
    }
}

/// Everything the analytics screen shows, computed from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub period: Period,
    pub as_of: NaiveDate,
    /// Store version the report was built from (0 for a bare snapshot)
    pub snapshot_version: u64,
    pub client_count: u64,
    pub policy_count: u64,
    pub total_premium: f64,
    pub average_premium: f64,
    pub average_rate: f64,
    /// Active or pending share, in percent
    pub renewal_rate: f64,
    /// Month-over-month premium growth, in percent
    pub growth_rate: f64,
    /// Policies in the period without a creation date
    pub undated_policies: u64,
    pub industries: Vec<IndustryAggregate>,
    pub regions: Vec<RegionAggregate>,
    pub underwriters: Vec<UnderwriterAggregate>,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    pub client_statuses: StatusDistribution,
    pub policy_statuses: StatusDistribution,
}

impl AnalyticsReport {
    /// Build the report for `period` as of `now`.
    pub fn build(
        snapshot: &Snapshot,
        period: Period,
        now: NaiveDate,
        options: ReportOptions,
    ) -> Self {
        let clients = &snapshot.clients;
        let policies = period.filter(&snapshot.policies, now);

        let totals = Aggregator::totals(&policies);
        let monthly_trend =
            Aggregator::monthly_trend(&policies, options.max_months, options.locale);
        let growth_rate = Aggregator::growth_rate(&monthly_trend);

        Self {
            period,
            as_of: now,
            snapshot_version: 0,
            client_count: clients.len() as u64,
            policy_count: totals.policy_count,
            total_premium: totals.total_premium,
            average_premium: totals.average_premium(),
            average_rate: totals.average_rate(),
            renewal_rate: totals.renewal_rate(),
            growth_rate,
            undated_policies: Aggregator::undated_count(&policies),
            industries: Aggregator::by_industry(clients, &policies),
            regions: Aggregator::by_region(clients, &policies),
            underwriters: Aggregator::by_underwriter(&policies),
            monthly_trend,
            client_statuses: Aggregator::client_status_distribution(clients),
            policy_statuses: Aggregator::policy_status_distribution(&policies),
        }
    }

    /// Build from the store's current snapshot and remember its version.
    pub fn from_store(
        store: &SnapshotStore,
        period: Period,
        now: NaiveDate,
        options: ReportOptions,
    ) -> Self {
        let mut report = Self::build(store.snapshot(), period, now, options);
        report.snapshot_version = store.version();
        report
    }

    pub fn is_stale(&self, store: &SnapshotStore) -> bool {
        store.is_stale(self.snapshot_version)
    }
}

/// Display name for a bucket whose key may be missing
pub fn display_name(name: Option<&str>, locale: Locale) -> String {
    match name {
        Some(n) => n.to_string(),
        None => match locale {
            Locale::Ru => "Не указано".to_string(),
            Locale::En => "Not specified".to_string(),
        },
    }
}

/// Pie-chart slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub name: String,
    pub value: f64,
    /// Share of the total, in percent (1 decimal)
    pub percent: f64,
}

pub fn industry_shares(industries: &[IndustryAggregate], locale: Locale) -> Vec<ShareSlice> {
    let total: f64 = industries.iter().map(|i| i.value).sum();

    industries
        .iter()
        .map(|i| ShareSlice {
            name: display_name(i.name.as_deref(), locale),
            value: i.value,
            percent: if total > 0.0 {
                round_to(i.value / total * 100.0, 1)
            } else {
                0.0
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSlice {
    pub status: String,
    pub label: String,
    pub count: u64,
}

/// Status distribution ordered for display: most frequent first, then by label.
pub fn status_slices(
    distribution: &StatusDistribution,
    kind: StatusKind,
    locale: Locale,
) -> Vec<StatusSlice> {
    let mut slices: Vec<StatusSlice> = distribution
        .iter()
        .map(|(status, &count)| StatusSlice {
            status: status.clone(),
            label: status_label(kind, status, locale),
            count,
        })
        .collect();

    slices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    slices
}
