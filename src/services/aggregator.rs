//! Aggregator service for computing portfolio statistics
//!
//! Client-centric views (industry, region) walk the clients and pick up each
//! client's policies, so a policy whose client is not in the snapshot lands
//! in no bucket. Policy-centric views (underwriter, monthly trend, status)
//! walk the policies directly and do count such policies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

use crate::services::formatter::{month_label, round_to, to_thousands, Locale};
use crate::types::{
    Client, ClientAggregate, IndustryAggregate, MonthlyTrendPoint, Policy, PortfolioTotals,
    RecordId, RegionAggregate, StatusDistribution, UnderwriterAggregate,
};

/// Default number of trailing months kept by `monthly_trend`
pub const DEFAULT_MAX_MONTHS: usize = 12;

/// Label used for records without a status
pub const UNKNOWN_STATUS: &str = "unknown";

/// Buckets that remember the order keys were first seen in
struct OrderedBuckets<K, V> {
    index: HashMap<K, usize>,
    items: Vec<(K, V)>,
}

impl<K: Clone + Eq + Hash, V: Default> OrderedBuckets<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }

    fn entry(&mut self, key: K) -> &mut V {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.items.push((key.clone(), V::default()));
                self.index.insert(key, self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[idx].1
    }

    fn into_items(self) -> Vec<(K, V)> {
        self.items
    }
}

/// Premium and policy count per client id
fn index_by_client(policies: &[Policy]) -> HashMap<RecordId, (f64, u64)> {
    let mut by_client: HashMap<RecordId, (f64, u64)> = HashMap::new();
    for policy in policies {
        if let Some(client_id) = policy.client {
            let slot = by_client.entry(client_id).or_default();
            slot.0 += policy.premium_or_zero();
            slot.1 = slot.1.saturating_add(1);
        }
    }
    by_client
}

#[derive(Default)]
struct IndustryAcc {
    value: f64,
    policies: u64,
    clients: u64,
}

#[derive(Default)]
struct UnderwriterAcc {
    policies: u64,
    premium: f64,
    rate: f64,
}

#[derive(Default)]
struct MonthAcc {
    premium: f64,
    policies: u64,
    clients: HashSet<Option<RecordId>>,
}

/// Aggregator for computing portfolio statistics
pub struct Aggregator;

impl Aggregator {
    /// Premium and rate sums plus the in-force count
    pub fn totals(policies: &[Policy]) -> PortfolioTotals {
        let mut totals = PortfolioTotals::default();

        for policy in policies {
            totals.total_premium += policy.premium_or_zero();
            totals.total_rate += policy.rate_or_zero();
            if policy.status.as_ref().is_some_and(|s| s.is_in_force()) {
                totals.in_force_count = totals.in_force_count.saturating_add(1);
            }
            totals.policy_count = totals.policy_count.saturating_add(1);
        }

        totals
    }

    /// Premium per client industry (sorted by premium descending)
    pub fn by_industry(clients: &[Client], policies: &[Policy]) -> Vec<IndustryAggregate> {
        let by_client = index_by_client(policies);
        let mut buckets: OrderedBuckets<Option<String>, IndustryAcc> = OrderedBuckets::new();

        for client in clients {
            let (premium, count) = by_client.get(&client.id).copied().unwrap_or_default();
            let acc = buckets.entry(client.industry.clone());
            acc.value += premium;
            acc.policies = acc.policies.saturating_add(count);
            acc.clients = acc.clients.saturating_add(1);
        }

        let mut result: Vec<IndustryAggregate> = buckets
            .into_items()
            .into_iter()
            .map(|(name, acc)| IndustryAggregate {
                name,
                value: acc.value,
                policies: acc.policies,
                clients: acc.clients,
            })
            .collect();

        // Stable: equal premiums keep first-seen order
        result.sort_by(|a, b| b.value.total_cmp(&a.value));
        result
    }

    /// Policies and premium per client, largest premium first.
    /// Clients without policies are listed with zeros.
    pub fn by_client(clients: &[Client], policies: &[Policy]) -> Vec<ClientAggregate> {
        let by_client = index_by_client(policies);

        let mut result: Vec<ClientAggregate> = clients
            .iter()
            .map(|client| {
                let (premium, count) = by_client.get(&client.id).copied().unwrap_or_default();
                ClientAggregate {
                    id: client.id,
                    name: client.name.clone(),
                    region: client.region.clone(),
                    policies: count,
                    premium,
                }
            })
            .collect();

        result.sort_by(|a, b| b.premium.total_cmp(&a.premium));
        result
    }

    /// Premium per client region in thousands (sorted descending)
    pub fn by_region(clients: &[Client], policies: &[Policy]) -> Vec<RegionAggregate> {
        let by_client = index_by_client(policies);
        let mut buckets: OrderedBuckets<Option<String>, f64> = OrderedBuckets::new();

        for client in clients {
            let (premium, _) = by_client.get(&client.id).copied().unwrap_or_default();
            *buckets.entry(client.region.clone()) += premium;
        }

        let mut result: Vec<RegionAggregate> = buckets
            .into_items()
            .into_iter()
            .map(|(name, premium)| RegionAggregate {
                name,
                premium: to_thousands(premium),
            })
            .collect();

        result.sort_by(|a, b| b.premium.cmp(&a.premium));
        result
    }

    /// Per-underwriter performance (sorted by total premium descending).
    /// Missing and empty underwriters share the `None` bucket.
    pub fn by_underwriter(policies: &[Policy]) -> Vec<UnderwriterAggregate> {
        let mut buckets: OrderedBuckets<Option<String>, UnderwriterAcc> = OrderedBuckets::new();

        for policy in policies {
            let key = policy.underwriter.clone().filter(|u| !u.is_empty());
            let acc = buckets.entry(key);
            acc.policies = acc.policies.saturating_add(1);
            acc.premium += policy.premium_or_zero();
            acc.rate += policy.rate_or_zero();
        }

        let mut result: Vec<UnderwriterAggregate> = buckets
            .into_items()
            .into_iter()
            .map(|(name, acc)| {
                // Buckets only exist once a policy was counted
                let count = acc.policies.max(1) as f64;
                UnderwriterAggregate {
                    name,
                    policies: acc.policies,
                    total_premium: acc.premium,
                    average_premium: (acc.premium / count).round() as i64,
                    average_rate: round_to(acc.rate / count, 2),
                }
            })
            .collect();

        result.sort_by(|a, b| b.total_premium.total_cmp(&a.total_premium));
        result
    }

    /// Premium per calendar month, oldest first, limited to the last
    /// `max_months` months that have policies. Undated policies are skipped.
    pub fn monthly_trend(
        policies: &[Policy],
        max_months: usize,
        locale: Locale,
    ) -> Vec<MonthlyTrendPoint> {
        use chrono::Datelike;

        // (year, month) keys sort chronologically; labels never do
        let mut months: BTreeMap<(i32, u32), MonthAcc> = BTreeMap::new();

        for policy in policies {
            let Some(date) = policy.creation_date else {
                continue;
            };
            let acc = months.entry((date.year(), date.month())).or_default();
            acc.premium += policy.premium_or_zero();
            acc.policies = acc.policies.saturating_add(1);
            acc.clients.insert(policy.client);
        }

        let skip = months.len().saturating_sub(max_months);
        months
            .into_iter()
            .skip(skip)
            .map(|((year, month), acc)| MonthlyTrendPoint {
                year,
                month,
                label: month_label(month, locale).to_string(),
                premium: to_thousands(acc.premium),
                policies: acc.policies,
                clients: acc.clients.len() as u64,
            })
            .collect()
    }

    /// Month-over-month premium growth in percent (1 decimal) between the
    /// last two trend points; 0 when there is no usable previous month.
    pub fn growth_rate(trend: &[MonthlyTrendPoint]) -> f64 {
        let [.., previous, current] = trend else {
            return 0.0;
        };
        if previous.premium <= 0 {
            return 0.0;
        }
        let previous = previous.premium as f64;
        let current = current.premium as f64;
        round_to((current - previous) / previous * 100.0, 1)
    }

    /// Count records per status; absent or empty status counts as `default_label`.
    pub fn status_distribution<T, F>(
        records: &[T],
        status_of: F,
        default_label: &str,
    ) -> StatusDistribution
    where
        F: Fn(&T) -> Option<&str>,
    {
        let mut distribution = StatusDistribution::new();

        for record in records {
            let label = status_of(record)
                .filter(|s| !s.is_empty())
                .unwrap_or(default_label);
            let count = distribution.entry(label.to_string()).or_insert(0);
            *count = count.saturating_add(1);
        }

        distribution
    }

    pub fn client_status_distribution(clients: &[Client]) -> StatusDistribution {
        Self::status_distribution(
            clients,
            |c| c.client_status.as_ref().map(|s| s.as_str()),
            UNKNOWN_STATUS,
        )
    }

    pub fn policy_status_distribution(policies: &[Policy]) -> StatusDistribution {
        Self::status_distribution(
            policies,
            |p| p.status.as_ref().map(|s| s.as_str()),
            UNKNOWN_STATUS,
        )
    }

    /// Policies that cannot be placed on the monthly trend
    pub fn undated_count(policies: &[Policy]) -> u64 {
        policies.iter().filter(|p| p.creation_date.is_none()).count() as u64
    }
}
