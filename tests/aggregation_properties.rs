//! Property-based tests for the aggregation engine

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use proptest::prelude::*;

use brokerstat::services::aggregator::UNKNOWN_STATUS;
use brokerstat::services::{Aggregator, AnalyticsReport, Locale, Period, ReportOptions, Snapshot};
use brokerstat::types::{Client, ClientStatus, Policy, PolicyStatus};

const INDUSTRIES: [&str; 4] = ["IT", "Торговля", "Строительство", "Логистика"];
const REGIONS: [&str; 3] = ["Ташкент", "Самарканд", "Бухара"];
const UNDERWRITERS: [&str; 3] = ["Karimova", "Usmanov", "Petrova"];

// ========== strategies ==========

fn arb_label(pool: &'static [&'static str]) -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(pool).prop_map(String::from))
}

fn arb_client_status() -> impl Strategy<Value = Option<ClientStatus>> {
    prop::option::of(prop_oneof![
        Just(ClientStatus::New),
        Just(ClientStatus::Active),
        Just(ClientStatus::Vip),
        Just(ClientStatus::Inactive),
    ])
}

fn arb_policy_status() -> impl Strategy<Value = Option<PolicyStatus>> {
    prop::option::of(prop_oneof![
        Just(PolicyStatus::Active),
        Just(PolicyStatus::Pending),
        Just(PolicyStatus::Expired),
        Just(PolicyStatus::Other("draft".to_string())),
    ])
}

/// Dates spread over 2022-2024
fn arb_date() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((0i32..36, 1u32..=28).prop_map(|(m, d)| {
        NaiveDate::from_ymd_opt(2022 + m / 12, (m % 12) as u32 + 1, d).unwrap()
    }))
}

fn arb_clients() -> impl Strategy<Value = Vec<Client>> {
    prop::collection::vec(
        (arb_label(&INDUSTRIES), arb_label(&REGIONS), arb_client_status()),
        0..12,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (industry, region, client_status))| Client {
                id: i as u64 + 1,
                name: format!("Client {}", i + 1),
                industry,
                region,
                client_status,
                ..Default::default()
            })
            .collect()
    })
}

/// Client ids go past the client list so some policies are orphans.
/// Whole-number premiums keep float sums exact in any order.
fn arb_policies() -> impl Strategy<Value = Vec<Policy>> {
    prop::collection::vec(
        (
            prop::option::of(1u64..16),
            arb_date(),
            0u32..1_000_000,
            0u8..=50,
            arb_policy_status(),
            arb_label(&UNDERWRITERS),
        ),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (client, creation_date, premium, rate, status, underwriter))| Policy {
                id: i as u64 + 1,
                client,
                creation_date,
                premium: Some(premium as f64),
                rate: Some(rate as f64 / 10.0),
                status,
                underwriter,
                ..Default::default()
            })
            .collect()
    })
}

fn now() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

// ========== properties ==========

proptest! {
    #[test]
    fn prop_industry_conserves_premium_of_known_clients(
        clients in arb_clients(),
        policies in arb_policies(),
    ) {
        let ids: HashSet<u64> = clients.iter().map(|c| c.id).collect();
        let expected: f64 = policies
            .iter()
            .filter(|p| p.client.is_some_and(|id| ids.contains(&id)))
            .map(|p| p.premium_or_zero())
            .sum();
        let owned = policies
            .iter()
            .filter(|p| p.client.is_some_and(|id| ids.contains(&id)))
            .count() as u64;

        let industries = Aggregator::by_industry(&clients, &policies);

        let total: f64 = industries.iter().map(|i| i.value).sum();
        prop_assert!((total - expected).abs() < 1e-6);
        prop_assert_eq!(industries.iter().map(|i| i.policies).sum::<u64>(), owned);
        prop_assert_eq!(industries.iter().map(|i| i.clients).sum::<u64>(), clients.len() as u64);
    }

    #[test]
    fn prop_industries_sorted_and_unique(
        clients in arb_clients(),
        policies in arb_policies(),
    ) {
        let industries = Aggregator::by_industry(&clients, &policies);

        prop_assert!(industries.windows(2).all(|w| w[0].value >= w[1].value));
        let names: HashSet<Option<String>> = industries.iter().map(|i| i.name.clone()).collect();
        prop_assert_eq!(names.len(), industries.len());
    }

    #[test]
    fn prop_underwriters_cover_every_policy(policies in arb_policies()) {
        let underwriters = Aggregator::by_underwriter(&policies);

        prop_assert_eq!(
            underwriters.iter().map(|u| u.policies).sum::<u64>(),
            policies.len() as u64
        );
        for uw in &underwriters {
            prop_assert!(uw.average_rate >= 0.0 && uw.average_rate <= 5.0);
        }
    }

    #[test]
    fn prop_monthly_trend_chronological(
        policies in arb_policies(),
        max_months in 1usize..48,
    ) {
        let trend = Aggregator::monthly_trend(&policies, max_months, Locale::Ru);

        prop_assert!(trend.len() <= max_months);
        prop_assert!(trend.windows(2).all(|w| (w[0].year, w[0].month) < (w[1].year, w[1].month)));

        let dated = policies.iter().filter(|p| p.creation_date.is_some()).count() as u64;
        let counted: u64 = trend.iter().map(|p| p.policies).sum();
        prop_assert!(counted <= dated);
        if max_months >= 36 {
            prop_assert_eq!(counted, dated);
        }
        prop_assert!(Aggregator::growth_rate(&trend).is_finite());
    }

    #[test]
    fn prop_policy_status_distribution_complete(policies in arb_policies()) {
        let mut expected: BTreeMap<String, u64> = BTreeMap::new();
        for policy in &policies {
            let key = policy
                .status
                .as_ref()
                .map_or(UNKNOWN_STATUS.to_string(), |s| s.as_str().to_string());
            *expected.entry(key).or_default() += 1;
        }

        prop_assert_eq!(Aggregator::policy_status_distribution(&policies), expected);
    }

    #[test]
    fn prop_period_filter_keeps_exactly_the_window(
        policies in arb_policies(),
        period in prop_oneof![
            Just(Period::TwelveMonths),
            Just(Period::SixMonths),
            Just(Period::YearToDate),
        ],
    ) {
        let window = period.window(now()).unwrap();
        let filtered = period.filter(&policies, now());

        prop_assert!(filtered.len() <= policies.len());
        for policy in &filtered {
            prop_assert!(policy.creation_date.is_some_and(|d| window.contains(d)));
        }
        let expected: Vec<u64> = policies
            .iter()
            .filter(|p| p.creation_date.is_some_and(|d| window.contains(d)))
            .map(|p| p.id)
            .collect();
        let kept: Vec<u64> = filtered.iter().map(|p| p.id).collect();
        prop_assert_eq!(kept, expected);
        prop_assert_eq!(Period::All.filter(&policies, now()).len(), policies.len());
    }

    #[test]
    fn prop_report_is_idempotent(
        clients in arb_clients(),
        policies in arb_policies(),
    ) {
        let snapshot = Snapshot::new(clients, policies);
        let options = ReportOptions::default();
        let first = AnalyticsReport::build(&snapshot, Period::All, now(), options);
        let second = AnalyticsReport::build(&snapshot, Period::All, now(), options);

        prop_assert_eq!(first, second);
    }
}
