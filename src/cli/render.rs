//! Plain-text rendering of reports for the terminal

use brokerstat::services::analytics::{display_name, industry_shares, status_slices};
use brokerstat::services::formatter::{
    format_currency, format_currency_short, format_date, format_number, status_label, Locale,
    StatusKind,
};
use brokerstat::services::reports::PortfolioBreakdown;
use brokerstat::services::{
    AnalyticsReport, DashboardSummary, FinancialReport, PortfolioAnalysis, Snapshot,
};
use brokerstat::types::{Client, Policy, StatusDistribution};

fn tr(locale: Locale, ru: &'static str, en: &'static str) -> &'static str {
    match locale {
        Locale::Ru => ru,
        Locale::En => en,
    }
}

fn percent(value: f64, locale: Locale) -> String {
    format!("{}%", format_number(value, locale))
}

fn status_lines(
    lines: &mut Vec<String>,
    distribution: &StatusDistribution,
    kind: StatusKind,
    locale: Locale,
) {
    for slice in status_slices(distribution, kind, locale) {
        lines.push(format!("  {:<24} {:>8}", slice.label, slice.count));
    }
}

pub fn analytics(report: &AnalyticsReport, locale: Locale) -> String {
    let mut lines = vec![
        format!(
            "{} [{}] {} {}",
            tr(locale, "Аналитика", "Analytics"),
            report.period,
            tr(locale, "на", "as of"),
            format_date(Some(report.as_of)),
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Клиенты", "Clients"),
            report.client_count,
            tr(locale, "Полисы", "Policies"),
            report.policy_count,
        ),
        format!(
            "{}: {}   {}: {}   {}: {}",
            tr(locale, "Премия", "Premium"),
            format_currency_short(report.total_premium, locale),
            tr(locale, "Средняя", "Average"),
            format_currency_short(report.average_premium, locale),
            tr(locale, "Ставка", "Rate"),
            percent(report.average_rate, locale),
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Продления", "Renewals"),
            percent(report.renewal_rate, locale),
            tr(locale, "Рост", "Growth"),
            percent(report.growth_rate, locale),
        ),
    ];
    if report.undated_policies > 0 {
        lines.push(format!(
            "{}: {}",
            tr(locale, "Полисы без даты", "Undated policies"),
            report.undated_policies
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "По отраслям", "By industry").to_string());
    for (share, industry) in industry_shares(&report.industries, locale)
        .iter()
        .zip(&report.industries)
    {
        lines.push(format!(
            "  {:<24} {:>8} {:>7}  {} / {}",
            share.name,
            format_currency_short(share.value, locale),
            percent(share.percent, locale),
            industry.policies,
            industry.clients,
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "По регионам (тыс.)", "By region (thousands)").to_string());
    for region in &report.regions {
        lines.push(format!(
            "  {:<24} {:>8}",
            display_name(region.name.as_deref(), locale),
            format_number(region.premium as f64, locale),
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "Андеррайтеры", "Underwriters").to_string());
    for uw in &report.underwriters {
        lines.push(format!(
            "  {:<24} {:>4} {:>8} {:>8}%",
            display_name(uw.name.as_deref(), locale),
            uw.policies,
            format_currency_short(uw.total_premium, locale),
            uw.average_rate_fixed(),
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "Динамика по месяцам (тыс.)", "Monthly trend (thousands)").to_string());
    for point in &report.monthly_trend {
        lines.push(format!(
            "  {} {:<4} {:>8} {:>4} / {}",
            point.label,
            point.year,
            format_number(point.premium as f64, locale),
            point.policies,
            point.clients,
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "Статусы клиентов", "Client statuses").to_string());
    status_lines(&mut lines, &report.client_statuses, StatusKind::Client, locale);
    lines.push(tr(locale, "Статусы полисов", "Policy statuses").to_string());
    status_lines(&mut lines, &report.policy_statuses, StatusKind::Policy, locale);

    lines.join("\n") + "\n"
}

pub fn dashboard(summary: &DashboardSummary, locale: Locale) -> String {
    let stats = &summary.stats;
    let mut lines = vec![
        format!(
            "{} {}",
            tr(locale, "Сводка на", "Dashboard as of"),
            format_date(Some(summary.as_of))
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Активные полисы", "Active policies"),
            stats.active_policies,
            tr(locale, "Активные клиенты", "Active clients"),
            stats.active_clients,
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Страховая сумма", "Insured amount"),
            format_currency_short(stats.total_insurance_amount, locale),
            tr(locale, "Премия за месяц", "Premium this month"),
            format_currency_short(stats.month_premium, locale),
        ),
        String::new(),
        format!(
            "{} [{}]",
            tr(locale, "Динамика премий (тыс.)", "Premium dynamics (thousands)"),
            summary.period
        ),
    ];

    for point in &summary.dynamics {
        lines.push(format!(
            "  {} {:<4} {:>8} {:>8}",
            point.label,
            point.year,
            format_number(point.gross as f64, locale),
            format_number(point.net as f64, locale),
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "Последние полисы", "Recent policies").to_string());
    for policy in &summary.recent {
        lines.push(format!(
            "  #{:<6} {:<24} {:>10} {:>12} {}",
            policy.id,
            policy.client_name,
            format_date(policy.creation_date),
            format_currency_short(policy.premium.unwrap_or(0.0), locale),
            policy
                .status
                .as_ref()
                .map(|s| status_label(StatusKind::Policy, s.as_str(), locale))
                .unwrap_or_default(),
        ));
    }

    lines.join("\n") + "\n"
}

pub fn financial(report: &FinancialReport, locale: Locale) -> String {
    let mut lines = vec![
        format!(
            "{} {} - {}",
            tr(locale, "Финансовый отчет за период", "Financial report for"),
            format_date(Some(report.window.start)),
            format_date(Some(report.window.end)),
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Всего полисов", "Policies"),
            report.policy_count,
            tr(locale, "Активных полисов", "Active policies"),
            report.active_policies,
        ),
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Общая премия", "Total premium"),
            format_currency(report.total_premium, "UZS", locale),
            tr(locale, "Средняя премия", "Average premium"),
            format_currency(report.average_premium as f64, "UZS", locale),
        ),
        String::new(),
        tr(locale, "Премия по месяцам (тыс.)", "Premium by month (thousands)").to_string(),
    ];
    for month in &report.monthly {
        lines.push(format!(
            "  {:<8} {:>12}",
            month.label,
            format_number(month.premium, locale)
        ));
    }

    lines.push(String::new());
    lines.push(tr(locale, "Полисы", "Policies").to_string());
    for policy in &report.policies {
        lines.push(format!(
            "  #{:<6} {:>10} {:>16}",
            policy.id,
            format_date(policy.creation_date),
            format_currency_short(policy.premium_or_zero(), locale),
        ));
    }

    lines.join("\n") + "\n"
}

pub fn portfolio(analysis: &PortfolioAnalysis, locale: Locale) -> String {
    let mut lines = vec![
        format!(
            "{}: {}   {}: {}",
            tr(locale, "Уникальных клиентов", "Clients"),
            analysis.client_count,
            tr(locale, "Полисов", "Policies"),
            analysis.policy_count,
        ),
        format!(
            "{}: {}",
            tr(locale, "Общая страховая сумма", "Total insured amount"),
            format_currency(analysis.total_insurance_amount, "UZS", locale),
        ),
        format!(
            "{}: {}",
            tr(locale, "Средний размер полиса", "Average insured amount"),
            format_currency(analysis.average_insurance_amount as f64, "UZS", locale),
        ),
        String::new(),
    ];

    match &analysis.breakdown {
        PortfolioBreakdown::Industry(rows) => {
            lines.push(tr(locale, "По отраслям", "By industry").to_string());
            for row in rows {
                lines.push(format!(
                    "  {:<24} {:>4} {:>4} {:>10}",
                    display_name(row.name.as_deref(), locale),
                    row.clients,
                    row.policies,
                    format_currency_short(row.value, locale),
                ));
            }
        }
        PortfolioBreakdown::Client(rows) => {
            lines.push(tr(locale, "По клиентам", "By client").to_string());
            for row in rows {
                lines.push(format!(
                    "  {:<24} {:<16} {:>4} {:>10}",
                    row.name,
                    display_name(row.region.as_deref(), locale),
                    row.policies,
                    format_currency_short(row.premium, locale),
                ));
            }
        }
    }

    lines.join("\n") + "\n"
}

pub fn client_hits(query: &str, hits: &[Client], locale: Locale) -> String {
    let mut lines = vec![format!(
        "{} \"{}\": {}",
        tr(locale, "Клиенты", "Clients"),
        query,
        hits.len()
    )];
    for client in hits {
        lines.push(format!(
            "  #{:<6} {:<32} {}",
            client.id,
            client.name,
            client.inn.as_deref().unwrap_or("—"),
        ));
    }
    lines.join("\n") + "\n"
}

pub fn policy_hits(snapshot: &Snapshot, query: &str, hits: &[Policy], locale: Locale) -> String {
    let mut lines = vec![format!(
        "{} \"{}\": {}",
        tr(locale, "Полисы", "Policies"),
        query,
        hits.len()
    )];
    for policy in hits {
        let client = snapshot
            .client_name(policy.client)
            .or(policy.client_name.as_deref())
            .unwrap_or("—");
        lines.push(format!(
            "  #{:<6} {:<24} {:>16} {}",
            policy.id,
            client,
            format_currency(
                policy.premium_or_zero(),
                policy.premium_currency.as_deref().unwrap_or("UZS"),
                locale
            ),
            display_name(policy.underwriter.as_deref(), locale),
        ));
    }
    lines.join("\n") + "\n"
}
