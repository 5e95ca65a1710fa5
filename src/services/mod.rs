//! Aggregation engine, report builders and the collaborators that feed them

pub mod aggregator;
pub mod analytics;
pub mod api;
pub mod dashboard;
pub mod formatter;
pub mod loader;
pub mod period;
pub mod reports;
pub mod search;
pub mod store;
pub mod validator;

pub use aggregator::Aggregator;
pub use analytics::{AnalyticsReport, ReportOptions};
pub use api::ApiClient;
pub use dashboard::DashboardSummary;
pub use formatter::Locale;
pub use period::{DateWindow, Period};
pub use reports::{FinancialReport, PortfolioAnalysis, PortfolioGrouping};
pub use search::{DebouncePolicy, DebouncedSearch, SearchState};
pub use store::{Snapshot, SnapshotStore};
