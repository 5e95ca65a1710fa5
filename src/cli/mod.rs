mod render;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use brokerstat::config::Config;
use brokerstat::services::loader::{load_clients, load_snapshot, write_snapshot};
use brokerstat::services::reports::CLIENT_ROWS;
use brokerstat::services::search::{search_clients, search_policies, MAX_DROPDOWN_RESULTS};
use brokerstat::services::{
    AnalyticsReport, ApiClient, DashboardSummary, DateWindow, DebouncePolicy, DebouncedSearch,
    FinancialReport, Locale, Period, PortfolioAnalysis, PortfolioGrouping, ReportOptions,
    SearchState, Snapshot, SnapshotStore,
};

/// Portfolio analytics for an insurance-brokerage back office
#[derive(Parser)]
#[command(name = "brokerstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Premium breakdowns by industry, region, underwriter and month
    Analytics(ReportArgs),

    /// Cards, premium dynamics and recent policies
    Dashboard(ReportArgs),

    /// Financial report for a date range, or portfolio analysis
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Find clients and policies; reads queries from stdin when none is given
    Search {
        query: Option<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Maximum hits per collection
        #[arg(long, default_value_t = MAX_DROPDOWN_RESULTS)]
        limit: usize,

        #[arg(long)]
        locale: Option<Locale>,
    },

    /// Download clients and policies from the API into JSON files
    Fetch {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ReportKind {
    /// Policies, premium and monthly series for policies created in a date range
    Financial {
        #[command(flatten)]
        source: SourceArgs,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the range (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: NaiveDate,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Insured amounts with an industry or per-client breakdown
    Portfolio {
        #[command(flatten)]
        source: SourceArgs,

        /// industry or client
        #[arg(long, default_value = "industry")]
        group_by: PortfolioGrouping,

        /// Rows shown in the per-client breakdown
        #[arg(long, default_value_t = CLIENT_ROWS)]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },
}

impl ReportKind {
    fn output(&self) -> &OutputArgs {
        match self {
            Self::Financial { output, .. } | Self::Portfolio { output, .. } => output,
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long)]
    locale: Option<Locale>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// clients.json export; the API is used when no files are given
    #[arg(long)]
    clients: Option<PathBuf>,

    /// policies.json export
    #[arg(long)]
    policies: Option<PathBuf>,
}

impl SourceArgs {
    fn load(&self, config: &Config) -> anyhow::Result<Snapshot> {
        match (&self.clients, &self.policies) {
            (Some(clients), Some(policies)) => load_snapshot(clients, policies)
                .with_context(|| format!("loading {}", clients.display())),
            (Some(clients), None) => {
                warn!("no policies file given, policy views will be empty");
                let clients = load_clients(clients)
                    .with_context(|| format!("loading {}", clients.display()))?;
                Ok(Snapshot::new(clients, Vec::new()))
            }
            (None, Some(_)) => anyhow::bail!("--policies needs a matching --clients file"),
            (None, None) => {
                info!(url = %config.api_url, "fetching snapshot from API");
                let mut api = ApiClient::from_config(config)?;
                Ok(api.fetch_snapshot()?)
            }
        }
    }
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// all, 12m, 6m or ytd
    #[arg(long, default_value = "12m")]
    period: Period,

    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    now: Option<NaiveDate>,

    /// Months kept in the monthly trend
    #[arg(long)]
    max_months: Option<usize>,

    #[arg(long)]
    locale: Option<Locale>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl ReportArgs {
    fn today(&self) -> NaiveDate {
        self.now.unwrap_or_else(|| Local::now().date_naive())
    }

    fn options(&self, config: &Config) -> ReportOptions {
        ReportOptions {
            max_months: self.max_months.unwrap_or(config.max_months),
            locale: self.locale.unwrap_or(config.locale),
        }
    }
}

impl Commands {
    /// Flags that replace their `BROKERSTAT_*` variable
    fn config_overrides(&self) -> Vec<(&'static str, String)> {
        let (locale, max_months) = match self {
            Self::Analytics(args) | Self::Dashboard(args) => (args.locale, args.max_months),
            Self::Report { kind } => (kind.output().locale, None),
            Self::Search { locale, .. } => (*locale, None),
            Self::Fetch { .. } => (None, None),
        };

        let mut overrides = Vec::new();
        if let Some(locale) = locale {
            overrides.push(("BROKERSTAT_LOCALE", locale.to_string()));
        }
        if let Some(max_months) = max_months {
            overrides.push(("BROKERSTAT_MAX_MONTHS", max_months.to_string()));
        }
        overrides
    }
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::load_with(&self.command.config_overrides())?;

        match self.command {
            Commands::Analytics(args) => {
                let store = SnapshotStore::with_snapshot(args.source.load(&config)?);
                let options = args.options(&config);
                let report =
                    AnalyticsReport::from_store(&store, args.period, args.today(), options);
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", render::analytics(&report, options.locale));
                }
                Ok(())
            }
            Commands::Dashboard(args) => {
                let snapshot = args.source.load(&config)?;
                let locale = args.options(&config).locale;
                let summary = DashboardSummary::build(&snapshot, args.period, args.today(), locale);
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print!("{}", render::dashboard(&summary, locale));
                }
                Ok(())
            }
            Commands::Report { kind } => run_report(kind, &config),
            Commands::Search {
                query,
                source,
                limit,
                locale,
            } => {
                let snapshot = source.load(&config)?;
                let locale = locale.unwrap_or(config.locale);
                match query {
                    Some(query) => {
                        let clients = search_clients(&snapshot.clients, &query, limit);
                        let policies = search_policies(&snapshot, &query, limit);
                        print!("{}", render::client_hits(&query, &clients, locale));
                        print!("{}", render::policy_hits(&snapshot, &query, &policies, locale));
                        Ok(())
                    }
                    None => interactive_search(snapshot, limit, locale),
                }
            }
            Commands::Fetch { out } => {
                let mut api = ApiClient::from_config(&config)?;
                let snapshot = api.fetch_snapshot()?;
                write_snapshot(&out, &snapshot)
                    .with_context(|| format!("writing snapshot to {}", out.display()))?;
                println!(
                    "{} clients, {} policies -> {}",
                    snapshot.clients.len(),
                    snapshot.policies.len(),
                    out.display()
                );
                Ok(())
            }
        }
    }
}

fn run_report(kind: ReportKind, config: &Config) -> anyhow::Result<()> {
    let locale = kind.output().locale.unwrap_or(config.locale);
    let json = kind.output().json;

    match kind {
        ReportKind::Financial {
            source, from, to, ..
        } => {
            let window = DateWindow::new(from, to)?;
            let report = FinancialReport::build(&source.load(config)?, window);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::financial(&report, locale));
            }
        }
        ReportKind::Portfolio {
            source,
            group_by,
            limit,
            ..
        } => {
            let analysis = PortfolioAnalysis::build(&source.load(config)?, group_by, limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", render::portfolio(&analysis, locale));
            }
        }
    }
    Ok(())
}

/// Each stdin line is a keystroke-level query; only settled queries print.
fn interactive_search(snapshot: Snapshot, limit: usize, locale: Locale) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let clients = snapshot.clients;
        let mut search = DebouncedSearch::new(DebouncePolicy::default(), move |q: &str| {
            search_clients(&clients, q, limit)
        });
        let mut updates = search.subscribe();
        let mut settled = search.subscribe();

        let printer = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                if let SearchState::Ready { query, hits } = state {
                    print!("{}", render::client_hits(&query, &hits, locale));
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            search.submit(&line);
        }

        settled
            .wait_for(|state| !matches!(state, SearchState::Pending { .. }))
            .await?;
        // Closing the channel ends the printer
        drop(search);
        printer.await?;
        Ok::<(), anyhow::Error>(())
    })
}
