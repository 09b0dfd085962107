//! CLI for the observa slot registry and bucket codec.
//!
//! Provides commands for inspecting descriptor files, computing bucket keys,
//! and reading consolidated records from a bucket dump.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use observa::bucket::week_shifts;
use observa::observable::BUILTIN_OBSERVABLES;
use observa::reader::fetch_bucket;
use observa::store::JsonStore;
use observa::{
    ObservableId, RefreshOutcome, RegistryConfig, SkipReason, SlotRegistry, bucket_key,
    step_back_weeks, week_start,
};
use tracing_subscriber::EnvFilter;

/// observa — Observable slot registry and shift bucket inspector.
#[derive(Parser)]
#[command(name = "observa", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List observable slots.
    Slots {
        #[command(flatten)]
        state: StateArgs,

        /// Include extension indices with no slot defined.
        #[arg(long)]
        all: bool,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one observable slot.
    Slot {
        #[command(flatten)]
        state: StateArgs,

        /// Observable index.
        index: usize,
    },

    /// Parse the descriptor file and report problems.
    Check {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Print the bucket key for a timestamp.
    Key {
        /// Unix seconds or RFC 3339 time (default: now).
        timestamp: Option<String>,
    },

    /// Print the week start and every shift key of a week.
    Week {
        /// Unix seconds or RFC 3339 time (default: now).
        timestamp: Option<String>,

        /// Number of weeks to step back.
        #[arg(long, default_value = "0")]
        back: i64,
    },

    /// Read one consolidated record from a JSON bucket dump.
    Fetch {
        /// Path to the JSON bucket dump.
        #[arg(long)]
        store: PathBuf,

        /// State directory used to name extension slots.
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Unix seconds or RFC 3339 time (default: now).
        timestamp: Option<String>,
    },
}

/// Where to find the descriptor file.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct StateArgs {
    /// Monitoring state directory containing `ts_key`.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// JSON registry configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl StateArgs {
    fn registry(&self) -> Result<SlotRegistry, Box<dyn std::error::Error>> {
        let config = match (&self.state_dir, &self.config) {
            (_, Some(path)) => RegistryConfig::load(path)?,
            (Some(dir), None) => RegistryConfig::new(dir),
            (None, None) => return Err("one of --state-dir or --config is required".into()),
        };
        Ok(SlotRegistry::new(&config))
    }
}

/// Output format for slot listings.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text columns.
    Table,
    /// JSON array of objects.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Slots { state, all, format } => cmd_slots(&state, all, &format),
        Commands::Slot { state, index } => cmd_slot(&state, index),
        Commands::Check { state } => cmd_check(&state),
        Commands::Key { timestamp } => cmd_key(timestamp.as_deref()),
        Commands::Week { timestamp, back } => cmd_week(timestamp.as_deref(), back),
        Commands::Fetch {
            store,
            state_dir,
            timestamp,
        } => cmd_fetch(&store, state_dir, timestamp.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Implements `observa slots`.
fn cmd_slots(
    state: &StateArgs,
    all: bool,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = state.registry()?;
    report_refresh(&registry.refresh());

    let populated = registry.populated();

    match format {
        OutputFormat::Table => {
            println!(
                "{:>5}  {:<20} {:<28} {:>10} {:>10}  {:<5} description",
                "index", "name", "units", "min", "max", "cons"
            );
            let mut rows = populated.iter().peekable();
            for id in ObservableId::all() {
                match rows.next_if(|(row_id, _)| *row_id == id) {
                    Some((_, attrs)) => println!(
                        "{:>5}  {:<20} {:<28} {:>10} {:>10}  {:<5} {}",
                        id.index(),
                        attrs.name,
                        attrs.units,
                        attrs.expected_minimum,
                        attrs.expected_maximum,
                        attrs.consolidable,
                        attrs.description
                    ),
                    None if all => println!("{:>5}  (undefined)", id.index()),
                    None => {}
                }
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = populated
                .iter()
                .map(|(id, attrs)| {
                    serde_json::json!({
                        "index": id.index(),
                        "builtin": id.is_builtin(),
                        "slot": attrs,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

/// Implements `observa slot <index>`.
fn cmd_slot(state: &StateArgs, index: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = state.registry()?;
    let id = ObservableId::new(index)?;

    if !registry.has_slot(id) {
        println!("Observable {index}: no slot defined");
        return Ok(());
    }

    let attrs = registry.slot(id)?;
    let kind = if id.is_builtin() { "built-in" } else { "extension" };
    println!("Observable {index} ({kind})");
    println!("  Name:         {}", attrs.name);
    println!("  Description:  {}", attrs.description);
    println!("  Units:        {}", attrs.units);
    println!(
        "  Expected:     {} .. {}",
        attrs.expected_minimum, attrs.expected_maximum
    );
    println!("  Consolidable: {}", attrs.consolidable);

    Ok(())
}

/// Implements `observa check`.
fn cmd_check(state: &StateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = state.registry()?;
    let outcome = registry.reload();

    println!("Descriptor: {}", registry.descriptor_path().display());

    let report = match &outcome {
        RefreshOutcome::Skipped(_) => {
            return Err(format!(
                "descriptor '{}' could not be read",
                registry.descriptor_path().display()
            )
            .into());
        }
        RefreshOutcome::Loaded(report) | RefreshOutcome::Degraded(report) => report,
    };

    if let Some(modified) = registry.load_time() {
        let modified: DateTime<Utc> = modified.into();
        println!("Modified:   {}", modified.to_rfc3339());
    }
    println!("Installed:  {}", report.installed);
    println!("Spare:      {}", report.spare);

    if let Some(record) = report.truncated_at {
        println!("Truncated:  file ends at record {record}");
    }

    if !report.malformed.is_empty() {
        println!("Malformed:  {}", report.malformed.len());
        for line in &report.malformed {
            println!(
                "  record {} ({} fields parsed): {}",
                line.record, line.fields, line.line
            );
        }
    }

    if report.is_degraded() {
        return Err("descriptor has problems".into());
    }

    println!("OK");
    Ok(())
}

/// Implements `observa key [timestamp]`.
fn cmd_key(timestamp: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let t = parse_timestamp(timestamp)?;
    println!("{}", bucket_key(t)?);
    Ok(())
}

/// Implements `observa week [timestamp]`.
fn cmd_week(timestamp: Option<&str>, back: i64) -> Result<(), Box<dyn std::error::Error>> {
    let t = step_back_weeks(parse_timestamp(timestamp)?, back);
    let start = week_start(t)?;

    println!("# week_start={} ({start})", format_time(start));
    println!("timestamp,time,key");
    for shift in week_shifts(start)? {
        println!("{shift},{},{}", format_time(shift), bucket_key(shift)?);
    }

    Ok(())
}

/// Implements `observa fetch --store <file> [timestamp]`.
fn cmd_fetch(
    store_path: &Path,
    state_dir: Option<PathBuf>,
    timestamp: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let t = parse_timestamp(timestamp)?;
    let key = bucket_key(t)?;
    let store = JsonStore::open(store_path)?;

    let Some(averages) = fetch_bucket(&store, t)? else {
        let mut keys: Vec<&str> = store.keys().collect();
        keys.sort_unstable();
        eprintln!("Buckets in {}:", store_path.display());
        for k in keys {
            eprintln!("  {k}");
        }
        return Err(format!("no record for bucket '{key}'").into());
    };

    let mut registry = state_dir.map(|dir| SlotRegistry::new(&RegistryConfig::new(dir)));

    println!("# bucket={key}");
    println!("index,name,value");
    for id in ObservableId::all() {
        let name = match registry.as_mut() {
            Some(registry) => {
                if !registry.has_slot(id) {
                    continue;
                }
                registry.name(id)?.to_string()
            }
            None if id.is_builtin() => BUILTIN_OBSERVABLES[id.index()].name.to_string(),
            None => "-".to_string(),
        };
        println!("{},{name},{}", id.index(), averages[id]);
    }

    Ok(())
}

/// Logs a refresh outcome that the user should know about.
fn report_refresh(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Skipped(SkipReason::Unavailable) => {
            tracing::info!("no descriptor file; showing built-in slots only");
        }
        RefreshOutcome::Degraded(report) => {
            tracing::warn!(
                "descriptor loaded with {} malformed record(s){}",
                report.malformed.len(),
                if report.truncated_at.is_some() {
                    " and was truncated"
                } else {
                    ""
                }
            );
        }
        RefreshOutcome::Skipped(SkipReason::Unchanged) | RefreshOutcome::Loaded(_) => {}
    }
}

/// Parses Unix seconds or an RFC 3339 time; `None` means now.
fn parse_timestamp(s: Option<&str>) -> Result<i64, Box<dyn std::error::Error>> {
    let Some(s) = s.map(str::trim) else {
        return Ok(Utc::now().timestamp());
    };

    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("invalid timestamp '{s}': {e}").into())
}

/// Formats Unix seconds as RFC 3339 UTC.
fn format_time(t: i64) -> String {
    DateTime::from_timestamp(t, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| t.to_string())
}
