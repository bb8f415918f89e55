//! Journal CLI - Command-line interface for Synheart Journal
//!
//! Commands:
//! - log: Normalize and store entries (metric, food or medication)
//! - summary: Print the rollup for a window
//! - table: Print the observation table as CSV or JSON
//! - export / import: Write or merge a backup file
//! - delete: Remove one record
//! - analysis: Print the analysis request for a window
//! - doctor: Diagnose configuration and stored data

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use synheart_journal::config::parse_offset;
use synheart_journal::encoder::AnalysisEncoder;
use synheart_journal::projection::{SortColumn, SortDirection};
use synheart_journal::types::{Collection, RecordRef};
use synheart_journal::{
    FileStore, HealthJournal, JournalConfig, JournalError, RowFilter, SortOverride, Window,
    JOURNAL_VERSION, PRODUCER_NAME, SCHEMA_VERSION,
};

/// Journal - On-device health journal engine
#[derive(Parser)]
#[command(name = "journal")]
#[command(author = "Synheart AI Inc")]
#[command(version = JOURNAL_VERSION)]
#[command(about = "Log, summarize and back up personal health entries", long_about = None)]
struct Cli {
    /// Data directory (overrides JOURNAL_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// UTC offset for local dates, e.g. +02:00 (overrides JOURNAL_UTC_OFFSET)
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and store entries
    Log {
        /// Entry kind
        #[arg(value_enum)]
        kind: EntryKind,

        /// Input file with one JSON entry or an array of entries (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Print the rollup for a window
    Summary {
        #[arg(value_enum, default_value = "today")]
        window: WindowArg,
    },

    /// Print the observation table
    Table {
        /// Case-insensitive search over type and details
        #[arg(long)]
        search: Option<String>,

        /// Only rows on this local date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Sort by column instead of newest first
        #[arg(long, value_enum)]
        sort: Option<ColumnArg>,

        /// Sort descending (with --sort)
        #[arg(long)]
        desc: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: TableFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Write a backup file
    Export {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Merge a backup file into the journal
    Import {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Remove one record
    Delete {
        #[arg(value_enum)]
        collection: CollectionArg,

        /// Record id
        id: String,
    },

    /// Print the analysis request for a window
    Analysis {
        #[arg(value_enum, default_value = "7d")]
        window: WindowArg,
    },

    /// Diagnose configuration and stored data
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EntryKind {
    /// Health metric (blood pressure, pulse, weight, ...)
    Metric,
    Food,
    Medication,
}

#[derive(Clone, Copy, ValueEnum)]
enum WindowArg {
    Today,
    #[value(name = "7d")]
    Week,
    /// Last 30 days in weekly buckets
    #[value(name = "30d")]
    Month,
    #[value(name = "90d")]
    Quarter,
}

impl From<WindowArg> for Window {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Today => Window::Today,
            WindowArg::Week => Window::Last7Days,
            WindowArg::Month => Window::Last30DaysByWeek,
            WindowArg::Quarter => Window::Last90Days,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ColumnArg {
    Date,
    Time,
    Type,
    Details,
    Value,
    Unit,
}

impl From<ColumnArg> for SortColumn {
    fn from(arg: ColumnArg) -> Self {
        match arg {
            ColumnArg::Date => SortColumn::Date,
            ColumnArg::Time => SortColumn::Time,
            ColumnArg::Type => SortColumn::Type,
            ColumnArg::Details => SortColumn::Details,
            ColumnArg::Value => SortColumn::Value,
            ColumnArg::Unit => SortColumn::Unit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CollectionArg {
    Food,
    Health,
    Medication,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Food => Collection::Food,
            CollectionArg::Health => Collection::Health,
            CollectionArg::Medication => Collection::Medication,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TableFormat {
    Csv,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let envelope = serde_json::to_string(&CliError::from(e))
                .unwrap_or_else(|_| "Unknown error".to_string());
            eprintln!("{envelope}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn run(cli: Cli) -> Result<(), JournalCliError> {
    let mut config = JournalConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(raw) = cli.utc_offset.as_deref() {
        config.utc_offset = Some(parse_offset(raw)?);
    }
    init_tracing(&config.log_filter);
    tracing::debug!(data_dir = %config.data_dir.display(), "journal configured");

    match cli.command {
        Commands::Log { kind, input } => cmd_log(&config, kind, &input),
        Commands::Summary { window } => cmd_summary(&config, window.into()),
        Commands::Table {
            search,
            date,
            sort,
            desc,
            format,
            output,
        } => {
            let filter = RowFilter { search, date };
            let sort = sort.map(|column| SortOverride {
                column: column.into(),
                direction: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            });
            cmd_table(&config, &filter, sort, format, &output)
        }
        Commands::Export { output } => cmd_export(&config, &output),
        Commands::Import { input } => cmd_import(&config, &input),
        Commands::Delete { collection, id } => {
            cmd_delete(&config, &RecordRef::new(collection.into(), id))
        }
        Commands::Analysis { window } => cmd_analysis(&config, window.into()),
        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn open_journal(config: &JournalConfig) -> Result<HealthJournal<FileStore>, JournalCliError> {
    Ok(HealthJournal::open(FileStore::new(&config.data_dir))?)
}

fn cmd_log(config: &JournalConfig, kind: EntryKind, input: &Path) -> Result<(), JournalCliError> {
    let entries = match serde_json::from_str::<Value>(&read_input(input)?)? {
        Value::Array(items) => items,
        single => vec![single],
    };
    if entries.is_empty() {
        return Err(JournalCliError::NoEntries);
    }

    let mut journal = open_journal(config)?;
    let now = Utc::now();
    let mut stored = Vec::with_capacity(entries.len());

    // Any rejected entry aborts before flush, so nothing from this batch is kept
    for entry in entries {
        let reference = match kind {
            EntryKind::Metric => journal.log_metric(&entry_from(entry)?, now)?,
            EntryKind::Food => journal.log_food(&entry_from(entry)?, now)?,
            EntryKind::Medication => journal.log_medication(&entry_from(entry)?, now)?,
        };
        stored.push(reference);
    }

    journal.flush()?;
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}

fn entry_from<T: DeserializeOwned>(value: Value) -> Result<T, JournalCliError> {
    Ok(serde_json::from_value(value)?)
}

fn cmd_summary(config: &JournalConfig, window: Window) -> Result<(), JournalCliError> {
    let journal = open_journal(config)?;
    let rollup = journal.summary(window, config.now());
    println!("{}", serde_json::to_string_pretty(&rollup)?);
    Ok(())
}

fn cmd_table(
    config: &JournalConfig,
    filter: &RowFilter,
    sort: Option<SortOverride>,
    format: TableFormat,
    output: &Path,
) -> Result<(), JournalCliError> {
    let journal = open_journal(config)?;
    let offset: FixedOffset = config.offset();
    let rows = journal.table(offset, filter, sort);

    let data = match format {
        TableFormat::Csv => synheart_journal::Projection::to_csv(&rows),
        TableFormat::Json => serde_json::to_string_pretty(&rows)?,
    };
    write_output(output, &data)
}

fn cmd_export(config: &JournalConfig, output: &Path) -> Result<(), JournalCliError> {
    let journal = open_journal(config)?;
    let payload = journal.export(Utc::now());
    write_output(output, &payload.to_json()?)
}

fn cmd_import(config: &JournalConfig, input: &Path) -> Result<(), JournalCliError> {
    let data = read_input(input)?;
    let mut journal = open_journal(config)?;
    let result = journal.import(&data)?;
    journal.flush()?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_delete(config: &JournalConfig, target: &RecordRef) -> Result<(), JournalCliError> {
    let mut journal = open_journal(config)?;
    journal.delete(target)?;
    journal.flush()?;
    Ok(())
}

fn cmd_analysis(config: &JournalConfig, window: Window) -> Result<(), JournalCliError> {
    let journal = open_journal(config)?;
    let request = journal.analysis(&AnalysisEncoder::new(), window, config.now())?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn cmd_doctor(config: &JournalConfig, json: bool) -> Result<(), JournalCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "journal_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Journal version {}", JOURNAL_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Backup schema: {}", SCHEMA_VERSION),
    });

    let data_dir = &config.data_dir;
    if data_dir.is_dir() {
        match HealthJournal::open(FileStore::new(data_dir)) {
            Ok(journal) => {
                let snapshot = journal.store().snapshot();
                checks.push(DoctorCheck {
                    name: "data_dir".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "{} ({} food, {} health, {} medication records)",
                        data_dir.display(),
                        snapshot.foods.len(),
                        snapshot.health.len(),
                        snapshot.medications.len()
                    ),
                });
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "data_dir".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot load records from {}: {}", data_dir.display(), e),
                });
            }
        }
    } else if data_dir.exists() {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("{} is not a directory", data_dir.display()),
        });
    } else {
        checks.push(DoctorCheck {
            name: "data_dir".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist yet (created on first write)", data_dir.display()),
        });
    }

    checks.push(DoctorCheck {
        name: "utc_offset".to_string(),
        status: CheckStatus::Ok,
        message: match config.utc_offset {
            Some(offset) => format!("Configured offset {offset}"),
            None => format!("System offset {}", config.offset()),
        },
    });

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input for log/import)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (log/import can read from -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: JOURNAL_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Journal Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(JournalCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, JournalCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), JournalCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum JournalCliError {
    Io(io::Error),
    Journal(JournalError),
    Json(serde_json::Error),
    NoEntries,
    DoctorFailed,
}

impl From<io::Error> for JournalCliError {
    fn from(e: io::Error) -> Self {
        JournalCliError::Io(e)
    }
}

impl From<JournalError> for JournalCliError {
    fn from(e: JournalError) -> Self {
        JournalCliError::Journal(e)
    }
}

impl From<serde_json::Error> for JournalCliError {
    fn from(e: serde_json::Error) -> Self {
        JournalCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<JournalCliError> for CliError {
    fn from(e: JournalCliError) -> Self {
        match e {
            JournalCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            JournalCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax and field names".to_string()),
            },
            JournalCliError::NoEntries => CliError {
                code: "NO_ENTRIES".to_string(),
                message: "No entries found in input".to_string(),
                hint: Some("Ensure the input array is not empty".to_string()),
            },
            JournalCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            JournalCliError::Journal(e) => {
                let (code, hint) = match &e {
                    JournalError::Validation(_) => {
                        ("VALIDATION_ERROR", "Entry was rejected and not stored")
                    }
                    JournalError::InvalidFormat(_) => (
                        "INVALID_FORMAT",
                        "Backups need foodEntries, healthData, medications and version",
                    ),
                    JournalError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    JournalError::Storage(_) => {
                        ("STORAGE_ERROR", "Run 'journal doctor' to inspect the data directory")
                    }
                    JournalError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    JournalError::Config(_) => {
                        ("CONFIG_ERROR", "Check JOURNAL_* environment variables and flags")
                    }
                    JournalError::EncodingError(_) => {
                        ("ENCODING_ERROR", "Log some entries in this window first")
                    }
                    JournalError::RecordNotFound(_) => {
                        ("NOT_FOUND", "Use 'journal table --format json' to list record ids")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
