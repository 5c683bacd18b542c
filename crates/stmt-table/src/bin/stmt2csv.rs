use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use stmt_table::{
    ExtractError, ExtractOptions, ExtractionReport, NoiseLinePolicy, NoiseRules, OutputFormat,
    PageSelection, extract_pdf_to_file,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stmt2csv",
    version,
    about = "Extract bank statement transactions from PDFs into CSV or JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract transactions and write the statement table.
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path.
    #[arg(short, long)]
    output: PathBuf,

    /// Output format: csv, json or xlsx.
    #[arg(long, default_value = "csv")]
    format: String,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Output delimiter character (CSV only).
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Minimum cells required per detected table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Extra boilerplate phrase to reject. Repeatable.
    #[arg(long = "noise-phrase")]
    noise_phrases: Vec<String>,

    /// File with one boilerplate phrase per line.
    #[arg(long)]
    noise_file: Option<PathBuf>,

    /// Drop the built-in boilerplate phrases.
    #[arg(long)]
    no_default_noise: bool,

    /// Replace the withdrawal keywords used for text lines. Repeatable.
    #[arg(long = "withdrawal-keyword")]
    withdrawal_keywords: Vec<String>,

    /// Let boilerplate lines discard a description waiting for its amount.
    #[arg(long)]
    noise_clears_pending: bool,

    /// Seconds allowed for each extraction stage; 0 disables the limit.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn load_noise_rules(args: &ExtractArgs) -> Result<NoiseRules> {
    let mut rules = if args.no_default_noise {
        NoiseRules::empty()
    } else {
        NoiseRules::default()
    };

    if let Some(path) = &args.noise_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read --noise-file '{}'", path.display()))?;
        rules.extend(NoiseRules::parse_phrase_list(&text));
    }
    rules.extend(&args.noise_phrases);
    Ok(rules)
}

fn parse_options(args: &ExtractArgs) -> Result<(OutputFormat, ExtractOptions)> {
    let format = OutputFormat::from_str(&args.format)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --format")?;

    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let mut options = ExtractOptions {
        pages,
        delimiter: args.delimiter as u8,
        min_cols: args.min_cols,
        noise: load_noise_rules(args)?,
        noise_line_policy: if args.noise_clears_pending {
            NoiseLinePolicy::ClearPending
        } else {
            NoiseLinePolicy::KeepPending
        },
        extraction_timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
        ..ExtractOptions::default()
    };
    if !args.withdrawal_keywords.is_empty() {
        options = options.with_withdrawal_keywords(&args.withdrawal_keywords);
    }

    Ok((format, options))
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if verbose {
        eprintln!(
            "rows={} (tables: {}, text: {}, duplicates dropped: {})",
            report.row_count, report.table_rows, report.text_rows, report.duplicates_dropped
        );
    }

    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} page={:?} table_id={:?}: {}",
                warning.code, warning.page, warning.table_id, warning.message
            );
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<ExtractionReport> {
    let (format, options) = parse_options(args)?;
    extract_pdf_to_file(&args.input, &args.output, format, &options)
        .with_context(|| format!("failed to extract transactions from '{}'", args.input.display()))
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stmt_table=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                let no_data = error
                    .downcast_ref::<ExtractError>()
                    .is_some_and(ExtractError::is_no_data);
                if no_data {
                    ExitCode::from(2)
                } else {
                    ExitCode::from(1)
                }
            }
        },
    }
}
