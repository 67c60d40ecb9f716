//! factrl CLI - extract GAAP and DEI records from XBRL instances

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use factrl::context::ContextEntry;
use factrl::{
    dump, dump_with_provenance, parse_doc_date, ContextTable, ExtractionConfig, ParsedDocument,
    PeriodSelector, ResultRecord, XbrlParser,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// XBRL fact extraction for US-GAAP and DEI filings
#[derive(ClapParser)]
#[command(name = "factrl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log extraction decisions (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the GAAP record for one reporting period
    Gaap {
        /// Input file
        input: PathBuf,

        /// Document date (YYYYMMDD or YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Period selector: current, prior-year, prior-quarter or context:<id>
        #[arg(short, long, default_value = "current")]
        context: String,

        /// Drop values that cannot be coerced instead of failing
        #[arg(long)]
        ignore_errors: bool,

        /// Prefer durations of this many days (90 for a 10-Q, 365 for a 10-K)
        #[arg(long)]
        duration_days: Option<i64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Include provenance and diagnostics in JSON output
        #[arg(long, requires = "json")]
        provenance: bool,
    },

    /// Extract the DEI record
    Dei {
        /// Input file
        input: PathBuf,

        /// Drop values that cannot be coerced instead of failing
        #[arg(long)]
        ignore_errors: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the contexts of a document
    Contexts {
        /// Input file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Gaap {
            input,
            date,
            context,
            ignore_errors,
            duration_days,
            json,
            provenance,
        } => {
            let doc_date = parse_doc_date(&date)?;
            let selector: PeriodSelector = context.parse()?;
            let config = ExtractionConfig::default()
                .with_ignore_errors(ignore_errors)
                .with_preferred_duration_days(duration_days);
            let parser = XbrlParser::with_config(config);

            let start = Instant::now();
            let doc = load(&parser, &input)?;
            let record = parser
                .parse_gaap(&doc, doc_date, &selector)
                .with_context(|| format!("Failed to extract GAAP from {}", input.display()))?;
            let elapsed = start.elapsed();

            if json {
                let out = if provenance {
                    dump_with_provenance(&record)
                } else {
                    dump(&record)
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_record(&input, &record, elapsed.as_secs_f64() * 1000.0);
            }
        }

        Commands::Dei {
            input,
            ignore_errors,
            json,
        } => {
            let parser = XbrlParser::new().with_ignore_errors(ignore_errors);
            let start = Instant::now();
            let doc = load(&parser, &input)?;
            let record = parser
                .parse_dei(&doc)
                .with_context(|| format!("Failed to extract DEI from {}", input.display()))?;
            let elapsed = start.elapsed();

            if json {
                println!("{}", serde_json::to_string_pretty(&dump(&record))?);
            } else {
                print_record(&input, &record, elapsed.as_secs_f64() * 1000.0);
            }
        }

        Commands::Contexts { input } => {
            let doc = load(&XbrlParser::new(), &input)?;
            let table = ContextTable::build(&doc)?;

            println!("{} {}", "✓".green().bold(), input.display());
            println!("  Contexts: {}", table.len());
            for entry in table.entries() {
                match entry {
                    ContextEntry::Resolved(ctx) => {
                        let marker = if ctx.is_dimensional() {
                            " [dimensional]".yellow().to_string()
                        } else {
                            String::new()
                        };
                        println!("  {:<40} {}{}", ctx.id, ctx.period, marker);
                    }
                    ContextEntry::Unresolvable { id, reason } => {
                        println!("  {:<40} {} {}", id, "UNRESOLVABLE:".red(), reason);
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "factrl=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(parser: &XbrlParser, input: &Path) -> Result<ParsedDocument> {
    parser
        .parse_file(input)
        .with_context(|| format!("Failed to parse {}", input.display()))
}

fn print_record(input: &Path, record: &ResultRecord, elapsed_ms: f64) {
    println!(
        "{} {} ({})",
        "✓".green().bold(),
        input.display(),
        record.vocabulary()
    );
    if let Some(end) = record.diagnostics().resolved_period_end {
        println!("  Period end: {}", end);
    }

    let width = record.field_names().map(str::len).max().unwrap_or(0);
    for (field, value) in record.fields() {
        match value {
            Some(value) => println!("  {:<width$}  {}", field, value, width = width),
            None => println!("  {:<width$}  {}", field, "-".dimmed(), width = width),
        }
    }

    let diagnostics = record.diagnostics();
    if !diagnostics.is_clean() {
        println!();
        for field in &diagnostics.dimensional_only {
            println!("  {} {} reported only under dimensional contexts", "NOTE:".yellow(), field);
        }
        for id in &diagnostics.dangling_contexts {
            println!("  {} undefined context {}", "WARN:".yellow(), id);
        }
        for id in &diagnostics.unresolvable_contexts {
            println!("  {} unresolvable context {}", "WARN:".yellow(), id);
        }
        for failure in &diagnostics.coercion_failures {
            println!(
                "  {} {} = '{}': {}",
                "ERROR:".red(),
                failure.field,
                failure.raw,
                failure.reason
            );
        }
    }

    println!(
        "  Fields: {}/{}  Time: {:.2}ms",
        record.present_count(),
        record.field_names().count(),
        elapsed_ms
    );
}
