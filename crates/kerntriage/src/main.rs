//! kt: classify kernel CI logs into named test results
//!
//! Thin wrapper over `kerntriage-core`. Reads a log from a file or stdin,
//! runs the configured parsers and prints the resulting tests as plain text
//! or JSON. Diagnostics go to stderr; results go to stdout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use kerntriage_core::build::{BuildLogParser, CompilerFamily, CompilerSelection};
use kerntriage_core::config::Config;
use kerntriage_core::kernel::{self, KernelLogParser};
use kerntriage_core::logging::init_logging;
use kerntriage_core::results::{SNIPPET_SEPARATOR, TestRecord};
use kerntriage_core::signatures::Signature;
use kerntriage_core::triage::{LogParser, Triage, TriageReport};

#[derive(Parser)]
#[command(name = "kt")]
#[command(version, about = "Classify kernel build and boot logs into test results", long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/kerntriage/kerntriage.toml when present)
    #[arg(long, global = true, env = "KT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Exit with status 1 when any test failed
    #[arg(long, global = true)]
    check: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a boot/test console log for kernel crashes and warnings
    Kernel {
        /// Log file, or '-' for stdin
        log: PathBuf,

        /// Text separating boot output from test output
        #[arg(long)]
        boot_marker: Option<String>,

        /// Skip the per-snippet sha256 tests
        #[arg(long)]
        no_shas: bool,

        /// Print captured snippets under each failing test
        #[arg(long)]
        logs: bool,
    },

    /// Parse a compiler log for errors and warnings
    Build {
        /// Log file, or '-' for stdin
        log: PathBuf,

        /// Diagnostic tables to apply (auto, gcc, clang, both)
        #[arg(long)]
        compiler: Option<CompilerSelection>,

        /// Also create per-snippet sha256 tests
        #[arg(long)]
        shas: bool,

        /// Print captured snippets under each failing test
        #[arg(long)]
        logs: bool,
    },

    /// Run every enabled parser over one CI run's log
    Triage {
        /// Log file, or '-' for stdin. Without it the run has no log.
        log: Option<PathBuf>,

        /// The run carries a build suite, so the build parser applies
        #[arg(long)]
        build: bool,

        /// Print captured snippets under each failing test
        #[arg(long)]
        logs: bool,
    },

    /// List the signature tables in precedence order
    Signatures {
        /// Only show one parser's table
        #[arg(long, value_enum)]
        parser: Option<ParserKind>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParserKind {
    Kernel,
    Gcc,
    Clang,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: Summary,
    tests: &'a [TestRecord],
}

#[derive(Serialize)]
struct Summary {
    suites: usize,
    tests: usize,
    failures: usize,
}

#[derive(Serialize)]
struct SignatureRow<'a> {
    table: &'static str,
    #[serde(flatten)]
    signature: &'a Signature,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(remediation) = err
                .downcast_ref::<kerntriage_core::Error>()
                .and_then(kerntriage_core::Error::remediation)
            {
                eprint!("{remediation}");
            }
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    let mut log_config = config.general.log_config();
    if let Some(level) = &cli.log_level {
        log_config.level.clone_from(level);
    }
    init_logging(&log_config).context("failed to initialize logging")?;
    tracing::debug!(config = ?cli.config, "Configuration loaded");

    let report = match cli.command {
        Commands::Kernel {
            log,
            boot_marker,
            no_shas,
            logs,
        } => {
            let mut kernel_config = config.kernel.clone();
            if let Some(marker) = boot_marker {
                kernel_config.boot_marker = marker;
            }
            if no_shas {
                kernel_config.create_shas = false;
            }
            let parser = KernelLogParser::from_config(&kernel_config)?;
            let text = read_log(&log)?;
            let report = TriageReport {
                suites: parser.parse(&text),
            };
            print_report(&report, cli.format, logs)?;
            report
        }
        Commands::Build {
            log,
            compiler,
            shas,
            logs,
        } => {
            let mut build_config = config.build.clone();
            if let Some(compiler) = compiler {
                build_config.compiler = compiler;
            }
            if shas {
                build_config.create_shas = true;
            }
            let parser = BuildLogParser::from_config(&build_config)?;
            let text = read_log(&log)?;
            let report = TriageReport {
                suites: parser.parse(&text),
            };
            print_report(&report, cli.format, logs)?;
            report
        }
        Commands::Triage { log, build, logs } => {
            let triage = Triage::from_config(&config)?;
            let text = log.as_deref().map(read_log).transpose()?;
            let report = triage.run(text.as_deref(), build);
            print_report(&report, cli.format, logs)?;
            report
        }
        Commands::Signatures { parser } => {
            print_signatures(&config, parser, cli.format)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            return Ok(ExitCode::SUCCESS);
        }
    };

    if cli.check && report.failure_count() > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kerntriage").join("kerntriage.toml"))
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => Config::load_from(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        _ => Ok(Config::default()),
    }
}

fn read_log(path: &Path) -> Result<String> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(kerntriage_core::Error::from)
            .context("failed to read log from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(kerntriage_core::Error::from)
            .with_context(|| format!("failed to read log {}", path.display()))?
    };
    tracing::debug!(bytes = text.len(), "Read log");
    Ok(text)
}

fn print_report(report: &TriageReport, format: OutputFormat, logs: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let records = report.records();
            let json = JsonReport {
                summary: Summary {
                    suites: report.suites.len(),
                    tests: records.len(),
                    failures: report.failure_count(),
                },
                tests: &records,
            };
            let out = serde_json::to_string_pretty(&json).map_err(kerntriage_core::Error::from)?;
            println!("{out}");
        }
        OutputFormat::Plain => {
            if report.is_empty() {
                println!("no tests");
                return Ok(());
            }
            for suite in &report.suites {
                println!(
                    "{}: {} tests, {} failed",
                    suite.suite,
                    suite.tests.len(),
                    suite.failure_count()
                );
                for (name, entry) in suite.failures() {
                    println!("  FAIL {name}");
                    if logs {
                        for snippet in entry.snippets() {
                            for line in snippet.lines() {
                                println!("    | {line}");
                            }
                            println!("    {}", SNIPPET_SEPARATOR.trim());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_signatures(config: &Config, only: Option<ParserKind>, format: OutputFormat) -> Result<()> {
    let mut tables: Vec<(&'static str, Vec<Signature>)> = Vec::new();
    let wanted = |kind: ParserKind| only.is_none_or(|only| only == kind);

    if wanted(ParserKind::Kernel) {
        let parser = KernelLogParser::from_config(&config.kernel)?;
        tables.push(("kernel", parser.table().signatures().to_vec()));
    }
    let build = BuildLogParser::from_config(&config.build)?;
    for (kind, family) in [
        (ParserKind::Gcc, CompilerFamily::Gcc),
        (ParserKind::Clang, CompilerFamily::Clang),
    ] {
        if wanted(kind) {
            tables.push((family.name(), build.table(family).signatures().to_vec()));
        }
    }

    match format {
        OutputFormat::Json => {
            let rows: Vec<SignatureRow<'_>> = tables
                .iter()
                .flat_map(|(table, signatures)| {
                    signatures.iter().map(move |signature| SignatureRow {
                        table: *table,
                        signature,
                    })
                })
                .collect();
            let out = serde_json::to_string_pretty(&rows).map_err(kerntriage_core::Error::from)?;
            println!("{out}");
        }
        OutputFormat::Plain => {
            for (table, signatures) in &tables {
                let suites = match *table {
                    "kernel" => format!("{}, {}", kernel::BOOT_SUITE, kernel::TEST_SUITE),
                    "gcc" => CompilerFamily::Gcc.suite().to_string(),
                    _ => CompilerFamily::Clang.suite().to_string(),
                };
                println!("{table} ({suites}):");
                for signature in signatures {
                    let named = if signature.extract.is_some() { " [named]" } else { "" };
                    println!("  {}{named}", signature.name);
                }
            }
        }
    }
    Ok(())
}
