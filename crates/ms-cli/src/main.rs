//! CLI entry point for the modspec registry crawler.
//!
//! This binary drives a resumable crawl over the npm registry and prints
//! aggregate statistics about how packages reference other modules.
//!
//! # Usage
//!
//! ```bash
//! modspec [OPTIONS] [ACTION]
//!
//! # Process the next 50 packages, then print the report
//! modspec 50
//!
//! # Print the report without scanning
//! modspec report
//!
//! # Re-queue every package that had a file fail to parse
//! modspec reset-parse-errors
//!
//! # Inspect one package's record
//! modspec query left-pad
//!
//! # Export-shape crawl (installs and loads packages)
//! modspec --variant export-shape 10
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{bail, eyre};
use ms_core::{Config, ScanVariant};
use ms_scanner::{
    Analyzer, ExportShapeProbe, ExportShapeReport, ImportClassifier, ModuleSpecReport,
    NameCharacterReport, PackageIndex, RegistryClient, ScanEngine,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Resumable npm registry crawler classifying module specifiers.
///
/// Each run processes packages from a persisted, shuffled index in the
/// variant's working folder; interrupted runs pick up where they stopped.
#[derive(Parser)]
#[command(name = "modspec", version, about, long_about = None)]
struct Cli {
    /// Action: a package count (default 1, at least 1), `skip`, `reset!`,
    /// `reset-parse-errors`, `report`, `query`, or `names`.
    action: Option<String>,

    /// Package name for `query`.
    name: Option<String>,

    /// Which crawl to drive.
    #[arg(long, value_enum, default_value_t = VariantArg::ModuleSpec)]
    variant: VariantArg,

    /// Working folder (defaults to the variant's fixed folder).
    #[arg(long)]
    work_dir: Option<Utf8PathBuf>,

    /// JSON configuration file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

/// Scan variant as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    /// Static classification of `require` specifiers.
    ModuleSpec,
    /// Install and load each package to inspect its export.
    ExportShape,
}

impl From<VariantArg> for ScanVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::ModuleSpec => Self::ModuleSpec,
            VariantArg::ExportShape => Self::ExportShape,
        }
    }
}

/// What one invocation does to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Process this many pending packages, then print the report.
    Run(usize),
    /// Mark the next pending package as skipped.
    Skip,
    /// Clear every result.
    ResetAll,
    /// Clear records of packages with at least one parse error.
    ResetParseErrors,
    /// Print the variant's report.
    Report,
    /// Print one package's persisted entry.
    Query(String),
    /// Print the package name character frequencies.
    Names,
}

/// Interprets the positional arguments.
fn parse_action(action: Option<&str>, name: Option<&str>) -> color_eyre::Result<Action> {
    let parsed = match action {
        None => Action::Run(1),
        Some("skip") => Action::Skip,
        Some("reset!") => Action::ResetAll,
        Some("reset-parse-errors") => Action::ResetParseErrors,
        Some("report") => Action::Report,
        Some("names") => Action::Names,
        Some("query") => {
            let name = name.ok_or_else(|| eyre!("query needs a package name"))?;
            return Ok(Action::Query(name.to_owned()));
        }
        // A count of 0 still processes one package.
        Some(other) => match other.parse::<usize>() {
            Ok(count) => Action::Run(count.max(1)),
            Err(_) => bail!("unknown action: {other}"),
        },
    };

    if let Some(extra) = name {
        bail!("unexpected argument: {extra}");
    }
    Ok(parsed)
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// HTTP transport crates are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!(
            "{level},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn"
        ))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the variant defaults, the optional config file,
/// and CLI overrides.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let base = Config::for_variant(cli.variant.into());
    let mut config = match &cli.config {
        Some(path) => Config::load(path, base)?,
        None => base,
    };

    if let Some(work_dir) = &cli.work_dir {
        config.scan.work_dir.clone_from(work_dir);
    }
    config.validate()?;

    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Opens the engine, performs the action, and always closes the index before
/// returning the action's outcome.
async fn execute<A: Analyzer>(
    mut engine: ScanEngine<RegistryClient, A>,
    action: &Action,
    render: impl Fn(&PackageIndex) -> String,
) -> color_eyre::Result<()> {
    engine.open().await?;
    let outcome = dispatch(&mut engine, action, render).await;
    let closed = engine.close().await;

    outcome?;
    closed?;
    Ok(())
}

async fn dispatch<A: Analyzer>(
    engine: &mut ScanEngine<RegistryClient, A>,
    action: &Action,
    render: impl Fn(&PackageIndex) -> String,
) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();

    match action {
        Action::Run(count) => {
            engine.run(*count).await?;
            print_index(engine, render)?;
        }
        Action::Skip => {
            let skipped = engine.skip().await?;
            let mut handle = stdout.lock();
            match skipped {
                Some(name) => writeln!(handle, "Skipped {name}")?,
                None => writeln!(handle, "No pending packages")?,
            }
        }
        Action::ResetAll => {
            let cleared = engine.reset(None).await?;
            writeln!(stdout.lock(), "Cleared {cleared} entries")?;
        }
        Action::ResetParseErrors => {
            let mut has_parse_errors = |record: &serde_json::Value, _: &str| {
                record
                    .get("parseErrors")
                    .and_then(serde_json::Value::as_u64)
                    .is_some_and(|count| count > 0)
            };
            let cleared = engine.reset(Some(&mut has_parse_errors)).await?;
            writeln!(stdout.lock(), "Cleared {cleared} entries with parse errors")?;
        }
        Action::Report => print_index(engine, render)?,
        Action::Query(name) => {
            let index = engine.index().ok_or_else(|| eyre!("package index is not open"))?;
            let mut handle = stdout.lock();
            match index.get_by_name(name) {
                Some(entry) => {
                    writeln!(handle, "{name}: {}", serde_json::to_string_pretty(entry)?)?;
                }
                None => writeln!(handle, "{name}: not in the index")?,
            }
        }
        Action::Names => {
            print_index(engine, |index| NameCharacterReport::from_index(index).to_string())?;
        }
    }

    Ok(())
}

/// Prints a report rendered from the open index.
fn print_index<A: Analyzer>(
    engine: &ScanEngine<RegistryClient, A>,
    render: impl Fn(&PackageIndex) -> String,
) -> color_eyre::Result<()> {
    let index = engine.index().ok_or_else(|| eyre!("package index is not open"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle)?;
    writeln!(handle, "{}", render(index))?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Resolve the action and configuration before touching the network
    let action = parse_action(cli.action.as_deref(), cli.name.as_deref())?;
    let config = build_config(&cli)?;
    let variant = ScanVariant::from(cli.variant);
    info!(variant = variant.label(), work_dir = %config.scan.work_dir, "Starting");

    let registry = RegistryClient::new(&config.scan.registry_url)?;

    // 5. Route to the variant's analyzer and report
    match variant {
        ScanVariant::ModuleSpec => {
            let analyzer = ImportClassifier::new(&config.classifier)?;
            let weights = config.report;
            let engine = ScanEngine::new(config.scan, registry, analyzer);
            execute(engine, &action, |index| {
                ModuleSpecReport::from_index(index, &weights).to_string()
            })
            .await
        }
        ScanVariant::ExportShape => {
            let analyzer = ExportShapeProbe::new(config.probe);
            let engine = ScanEngine::new(config.scan, registry, analyzer);
            execute(engine, &action, |index| {
                ExportShapeReport::from_index(index).to_string()
            })
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_core::ClassifierConfig;

    #[test]
    fn test_parse_action_defaults_to_one_package() {
        assert_eq!(parse_action(None, None).expect("action"), Action::Run(1));
        assert_eq!(parse_action(Some("25"), None).expect("action"), Action::Run(25));
    }

    #[test]
    fn test_parse_action_zero_runs_one() {
        assert_eq!(parse_action(Some("0"), None).expect("action"), Action::Run(1));
    }

    #[test]
    fn test_parse_action_keywords() {
        let cases = [
            ("skip", Action::Skip),
            ("reset!", Action::ResetAll),
            ("reset-parse-errors", Action::ResetParseErrors),
            ("report", Action::Report),
            ("names", Action::Names),
        ];
        for (word, expected) in cases {
            assert_eq!(parse_action(Some(word), None).expect("action"), expected);
        }
    }

    #[test]
    fn test_parse_action_query() {
        assert_eq!(
            parse_action(Some("query"), Some("@types/node")).expect("action"),
            Action::Query("@types/node".to_owned())
        );
        assert!(parse_action(Some("query"), None).is_err());
    }

    #[test]
    fn test_parse_action_rejects_garbage() {
        assert!(parse_action(Some("reset"), None).is_err());
        assert!(parse_action(Some("-3"), None).is_err());
        assert!(parse_action(Some("report"), Some("extra")).is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "modspec",
            "--variant",
            "export-shape",
            "--work-dir",
            "scratch",
            "-v",
            "report",
        ])
        .expect("cli");
        assert_eq!(cli.variant, VariantArg::ExportShape);
        assert_eq!(cli.action.as_deref(), Some("report"));
        assert!(cli.verbose);

        let config = build_config(&cli).expect("config");
        assert_eq!(config.scan.work_dir, "scratch");
        assert_eq!(config.scan.delay_ms, 500);
    }

    #[test]
    fn test_default_variant_config() {
        let cli = Cli::try_parse_from(["modspec"]).expect("cli");
        let config = build_config(&cli).expect("config");
        assert_eq!(config.scan.work_dir, "_work");
        assert_eq!(config.classifier, ClassifierConfig::default());
    }
}
