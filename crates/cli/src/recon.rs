//! `rgrid recon`: config-driven rule reconciliation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Subcommand, ValueEnum};
use tracing::debug;

use rulegrid_recon::amount::format_cents;
use rulegrid_recon::evaluate::decision_table;
use rulegrid_recon::model::Domain;
use rulegrid_recon::{
    load_csv_rows, CompositeConfig, CompositeResult, CompositeVerdict, ReconConfig, ReconInput,
    ReconResult, StepResult, StepStatus,
};

use crate::exit_codes::{
    EXIT_RECON_FLAGGED, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME, EXIT_RECON_WARN, EXIT_USAGE,
};
use crate::export::write_report_csv;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Exit codes: 0 all rows accepted, 1 high-severity flags, 60 medium flags or
rejected rows only, 61 invalid config, 62 runtime error.

Examples:
  rgrid recon run payroll.recon.toml
  rgrid recon run risk.recon.toml --json
  rgrid recon run risk.recon.toml --output result.json --csv rows.csv
  rgrid recon run month-end.composite.toml --fail-fast")]
    Run {
        /// Path to the .recon.toml or .composite.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one CSV line per row to file (single configs only)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Evaluate facts on all cores, overriding [engine] parallel
        #[arg(long)]
        parallel: bool,

        /// Stop on first step failure (composite configs only)
        #[arg(long)]
        fail_fast: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  rgrid recon validate payroll.recon.toml
  rgrid recon validate month-end.composite.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },

    /// Print the decision table a domain applies
    #[command(after_help = "\
Examples:
  rgrid recon explain risk
  rgrid recon explain payroll --config payroll.recon.toml")]
    Explain {
        domain: DomainArg,

        /// Take thresholds from this config's [rules] instead of defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DomainArg {
    Payroll,
    Risk,
    Compliance,
}

impl From<DomainArg> for Domain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Payroll => Domain::Payroll,
            DomainArg::Risk => Domain::Risk,
            DomainArg::Compliance => Domain::Compliance,
        }
    }
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, csv, parallel, fail_fast } => {
            let opts = RunOptions { json, output, csv, parallel, fail_fast };
            cmd_recon_run(config, opts)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
        ReconCommands::Explain { domain, config } => cmd_recon_explain(domain.into(), config),
    }
}

struct RunOptions {
    json: bool,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
    parallel: bool,
    fail_fast: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// Extract the `kind` field from a TOML string, defaulting to "recon".
fn extract_kind(config_str: &str) -> String {
    #[derive(serde::Deserialize)]
    struct KindHeader {
        #[serde(default = "default_kind")]
        kind: String,
    }
    fn default_kind() -> String {
        "recon".into()
    }

    toml::from_str::<KindHeader>(config_str)
        .map(|p| p.kind)
        .unwrap_or_else(|_| "recon".into())
}

fn read_config(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn parse_single(config_str: &str) -> Result<ReconConfig, CliError> {
    ReconConfig::from_toml(config_str).map_err(|e| {
        let mut err = recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string());
        err.hint =
            Some("run `rgrid recon explain <domain>` to see the tables each domain needs".into());
        err
    })
}

/// Load every configured table, resolving files against the config's directory.
fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let mut tables = HashMap::new();
    for (table_name, table_config) in &config.tables {
        let csv_path = base_dir.join(&table_config.file);
        let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
            recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", csv_path.display()))
        })?;
        let rows = load_csv_rows(table_name, &csv_data, table_config)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))?;
        debug!(table = %table_name, path = %csv_path.display(), rows = rows.len(), "table loaded");
        tables.insert(table_name.clone(), rows);
    }
    Ok(ReconInput { tables })
}

fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn emit_json<T: serde::Serialize>(
    value: &T,
    json: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        println!("{json_str}");
    }
    Ok(())
}

fn cmd_recon_run(config_path: PathBuf, opts: RunOptions) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;

    match extract_kind(&config_str).as_str() {
        "composite" => {
            if opts.csv.is_some() {
                return Err(recon_err(EXIT_USAGE, "--csv applies to single recon configs only"));
            }
            cmd_recon_run_composite(&config_path, &config_str, &opts)
        }
        "recon" => cmd_recon_run_single(&config_path, &config_str, &opts),
        other => Err(recon_err(
            EXIT_RECON_INVALID_CONFIG,
            format!("unknown config kind: \"{other}\" (expected \"recon\" or \"composite\")"),
        )),
    }
}

/// Override and run one parsed single-domain config.
fn run_parsed(
    config_path: &Path,
    mut config: ReconConfig,
    parallel: bool,
) -> Result<ReconResult, CliError> {
    if parallel {
        config.engine.parallel = true;
    }
    let input = load_input(&config, base_dir(config_path))?;
    rulegrid_recon::run(&config, &input).map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))
}

fn run_config(
    config_path: &Path,
    config_str: &str,
    parallel: bool,
) -> Result<ReconResult, CliError> {
    run_parsed(config_path, parse_single(config_str)?, parallel)
}

/// A command-line path wins; otherwise the config's `[output]` path,
/// resolved against the config's directory.
fn output_path(
    flag: Option<&PathBuf>,
    configured: Option<&String>,
    base: &Path,
) -> Option<PathBuf> {
    flag.cloned().or_else(|| configured.map(|file| base.join(file)))
}

fn cmd_recon_run_single(
    config_path: &Path,
    config_str: &str,
    opts: &RunOptions,
) -> Result<(), CliError> {
    let config = parse_single(config_str)?;
    let base = base_dir(config_path);
    let json_path = output_path(opts.output.as_ref(), config.output.json.as_ref(), base);
    let csv_path = output_path(opts.csv.as_ref(), config.output.csv.as_ref(), base);

    let result = run_parsed(config_path, config, opts.parallel)?;

    emit_json(&result, opts.json, json_path.as_deref())?;
    if let Some(ref path) = csv_path {
        write_report_csv(path, &result.report)?;
        eprintln!("wrote {}", path.display());
    }

    print_summary(&result);

    match StepStatus::from_report(&result.report) {
        StepStatus::Pass => Ok(()),
        StepStatus::Warn => {
            Err(recon_err(EXIT_RECON_WARN, "medium-severity flags or rejected rows"))
        }
        StepStatus::Fail | StepStatus::Error => {
            Err(recon_err(EXIT_RECON_FLAGGED, "high-severity flags found"))
        }
    }
}

fn print_summary(result: &ReconResult) {
    let s = &result.report.summary;
    eprintln!(
        "{} recon '{}': {} rows: {} accepted, {} flagged ({} high, {} medium), \
         {} rejected, {} excluded",
        result.meta.domain,
        result.meta.config_name,
        s.input_rows,
        s.accepted,
        s.flagged,
        s.flagged_high,
        s.flagged_medium,
        s.rejected_verdicts,
        s.excluded,
    );
    if s.accepted_total_cents != 0 {
        eprintln!("accepted total: {}", format_cents(s.accepted_total_cents));
    }
    let unmatched = &result.report.unmatched_references;
    if !unmatched.is_empty() {
        eprintln!("{} reference row(s) match no fact row", unmatched.len());
    }
}

fn cmd_recon_run_composite(
    config_path: &Path,
    config_str: &str,
    opts: &RunOptions,
) -> Result<(), CliError> {
    let composite = CompositeConfig::from_toml(config_str)
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string()))?;

    let base = base_dir(config_path);
    let mut steps: Vec<StepResult> = Vec::with_capacity(composite.steps.len());

    for step in &composite.steps {
        let step_config_path = base.join(&step.config);
        let start = Instant::now();

        let step_result = read_config(&step_config_path)
            .and_then(|child_str| run_config(&step_config_path, &child_str, opts.parallel));

        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, result, error) = match step_result {
            Ok(result) => (StepStatus::from_report(&result.report), Some(result), None),
            Err(err) => (StepStatus::Error, None, Some(err.message)),
        };

        match &error {
            Some(msg) => eprintln!("  step '{}': error: {msg}", step.name),
            None => eprintln!("  step '{}': {status} ({duration_ms}ms)", step.name),
        }

        steps.push(StepResult {
            name: step.name.clone(),
            status,
            duration_ms,
            config_path: step.config.clone(),
            result,
            error,
        });

        if opts.fail_fast && matches!(status, StepStatus::Fail | StepStatus::Error) {
            eprintln!("  --fail-fast: stopping after '{}'", step.name);
            break;
        }
    }

    let verdict = CompositeVerdict::from_steps(&steps);
    let exit_code = verdict.exit_code();

    let composite_result = CompositeResult {
        name: composite.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        verdict,
        exit_code,
        steps,
    };

    emit_json(&composite_result, opts.json, opts.output.as_deref())?;

    eprintln!(
        "composite '{}': {} step(s), verdict: {}",
        composite.name,
        composite_result.steps.len(),
        composite_result.verdict,
    );

    match verdict {
        CompositeVerdict::Pass => Ok(()),
        other => Err(recon_err(exit_code, format!("composite verdict: {other}"))),
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;

    match extract_kind(&config_str).as_str() {
        "composite" => {
            let config = CompositeConfig::from_toml(&config_str)
                .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string()))?;
            eprintln!("valid: composite '{}' with {} step(s)", config.name, config.steps.len());
            Ok(())
        }
        _ => {
            let config = parse_single(&config_str)?;
            let mut tables: Vec<&str> = config.tables.keys().map(String::as_str).collect();
            tables.sort_unstable();
            eprintln!(
                "valid: {} recon '{}' with {} table(s): {}",
                config.domain,
                config.name,
                tables.len(),
                tables.join(", "),
            );
            Ok(())
        }
    }
}

fn cmd_recon_explain(domain: Domain, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let rules = match config_path {
        Some(path) => {
            let config = parse_single(&read_config(&path)?)?;
            if config.domain != domain {
                return Err(recon_err(
                    EXIT_USAGE,
                    format!("{} is a {} config, not {domain}", path.display(), config.domain),
                ));
            }
            config.rules
        }
        None => Default::default(),
    };

    println!("{domain}: fact table '{}', keyed by {}", domain.fact_table(), domain.key_column());
    for line in decision_table(domain, &rules) {
        println!("  {line}");
    }
    Ok(())
}
