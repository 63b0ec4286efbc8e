use solmutator::classify::classify_output;
use solmutator::discover::discover_sources;
use solmutator::guard;
use solmutator::logging;
use solmutator::output;
use solmutator::render::{self, ReportWriter};
use solmutator::verifier::MAX_TIMEOUT;
use solmutator::{
    CommandVerifier, Coordinator, MutationConfig, RuleSet, RunSummary, Verdict, Verifier,
    VerifierError,
};

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

const EXIT_OK: i32 = 0;
const EXIT_SURVIVORS: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_VERIFIER_MISSING: i32 = 3;
const EXIT_BASELINE: i32 = 4;
const EXIT_FATAL: i32 = 5;
const EXIT_INTEGRITY: i32 = 6;
const EXIT_INTERRUPTED: i32 = 130;

/// The unmutated run includes a cold compile, so it gets a generous bound.
const BASELINE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Parser)]
#[command(name = "solmutator", version, about = "Mutation testing for Solidity projects")]
struct Cli {
    /// Project root (the verifier runs here)
    project: PathBuf,
    /// Directory under the project root scanned for .sol files
    #[arg(long, default_value = "src")]
    src: PathBuf,
    /// Where markdown and JSON reports are written
    #[arg(long, default_value = "mutation_reports")]
    report_dir: PathBuf,
    /// Test command run for every mutant
    #[arg(long, env = "SOLMUTATOR_TEST_CMD", default_value = "forge test")]
    test_cmd: String,
    /// Fixed per-mutant timeout in seconds (default: derived from the baseline run)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT.as_secs()))]
    timeout_secs: Option<u64>,
    /// Baseline duration multiplier for the derived timeout (1 to 1000)
    #[arg(long, default_value = "3", value_parser = parse_multiplier)]
    timeout_mult: f64,
    /// Worker threads (default: number of CPUs)
    #[arg(short, long, env = "SOLMUTATOR_JOBS")]
    jobs: Option<usize>,
    /// JSON file with a custom rule list: [{"original": "+", "mutant": "-"}, ...]
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Test each file in its own temporary copy of the project
    #[arg(long)]
    isolated: bool,
    /// Skip the unmutated test run
    #[arg(long)]
    skip_baseline: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
    /// No output, exit code only
    #[arg(short, long)]
    quiet: bool,
    /// More diagnostics on stderr (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_multiplier(value: &str) -> Result<f64, String> {
    let mult: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if mult.is_finite() && (1.0..=1000.0).contains(&mult) {
        Ok(mult)
    } else {
        Err("must be a number between 1 and 1000".to_string())
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let project_dir = match cli.project.canonicalize() {
        Ok(p) if p.is_dir() => p,
        _ => {
            output::print_error(&format!(
                "Project directory not found: {}. Pass the project root.",
                cli.project.display()
            ));
            return EXIT_USAGE;
        }
    };

    let rules = match &cli.rules {
        Some(path) => match RuleSet::from_json_file(path) {
            Ok(rules) => rules,
            Err(e) => {
                output::print_error(&e.to_string());
                return EXIT_USAGE;
            }
        },
        None => RuleSet::default(),
    };

    let mut config = MutationConfig::default()
        .with_project_dir(&project_dir)
        .with_source_dir(&cli.src)
        .with_test_cmd(&cli.test_cmd)
        .with_timeout_mult(cli.timeout_mult)
        .with_isolated(cli.isolated)
        .with_rules(rules);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(jobs) = cli.jobs {
        config = config.with_jobs(jobs);
    }

    let sources_root = config.sources_root();
    if !sources_root.is_dir() {
        output::print_error(&format!(
            "Source directory not found: {}. Use --src to point at your contracts.",
            sources_root.display()
        ));
        return EXIT_USAGE;
    }
    let sources = match discover_sources(&sources_root) {
        Ok(sources) => sources,
        Err(e) => {
            output::print_error(&e.to_string());
            return EXIT_FATAL;
        }
    };
    if sources.is_empty() {
        output::print_error(&format!("No Solidity files found in {}", sources_root.display()));
        return EXIT_USAGE;
    }
    info!(count = sources.len(), root = %sources_root.display(), "sources discovered");

    recover_interrupted(&sources);

    let writer = match ReportWriter::new(&cli.report_dir) {
        Ok(writer) => writer,
        Err(e) => {
            output::print_error(&e.to_string());
            return EXIT_FATAL;
        }
    };
    let report_dir = writer
        .dir()
        .canonicalize()
        .unwrap_or_else(|_| writer.dir().to_path_buf());
    config = config.with_report_dir(report_dir);

    let verifier = match CommandVerifier::from_command(&config.test_cmd) {
        Ok(v) => v.with_output_limit(config.output_limit),
        Err(e) => {
            output::print_error(&e.to_string());
            return EXIT_VERIFIER_MISSING;
        }
    };
    if let Err(e) = verifier.check_available() {
        output::print_error(&e.to_string());
        return EXIT_VERIFIER_MISSING;
    }

    let baseline = if cli.skip_baseline {
        None
    } else {
        match run_baseline(&verifier, &project_dir, config.timeout) {
            Ok(duration) => Some(duration),
            Err(code) => return code,
        }
    };
    let timeout = config.mutant_timeout(baseline);
    info!(timeout_secs = timeout.as_secs_f64(), "per-mutant timeout");

    let coordinator = match Coordinator::new(&config, verifier.with_timeout(timeout)) {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&e.to_string());
            return EXIT_FATAL;
        }
    };
    let cancel = coordinator.cancel_flag();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.cancel()) {
        warn!(err = %e, "could not install interrupt handler");
    }

    let runs = coordinator.process_files(&sources);

    let verbose_output = !cli.quiet && !cli.json;
    let mut reports = Vec::with_capacity(runs.len());
    let mut integrity_ok = true;
    for file_run in &runs {
        if verbose_output {
            output::print_file_run(file_run);
        }
        match &file_run.result {
            Ok(unit) => {
                if !verbose_output {
                    // Restore problems are reported even in quiet/json mode.
                    for failure in &unit.restore_failures {
                        output::print_error(&failure.error.to_string());
                    }
                }
                if !unit.intact {
                    integrity_ok = false;
                    output::print_error(&format!(
                        "{} may still contain a mutant. Original text is in {}",
                        file_run.path.display(),
                        guard::backup_path(&file_run.path).display()
                    ));
                }
                if let Err(e) = writer.write_contract(&unit.report) {
                    output::print_error(&e.to_string());
                }
                reports.push(unit.report.clone());
            }
            Err(e) if !verbose_output => output::print_error(&format!("{}: {}", file_run.name, e)),
            Err(_) => {}
        }
    }

    let summary = RunSummary::merge(&reports);
    if let Err(e) = writer.write_summary(&summary, &reports) {
        output::print_error(&e.to_string());
    }

    if cli.json {
        println!("{}", render::render_summary_json(&summary, &reports));
    } else if !cli.quiet {
        output::print_summary(&summary);
        output::print_success(&format!("Reports written to {}", writer.dir().display()));
    }

    if !integrity_ok {
        EXIT_INTEGRITY
    } else if cancel.is_cancelled() {
        if !cli.quiet {
            output::print_warning("Interrupted; reports cover completed mutants only.");
        }
        EXIT_INTERRUPTED
    } else if summary.survived_count > 0 {
        EXIT_SURVIVORS
    } else {
        EXIT_OK
    }
}

/// Put back sources left mutated by a run that was killed mid-test.
fn recover_interrupted(sources: &[PathBuf]) {
    for source in sources {
        let Some(bak_path) = guard::check_interrupted_run(source) else {
            continue;
        };
        match guard::restore_from_backup(source, &bak_path) {
            Ok(()) => output::print_warning(&format!(
                "Recovered {} from a previously interrupted run.",
                source.display()
            )),
            Err(e) => output::print_error(&e.to_string()),
        }
    }
}

/// Run the unmutated suite once. Every suite must pass; the duration feeds
/// the per-mutant timeout.
fn run_baseline(
    verifier: &CommandVerifier,
    project_dir: &Path,
    explicit: Option<Duration>,
) -> Result<Duration, i32> {
    let timeout = explicit.map_or(BASELINE_TIMEOUT, |t| t.max(BASELINE_TIMEOUT));
    let output = verifier
        .clone()
        .with_timeout(timeout)
        .run(project_dir)
        .map_err(|e| {
            output::print_error(&format!("Baseline test run failed to start: {e}"));
            match e {
                VerifierError::Missing(_) => EXIT_VERIFIER_MISSING,
                _ => EXIT_BASELINE,
            }
        })?;

    // "Survived" here just means every suite passed.
    match classify_output(&output) {
        (Verdict::Survived, _) => {
            info!(elapsed_ms = output.duration.as_millis() as u64, "baseline passed");
            Ok(output.duration)
        }
        (Verdict::Killed, _) => {
            output::print_error(&format!(
                "Tests fail before mutation. Fix failing tests first.\n{}",
                tail(&output.text, 20)
            ));
            Err(EXIT_BASELINE)
        }
        (Verdict::Unknown, note) => {
            output::print_error(&format!(
                "Baseline test run produced no test summary ({}).\n{}",
                note.unwrap_or_default(),
                tail(&output.text, 20)
            ));
            Err(EXIT_BASELINE)
        }
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
