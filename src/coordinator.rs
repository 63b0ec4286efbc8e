//! Fork-join execution of mutants. Files run in parallel on the worker pool;
//! the candidates of one file share its on-disk path, so they run one after
//! another on that file's worker under the per-path guard.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::classify::classify_output;
use crate::config::MutationConfig;
use crate::discover::{copy_project, display_name};
use crate::error::MutationError;
use crate::generator::{apply_candidate, generate, generate_diff};
use crate::guard::{self, FileLocks, FileSwap};
use crate::mutants::{MutantOutcome, MutationCandidate, SourceUnit, Verdict};
use crate::report::ContractMutationReport;
use crate::rules::RuleSet;
use crate::verifier::Verifier;

/// Shared stop request. Candidates that have not started yet are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A candidate that produced no outcome, or whose cleanup failed.
#[derive(Debug)]
pub struct CandidateFailure {
    pub candidate: MutationCandidate,
    pub error: MutationError,
}

/// Everything processing one file produced.
#[derive(Debug)]
pub struct UnitRun {
    pub report: ContractMutationReport,
    /// Mutant could not be written; no outcome recorded.
    pub abandoned: Vec<CandidateFailure>,
    /// Verifier ran, but the original text could not be written back afterwards.
    pub restore_failures: Vec<CandidateFailure>,
    /// Not started because of cancellation.
    pub skipped: usize,
    /// The file holds its original text after processing.
    pub intact: bool,
}

impl UnitRun {
    fn empty(report: ContractMutationReport) -> Self {
        Self {
            report,
            abandoned: Vec::new(),
            restore_failures: Vec::new(),
            skipped: 0,
            intact: true,
        }
    }
}

/// Result for one discovered path.
#[derive(Debug)]
pub struct FileRun {
    pub path: PathBuf,
    pub name: String,
    pub result: Result<UnitRun, MutationError>,
}

enum CandidateRun {
    Finished {
        outcome: MutantOutcome,
        restore_error: Option<MutationError>,
    },
    Abandoned(CandidateFailure),
    Skipped,
}

pub struct Coordinator<V> {
    rules: RuleSet,
    project_dir: PathBuf,
    sources_root: PathBuf,
    report_dir: PathBuf,
    isolated: bool,
    session: String,
    verifier: V,
    locks: FileLocks,
    pool: rayon::ThreadPool,
    cancel: CancelFlag,
}

impl<V: Verifier> Coordinator<V> {
    pub fn new(config: &MutationConfig, verifier: V) -> Result<Self, MutationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs.max(1))
            .thread_name(|i| format!("solmutator-{i}"))
            .build()?;
        Ok(Self {
            rules: config.rules.clone(),
            project_dir: config.project_dir.clone(),
            sources_root: config.sources_root(),
            report_dir: config.report_dir.clone(),
            isolated: config.isolated,
            session: format!("{:08x}", fastrand::u32(..)),
            verifier,
            locks: FileLocks::new(),
            pool,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every path concurrently. Per-file errors stay in their `FileRun`.
    pub fn process_files(&self, paths: &[PathBuf]) -> Vec<FileRun> {
        self.pool
            .install(|| paths.par_iter().map(|path| self.process_file(path)).collect())
    }

    fn process_file(&self, path: &Path) -> FileRun {
        let name = display_name(&self.sources_root, path);
        let result = if self.isolated {
            self.process_isolated(path, &name)
        } else {
            SourceUnit::load(path, name.clone()).map(|unit| self.process_unit(&unit, &self.project_dir))
        };
        if let Err(e) = &result {
            warn!(file = %name, err = %e, "file skipped");
        }
        FileRun {
            path: path.to_path_buf(),
            name,
            result,
        }
    }

    fn process_isolated(&self, path: &Path, name: &str) -> Result<UnitRun, MutationError> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("solmutator-{}-", self.session))
            .tempdir()
            .map_err(|source| MutationError::Copy {
                path: std::env::temp_dir(),
                source,
            })?;
        let copied = copy_project(&self.project_dir, path, temp_dir.path(), Some(&self.report_dir))?;
        debug!(file = %name, copy = %temp_dir.path().display(), "project copied");
        let unit = SourceUnit::load(&copied, name)?;
        Ok(self.process_unit(&unit, temp_dir.path()))
    }

    /// Run every candidate of `unit` with the verifier working in `project_dir`.
    #[instrument(skip_all, fields(file = %unit.name()))]
    pub fn process_unit(&self, unit: &SourceUnit, project_dir: &Path) -> UnitRun {
        let mut report = ContractMutationReport::new(unit.name());
        let candidates = generate(unit, &self.rules);
        if candidates.is_empty() {
            debug!("no mutation candidates");
            return UnitRun::empty(report);
        }
        info!(candidates = candidates.len(), "testing mutants");

        // Candidates share one path; they run in order on this file's worker.
        let lock = self.locks.lock_for(unit.path());
        let runs: Vec<CandidateRun> = candidates
            .iter()
            .map(|candidate| self.run_candidate(unit, project_dir, &lock, candidate))
            .collect();

        let mut unit_run = UnitRun::empty(ContractMutationReport::default());
        for run in runs {
            match run {
                CandidateRun::Finished {
                    outcome,
                    restore_error,
                } => {
                    if let Some(error) = restore_error {
                        unit_run.restore_failures.push(CandidateFailure {
                            candidate: outcome.candidate.clone(),
                            error,
                        });
                    }
                    report.push(outcome);
                }
                CandidateRun::Abandoned(failure) => unit_run.abandoned.push(failure),
                CandidateRun::Skipped => unit_run.skipped += 1,
            }
        }
        report.finalize();
        unit_run.report = report;
        unit_run.intact = ensure_intact(unit, &lock);

        info!(
            total = unit_run.report.total_mutants,
            killed = unit_run.report.killed_count,
            survived = unit_run.report.survived_count,
            unknown = unit_run.report.unknown_count,
            abandoned = unit_run.abandoned.len(),
            skipped = unit_run.skipped,
            "file finished"
        );
        unit_run
    }

    fn run_candidate(
        &self,
        unit: &SourceUnit,
        project_dir: &Path,
        lock: &Mutex<()>,
        candidate: &MutationCandidate,
    ) -> CandidateRun {
        let mutated = apply_candidate(unit.original(), candidate);

        let held = guard::lock_path(lock);
        if self.cancel.is_cancelled() {
            return CandidateRun::Skipped;
        }
        let mut swap = match FileSwap::swap_in(held, unit.path(), unit.original(), &mutated) {
            Ok(swap) => swap,
            Err(error) => {
                if error.is_restore_failure() {
                    error!(mutant = candidate.id, err = %error, "mutant write failed and original could not be restored");
                } else {
                    warn!(mutant = candidate.id, err = %error, "mutant abandoned");
                }
                return CandidateRun::Abandoned(CandidateFailure {
                    candidate: candidate.clone(),
                    error,
                });
            }
        };
        let run = self.verifier.run(project_dir);
        let restore_error = swap.restore().err();
        drop(swap);

        if let Some(error) = &restore_error {
            error!(mutant = candidate.id, err = %error, "original source was not restored");
        }

        let (verdict, note, duration_ms) = match &run {
            Ok(output) => {
                let (verdict, note) = classify_output(output);
                (verdict, note, output.duration.as_millis() as u64)
            }
            Err(e) => {
                warn!(mutant = candidate.id, err = %e, "verifier did not run");
                (Verdict::Unknown, Some(e.to_string()), 0)
            }
        };
        debug!(mutant = candidate.id, line = candidate.line_number(), verdict = verdict.label(), "mutant classified");

        CandidateRun::Finished {
            outcome: MutantOutcome {
                candidate: candidate.clone(),
                verdict,
                duration_ms,
                note,
                diff: generate_diff(unit.original(), &mutated),
            },
            restore_error,
        }
    }
}

/// Compare the file with its original under the path lock and rewrite it
/// once if they differ.
fn ensure_intact(unit: &SourceUnit, lock: &Mutex<()>) -> bool {
    let _held = guard::lock_path(lock);
    if fs::read_to_string(unit.path()).is_ok_and(|current| current == unit.original()) {
        return true;
    }
    warn!(path = %unit.path().display(), "source differs from original after run, rewriting");
    match fs::write(unit.path(), unit.original()) {
        Ok(()) => {
            let _ = fs::remove_file(guard::backup_path(unit.path()));
            true
        }
        Err(e) => {
            error!(path = %unit.path().display(), err = %e, "SOURCE FILE LEFT MODIFIED");
            false
        }
    }
}
