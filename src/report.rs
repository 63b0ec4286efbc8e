use serde::{Deserialize, Serialize};

use crate::mutants::{MutantOutcome, Verdict};

/// Per-file result. Counts are only meaningful after [`finalize`](Self::finalize).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractMutationReport {
    pub file_name: String,
    pub total_mutants: usize,
    pub killed_count: usize,
    pub survived_count: usize,
    pub unknown_count: usize,
    pub outcomes: Vec<MutantOutcome>,
}

impl ContractMutationReport {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, outcome: MutantOutcome) {
        self.outcomes.push(outcome);
    }

    /// Recompute counts from the outcome list and order details by candidate id.
    pub fn finalize(&mut self) {
        self.outcomes.sort_by_key(|o| o.candidate.id);
        self.total_mutants = self.outcomes.len();
        self.killed_count = self.count(Verdict::Killed);
        self.survived_count = self.count(Verdict::Survived);
        self.unknown_count = self.count(Verdict::Unknown);
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.outcomes.iter().filter(|o| o.verdict == verdict).count()
    }

    /// Killed over decided (killed + survived). `None` when nothing was decided.
    pub fn mutation_score(&self) -> Option<f64> {
        score(self.killed_count, self.survived_count)
    }

    pub fn survivors(&self) -> impl Iterator<Item = &MutantOutcome> {
        self.outcomes.iter().filter(|o| o.verdict == Verdict::Survived)
    }
}

/// Run-wide totals over contracts that had at least one mutant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub analyzed_contracts: usize,
    pub total_mutants: usize,
    pub killed_count: usize,
    pub survived_count: usize,
    pub unknown_count: usize,
}

impl RunSummary {
    pub fn merge(reports: &[ContractMutationReport]) -> Self {
        reports
            .iter()
            .filter(|r| r.total_mutants > 0)
            .fold(Self::default(), |mut acc, r| {
                acc.analyzed_contracts += 1;
                acc.total_mutants += r.total_mutants;
                acc.killed_count += r.killed_count;
                acc.survived_count += r.survived_count;
                acc.unknown_count += r.unknown_count;
                acc
            })
    }

    pub fn mutation_score(&self) -> Option<f64> {
        score(self.killed_count, self.survived_count)
    }
}

fn score(killed: usize, survived: usize) -> Option<f64> {
    let decided = killed + survived;
    if decided == 0 {
        None
    } else {
        Some(killed as f64 / decided as f64)
    }
}
