use solmutator::rules::MutationRule;
use solmutator::{ContractMutationReport, MutantOutcome, MutationCandidate, RunSummary, Verdict};

fn outcome(id: usize, verdict: Verdict) -> MutantOutcome {
    MutantOutcome {
        candidate: MutationCandidate {
            id,
            line_index: id,
            original_line: "a + b".to_string(),
            mutated_line: "a - b".to_string(),
            rule: MutationRule::new("+", "-"),
        },
        verdict,
        duration_ms: 10,
        note: None,
        diff: String::new(),
    }
}

fn report(name: &str, verdicts: &[Verdict]) -> ContractMutationReport {
    let mut report = ContractMutationReport::new(name);
    for (i, verdict) in verdicts.iter().enumerate() {
        report.push(outcome(i + 1, *verdict));
    }
    report.finalize();
    report
}

#[test]
fn finalize_counts_and_orders_outcomes() {
    let mut r = ContractMutationReport::new("Token.sol");
    r.push(outcome(3, Verdict::Unknown));
    r.push(outcome(1, Verdict::Killed));
    r.push(outcome(2, Verdict::Survived));
    r.finalize();

    assert_eq!(r.total_mutants, 3);
    assert_eq!((r.killed_count, r.survived_count, r.unknown_count), (1, 1, 1));
    let ids: Vec<usize> = r.outcomes.iter().map(|o| o.candidate.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(r.survivors().count(), 1);
}

#[test]
fn counts_always_sum_to_total() {
    let r = report("A.sol", &[Verdict::Killed, Verdict::Killed, Verdict::Unknown, Verdict::Survived]);
    assert_eq!(r.killed_count + r.survived_count + r.unknown_count, r.total_mutants);
}

#[test]
fn score_ignores_unknown() {
    let r = report("A.sol", &[Verdict::Killed, Verdict::Survived, Verdict::Unknown]);
    assert_eq!(r.mutation_score(), Some(0.5));

    let undecided = report("B.sol", &[Verdict::Unknown]);
    assert_eq!(undecided.mutation_score(), None);
}

#[test]
fn merge_skips_contracts_without_mutants() {
    let a = report("A.sol", &[Verdict::Killed, Verdict::Killed, Verdict::Survived]);
    let empty = report("Empty.sol", &[]);
    let b = report("B.sol", &[Verdict::Killed, Verdict::Killed]);

    let summary = RunSummary::merge(&[a, empty, b]);
    assert_eq!(
        summary,
        RunSummary {
            analyzed_contracts: 2,
            total_mutants: 5,
            killed_count: 4,
            survived_count: 1,
            unknown_count: 0,
        }
    );
    assert_eq!(summary.mutation_score(), Some(0.8));
}

#[test]
fn merge_of_nothing_is_zero() {
    let summary = RunSummary::merge(&[]);
    assert_eq!(summary, RunSummary::default());
    assert_eq!(summary.mutation_score(), None);
}
