use similar::TextDiff;

use crate::mutants::{MutationCandidate, SourceUnit};
use crate::rules::{RuleSet, scan_line};

/// Enumerate every single-token mutant of `unit`.
///
/// Lines are split on `\n` so a candidate applied back onto the text keeps
/// every other byte (including `\r`) intact. Each rule is tried against the
/// untouched line and replaces only its first occurrence in code; comments
/// and string literals are never touched, and lines inside a `/* */` block
/// are skipped. Candidates never build on one another.
pub fn generate(unit: &SourceUnit, rules: &RuleSet) -> Vec<MutationCandidate> {
    let mut candidates = Vec::new();
    if unit.original().is_empty() {
        return candidates;
    }

    let mut in_block_comment = false;
    for (line_index, line) in unit.original().split('\n').enumerate() {
        let starts_in_block = in_block_comment;
        let scan = scan_line(line, in_block_comment);
        in_block_comment = scan.ends_in_block_comment();
        if starts_in_block || !rules.is_eligible(line) {
            continue;
        }
        for rule in rules.rules() {
            let Some(at) = scan.find(line, &rule.original) else {
                continue;
            };
            let mut mutated_line = line.to_string();
            mutated_line.replace_range(at..at + rule.original.len(), &rule.mutant);
            candidates.push(MutationCandidate {
                id: candidates.len() + 1,
                line_index,
                original_line: line.to_string(),
                mutated_line,
                rule: rule.clone(),
            });
        }
    }

    candidates
}

/// Full text of `original` with the candidate's line swapped in.
pub fn apply_candidate(original: &str, candidate: &MutationCandidate) -> String {
    let mut result = String::with_capacity(original.len() + candidate.mutated_line.len());
    for (index, line) in original.split('\n').enumerate() {
        if index > 0 {
            result.push('\n');
        }
        if index == candidate.line_index {
            result.push_str(&candidate.mutated_line);
        } else {
            result.push_str(line);
        }
    }
    result
}

/// Unified diff with two lines of context, for reports.
pub fn generate_diff(original: &str, mutated: &str) -> String {
    let diff = TextDiff::from_lines(original, mutated);
    let mut unified = diff.unified_diff();
    unified.context_radius(2);
    unified.to_string()
}
