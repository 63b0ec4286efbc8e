use std::sync::LazyLock;

use regex::Regex;

use crate::mutants::Verdict;
use crate::verifier::VerifierOutput;

static SUITE_RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Suite result:.*?(\d+) passed; (\d+) failed;").expect("suite result pattern")
});

/// Pass/fail counts from one `Suite result:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteTally {
    pub passed: u64,
    pub failed: u64,
}

/// Every suite summary line in the output, in order. Lines whose counts do
/// not fit in a `u64` are ignored.
pub fn parse_suite_results(output: &str) -> Vec<SuiteTally> {
    SUITE_RESULT_RE
        .captures_iter(output)
        .filter_map(|caps| {
            Some(SuiteTally {
                passed: caps[1].parse().ok()?,
                failed: caps[2].parse().ok()?,
            })
        })
        .collect()
}

/// Any failing suite kills the mutant; all suites green means it survived;
/// no summary at all is `Unknown`.
pub fn classify(output: &str) -> Verdict {
    let tallies = parse_suite_results(output);
    if tallies.is_empty() {
        Verdict::Unknown
    } else if tallies.iter().any(|t| t.failed > 0) {
        Verdict::Killed
    } else {
        Verdict::Survived
    }
}

/// Verdict for a whole run, plus a note explaining an `Unknown`.
pub fn classify_output(output: &VerifierOutput) -> (Verdict, Option<String>) {
    if output.timed_out {
        return (
            Verdict::Unknown,
            Some(format!("timed out after {:.1}s", output.duration.as_secs_f64())),
        );
    }
    match classify(&output.text) {
        Verdict::Unknown => {
            let note = match output.exit_code {
                Some(code) => format!("no test summary in output (exit code {code})"),
                None => "no test summary in output (terminated by signal)".to_string(),
            };
            (Verdict::Unknown, Some(note))
        }
        verdict => (verdict, None),
    }
}
