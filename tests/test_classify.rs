use std::time::Duration;

use solmutator::classify::{classify, classify_output, parse_suite_results, SuiteTally};
use solmutator::{Verdict, VerifierOutput};

const FORGE_PASS: &str = "\
Ran 3 tests for test/Token.t.sol:TokenTest
[PASS] test_add() (gas: 1234)
[PASS] test_sub() (gas: 1200)
[PASS] test_owner() (gas: 900)
Suite result: ok. 3 passed; 0 failed; 0 skipped; finished in 1.20ms (500.00µs CPU time)
";

const FORGE_FAIL: &str = "\
Ran 3 tests for test/Token.t.sol:TokenTest
[PASS] test_add() (gas: 1234)
[FAIL. Reason: assertion failed] test_sub() (gas: 1200)
Suite result: FAILED. 2 passed; 1 failed; 0 skipped; finished in 1.20ms (500.00µs CPU time)
";

fn output(text: &str, exit_code: Option<i32>) -> VerifierOutput {
    VerifierOutput {
        text: text.to_string(),
        exit_code,
        timed_out: false,
        duration: Duration::from_millis(1200),
    }
}

#[test]
fn all_passing_suite_means_survived() {
    assert_eq!(classify("Suite result: 3 passed; 0 failed;"), Verdict::Survived);
    assert_eq!(classify(FORGE_PASS), Verdict::Survived);
}

#[test]
fn failing_suite_means_killed() {
    assert_eq!(classify(FORGE_FAIL), Verdict::Killed);
}

#[test]
fn missing_summary_means_unknown() {
    assert_eq!(classify(""), Verdict::Unknown);
    assert_eq!(
        classify("Error (2314): Expected ';' but got identifier\nCompiler run failed"),
        Verdict::Unknown
    );
}

#[test]
fn any_failing_suite_kills_across_several() {
    let text = format!("{FORGE_PASS}\n{FORGE_FAIL}\n{FORGE_PASS}");
    assert_eq!(
        parse_suite_results(&text),
        vec![
            SuiteTally { passed: 3, failed: 0 },
            SuiteTally { passed: 2, failed: 1 },
            SuiteTally { passed: 3, failed: 0 },
        ]
    );
    assert_eq!(classify(&text), Verdict::Killed);
}

#[test]
fn multi_digit_counts_are_read_whole() {
    let tallies = parse_suite_results("Suite result: ok. 128 passed; 10 failed; 0 skipped;");
    assert_eq!(tallies, vec![SuiteTally { passed: 128, failed: 10 }]);
}

#[test]
fn timeout_is_unknown_with_note() {
    let mut out = output(FORGE_PASS, None);
    out.timed_out = true;
    let (verdict, note) = classify_output(&out);
    assert_eq!(verdict, Verdict::Unknown);
    assert!(note.unwrap().contains("timed out"));
}

#[test]
fn compile_error_notes_exit_code() {
    let (verdict, note) = classify_output(&output("Compiler run failed", Some(1)));
    assert_eq!(verdict, Verdict::Unknown);
    assert!(note.unwrap().contains("exit code 1"));
}

#[test]
fn decided_verdicts_carry_no_note() {
    assert_eq!(classify_output(&output(FORGE_FAIL, Some(1))), (Verdict::Killed, None));
    assert_eq!(classify_output(&output(FORGE_PASS, Some(0))), (Verdict::Survived, None));
}
