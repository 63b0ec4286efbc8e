use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const VAULT: &str = "\
// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

contract Vault {
    function deposit(uint a, uint b) public pure returns (uint) {
        return a + b;
    }

    function isLarge(uint x) public pure returns (bool) {
        return x > 100;
    }

    function both(bool p, bool q) public pure returns (bool) {
        return p && q;
    }
}
";

/// Stand-in for `forge`: fails a test whenever `src/Vault.sol` contains any
/// of the given snippets.
#[cfg(unix)]
fn fake_forge(dir: &Path, killing: &[&str]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let mut body = String::from(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'forge 0.2.0'; exit 0; fi\n",
    );
    for snippet in killing {
        body.push_str(&format!(
            "if grep -qF '{snippet}' src/Vault.sol; then \
             echo 'Suite result: FAILED. 2 passed; 1 failed; 0 skipped;'; exit 1; fi\n"
        ));
    }
    body.push_str("echo 'Suite result: ok. 3 passed; 0 failed; 0 skipped; finished in 1ms'\n");
    let path = dir.join("forge");
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn create_project(dir: &Path) {
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::create_dir_all(dir.join("test")).unwrap();
    fs::write(dir.join("src/Vault.sol"), VAULT).unwrap();
    fs::write(dir.join("test/Vault.t.sol"), "contract VaultTest {}\n").unwrap();
    fs::write(dir.join("foundry.toml"), "[profile.default]\n").unwrap();
}

fn solmutator(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_solmutator"))
        .arg(project)
        .args(args)
        .current_dir(project)
        .env_remove("SOLMUTATOR_TEST_CMD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run solmutator")
}

fn json_of(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "Invalid JSON: {e}\nstdout: {stdout}\nstderr: {}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

#[cfg(unix)]
#[test]
fn e2e_survivors_json_and_reports() {
    let project = tempfile::TempDir::new().unwrap();
    let bin = tempfile::TempDir::new().unwrap();
    create_project(project.path());
    let forge = fake_forge(bin.path(), &["a - b"]);

    let output = solmutator(
        project.path(),
        &["--test-cmd", &format!("{} test", forge.display()), "--json", "-j", "2"],
    );

    assert_eq!(output.status.code(), Some(1), "survivors exit with 1");
    let result = json_of(&output);
    assert_eq!(result["summary"]["analyzed_contracts"], 1);
    assert_eq!(result["summary"]["total_mutants"], 3);
    assert_eq!(result["summary"]["killed_count"], 1);
    assert_eq!(result["summary"]["survived_count"], 2);

    let reports = project.path().join("mutation_reports");
    assert!(reports.join("Vault_mutation_report.md").exists());
    assert!(reports.join("mutation_testing_summary.md").exists());
    assert!(reports.join("mutation_summary.json").exists());

    // Test files are never mutated; sources are left as they were.
    assert_eq!(fs::read_to_string(project.path().join("src/Vault.sol")).unwrap(), VAULT);
    assert!(!project.path().join("src/.Vault.sol.mutator.bak").exists());
}

#[cfg(unix)]
#[test]
fn e2e_all_killed_exits_zero() {
    let project = tempfile::TempDir::new().unwrap();
    let bin = tempfile::TempDir::new().unwrap();
    create_project(project.path());
    let forge = fake_forge(bin.path(), &["a - b", "x < 100", "p || q"]);

    let output = solmutator(
        project.path(),
        &["--test-cmd", &forge.to_string_lossy(), "--isolated", "-q"],
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty(), "quiet mode prints nothing");
    assert_eq!(fs::read_to_string(project.path().join("src/Vault.sol")).unwrap(), VAULT);
}

#[cfg(unix)]
#[test]
fn e2e_failing_baseline_aborts_before_mutating() {
    let project = tempfile::TempDir::new().unwrap();
    let bin = tempfile::TempDir::new().unwrap();
    create_project(project.path());
    // "a + b" is in the unmutated source, so the baseline already fails.
    let forge = fake_forge(bin.path(), &["a + b"]);

    let output = solmutator(project.path(), &["--test-cmd", &forge.to_string_lossy()]);

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Tests fail before mutation"), "stderr: {stderr}");
    assert!(!project.path().join("mutation_reports/Vault_mutation_report.md").exists());
}

#[cfg(unix)]
#[test]
fn e2e_recovers_interrupted_run() {
    let project = tempfile::TempDir::new().unwrap();
    let bin = tempfile::TempDir::new().unwrap();
    create_project(project.path());
    let src = project.path().join("src");
    fs::write(src.join(".Vault.sol.mutator.bak"), VAULT).unwrap();
    fs::write(src.join("Vault.sol"), VAULT.replace("a + b", "a - b")).unwrap();
    let forge = fake_forge(bin.path(), &["a - b", "x < 100", "p || q"]);

    let output = solmutator(project.path(), &["--test-cmd", &forge.to_string_lossy()]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("previously interrupted run"), "stderr: {stderr}");
    assert_eq!(fs::read_to_string(src.join("Vault.sol")).unwrap(), VAULT);
    assert!(!src.join(".Vault.sol.mutator.bak").exists());
}

#[test]
fn e2e_missing_verifier() {
    let project = tempfile::TempDir::new().unwrap();
    create_project(project.path());

    let output = solmutator(project.path(), &["--test-cmd", "solmutator-no-such-forge test"]);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(fs::read_to_string(project.path().join("src/Vault.sol")).unwrap(), VAULT);
}

#[test]
fn e2e_no_sources() {
    let project = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();

    let output = solmutator(project.path(), &["--test-cmd", "forge test"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No Solidity files found"));
}

#[test]
fn e2e_bad_rules_file() {
    let project = tempfile::TempDir::new().unwrap();
    create_project(project.path());
    fs::write(project.path().join("rules.json"), r#"[{"original": "+", "mutant": "+"}]"#).unwrap();

    let output = solmutator(project.path(), &["--rules", "rules.json"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn e2e_rejects_unbounded_timeouts() {
    let project = tempfile::TempDir::new().unwrap();
    create_project(project.path());

    for args in [
        ["--timeout-mult", "inf"],
        ["--timeout-mult", "1e30"],
        ["--timeout-mult", "0"],
        ["--timeout-secs", "18446744073709551615"],
    ] {
        let output = solmutator(project.path(), &args);
        assert_eq!(output.status.code(), Some(2), "args {args:?}");
    }
    assert_eq!(fs::read_to_string(project.path().join("src/Vault.sol")).unwrap(), VAULT);
}
