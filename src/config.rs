//! Mutation run configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::rules::RuleSet;
use crate::verifier::{DEFAULT_OUTPUT_LIMIT, DEFAULT_TIMEOUT, MAX_TIMEOUT};

/// Everything a run needs, passed explicitly to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationConfig {
    /// Project root; the verifier runs here.
    pub project_dir: PathBuf,
    /// Directory scanned for sources, relative to `project_dir`.
    pub source_dir: PathBuf,
    /// Where reports are written.
    pub report_dir: PathBuf,
    /// Verifier command line.
    pub test_cmd: String,
    /// Fixed per-mutant timeout. When unset it is derived from the baseline.
    pub timeout: Option<Duration>,
    /// Baseline duration multiplier for the derived timeout.
    pub timeout_mult: f64,
    /// Worker threads shared by all files and candidates.
    pub jobs: usize,
    /// Run each file in its own temporary copy of the project.
    pub isolated: bool,
    /// Per-stream verifier capture limit in bytes.
    pub output_limit: usize,
    pub rules: RuleSet,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            source_dir: PathBuf::from("src"),
            report_dir: PathBuf::from("mutation_reports"),
            test_cmd: "forge test".to_string(),
            timeout: None,
            timeout_mult: 3.0,
            jobs: default_jobs(),
            isolated: false,
            output_limit: DEFAULT_OUTPUT_LIMIT,
            rules: RuleSet::default(),
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl MutationConfig {
    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    pub fn with_report_dir(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.report_dir = report_dir.into();
        self
    }

    pub fn with_test_cmd(mut self, test_cmd: impl Into<String>) -> Self {
        self.test_cmd = test_cmd.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_timeout_mult(mut self, timeout_mult: f64) -> Self {
        self.timeout_mult = timeout_mult;
        self
    }

    /// Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    pub fn with_output_limit(mut self, output_limit: usize) -> Self {
        self.output_limit = output_limit;
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Absolute-or-relative path of the scanned source directory.
    pub fn sources_root(&self) -> PathBuf {
        self.project_dir.join(&self.source_dir)
    }

    /// Per-mutant timeout: the fixed one if set, else `baseline * mult + 2s`.
    /// Never exceeds [`MAX_TIMEOUT`]; a non-finite multiplier counts as 1.
    pub fn mutant_timeout(&self, baseline: Option<Duration>) -> Duration {
        if let Some(timeout) = self.timeout {
            return timeout.min(MAX_TIMEOUT);
        }
        let Some(baseline) = baseline else {
            return DEFAULT_TIMEOUT;
        };
        let mult = if self.timeout_mult.is_finite() {
            self.timeout_mult.max(1.0)
        } else {
            1.0
        };
        Duration::try_from_secs_f64(baseline.as_secs_f64() * mult)
            .unwrap_or(MAX_TIMEOUT)
            .saturating_add(Duration::from_secs(2))
            .min(MAX_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builder_overrides_work() {
        let default = MutationConfig::default();
        assert_eq!(default.test_cmd, "forge test");
        assert_eq!(default.sources_root(), PathBuf::from("./src"));
        assert!(default.jobs >= 1);

        let cfg = MutationConfig::default()
            .with_project_dir("/tmp/project-a")
            .with_source_dir("contracts")
            .with_report_dir("/tmp/reports")
            .with_test_cmd("forge test -vv")
            .with_jobs(0)
            .with_isolated(true);

        assert_eq!(cfg.sources_root(), PathBuf::from("/tmp/project-a/contracts"));
        assert_eq!(cfg.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(cfg.test_cmd, "forge test -vv");
        assert_eq!(cfg.jobs, 1);
        assert!(cfg.isolated);
    }

    #[test]
    fn mutant_timeout_prefers_explicit_value() {
        let cfg = MutationConfig::default().with_timeout(Duration::from_secs(7));
        assert_eq!(cfg.mutant_timeout(Some(Duration::from_secs(100))), Duration::from_secs(7));
    }

    #[test]
    fn mutant_timeout_scales_baseline() {
        let cfg = MutationConfig::default().with_timeout_mult(3.0);
        assert_eq!(cfg.mutant_timeout(Some(Duration::from_secs(4))), Duration::from_secs(14));
        assert_eq!(cfg.mutant_timeout(None), DEFAULT_TIMEOUT);
    }

    #[test]
    fn mutant_timeout_is_bounded() {
        let baseline = Some(Duration::from_secs(10));
        let huge = MutationConfig::default().with_timeout_mult(1e30);
        assert_eq!(huge.mutant_timeout(baseline), MAX_TIMEOUT);

        let inf = MutationConfig::default().with_timeout_mult(f64::INFINITY);
        assert_eq!(inf.mutant_timeout(baseline), Duration::from_secs(12));

        let nan = MutationConfig::default().with_timeout_mult(f64::NAN);
        assert_eq!(nan.mutant_timeout(baseline), Duration::from_secs(12));

        let fixed = MutationConfig::default().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(fixed.mutant_timeout(baseline), MAX_TIMEOUT);
    }
}
