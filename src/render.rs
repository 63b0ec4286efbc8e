//! Markdown and JSON report artifacts.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::MutationError;
use crate::report::{ContractMutationReport, RunSummary};

pub const SUMMARY_MARKDOWN: &str = "mutation_testing_summary.md";
pub const SUMMARY_JSON: &str = "mutation_summary.json";

#[derive(Serialize)]
struct SummaryDocument<'a> {
    summary: &'a RunSummary,
    mutation_score: Option<f64>,
    contracts: &'a [ContractMutationReport],
}

/// Writes report files into one directory, created up front.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, MutationError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| MutationError::ReportDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `<name>_mutation_report.md`. Contracts without mutants get no file.
    pub fn write_contract(
        &self,
        report: &ContractMutationReport,
    ) -> Result<Option<PathBuf>, MutationError> {
        if report.total_mutants == 0 {
            return Ok(None);
        }
        let path = self.dir.join(contract_report_file_name(&report.file_name));
        write_file(&path, &render_contract_markdown(report))?;
        Ok(Some(path))
    }

    /// Write the markdown overview and the JSON document.
    pub fn write_summary(
        &self,
        summary: &RunSummary,
        reports: &[ContractMutationReport],
    ) -> Result<Vec<PathBuf>, MutationError> {
        let markdown = self.dir.join(SUMMARY_MARKDOWN);
        write_file(&markdown, &render_summary_markdown(summary, reports))?;

        let json_path = self.dir.join(SUMMARY_JSON);
        write_file(&json_path, &render_summary_json(summary, reports))?;
        Ok(vec![markdown, json_path])
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), MutationError> {
    fs::write(path, contents).map_err(|source| MutationError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// `tokens/ERC20.sol` becomes `tokens_ERC20_mutation_report.md`.
pub fn contract_report_file_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".sol").unwrap_or(file_name);
    let flat: String = stem
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{flat}_mutation_report.md")
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.1}%", s * 100.0),
        None => "n/a".to_string(),
    }
}

pub fn render_contract_markdown(report: &ContractMutationReport) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Mutation Testing Report for {}\n", report.file_name);
    let _ = writeln!(md, "## Summary");
    let _ = writeln!(md, "- **Total Mutants**: {}", report.total_mutants);
    let _ = writeln!(md, "- **Killed Mutants**: {}", report.killed_count);
    let _ = writeln!(md, "- **Survived Mutants**: {}", report.survived_count);
    let _ = writeln!(md, "- **Unknown Mutants**: {}", report.unknown_count);
    let _ = writeln!(md, "- **Mutation Score**: {}\n", format_score(report.mutation_score()));

    let _ = writeln!(md, "## Mutant Details\n");
    for outcome in &report.outcomes {
        let c = &outcome.candidate;
        let _ = writeln!(md, "### Mutant @m{} (line {})", c.id, c.line_number());
        let _ = writeln!(md, "#### Original Line");
        let _ = writeln!(md, "```solidity\n{}\n```", c.original_line);
        let _ = writeln!(md, "#### Mutated Line");
        let _ = writeln!(md, "```solidity\n{}\n```", c.mutated_line);
        let _ = writeln!(md, "#### Mutation Rule");
        let _ = writeln!(md, "- Original: `{}`", c.rule.original);
        let _ = writeln!(md, "- Mutant: `{}`", c.rule.mutant);
        let _ = writeln!(md, "#### Verdict: **{}**", outcome.verdict.label());
        if let Some(note) = &outcome.note {
            let _ = writeln!(md, "\n_{note}_");
        }
        if !outcome.diff.is_empty() {
            let _ = writeln!(md, "\n```diff\n{}```", outcome.diff);
        }
        md.push('\n');
    }
    md
}

pub fn render_summary_markdown(summary: &RunSummary, reports: &[ContractMutationReport]) -> String {
    let mut md = String::from("# Overall Mutation Testing Summary\n\n");
    md.push_str("## Contract Mutation Statistics\n\n");

    for report in reports.iter().filter(|r| r.total_mutants > 0) {
        let _ = writeln!(md, "### {}", report.file_name);
        let _ = writeln!(md, "- Total Mutants: {}", report.total_mutants);
        let _ = writeln!(md, "- Killed Mutants: {}", report.killed_count);
        let _ = writeln!(md, "- Survived Mutants: {}", report.survived_count);
        let _ = writeln!(md, "- Unknown Mutants: {}", report.unknown_count);
        let _ = writeln!(md, "- Mutation Score: {}\n", format_score(report.mutation_score()));
    }

    md.push_str("## Overall Summary\n");
    let _ = writeln!(md, "- **Total Contracts Analyzed**: {}", summary.analyzed_contracts);
    let _ = writeln!(md, "- **Total Mutants**: {}", summary.total_mutants);
    let _ = writeln!(md, "- **Total Killed Mutants**: {}", summary.killed_count);
    let _ = writeln!(md, "- **Total Survived Mutants**: {}", summary.survived_count);
    let _ = writeln!(md, "- **Total Unknown Mutants**: {}", summary.unknown_count);
    let _ = writeln!(md, "- **Mutation Score**: {}", format_score(summary.mutation_score()));
    md
}

pub fn render_summary_json(summary: &RunSummary, reports: &[ContractMutationReport]) -> String {
    let doc = SummaryDocument {
        summary,
        mutation_score: summary.mutation_score(),
        contracts: reports,
    };
    // Plain structs with string keys; serialization cannot fail.
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}
