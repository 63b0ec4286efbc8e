use console::Style;

use crate::coordinator::{FileRun, UnitRun};
use crate::report::RunSummary;

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_warning(msg: &str) {
    let style = Style::new().yellow().bold();
    eprintln!("{} {}", style.apply_to("!"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

fn score_pct(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.1}%", s * 100.0),
        None => "n/a".to_string(),
    }
}

/// One line per file, plus indented diagnostics.
pub fn print_file_run(run: &FileRun) {
    let unit = match &run.result {
        Ok(unit) => unit,
        Err(e) => {
            print_error(&format!("{}: {}", run.name, e));
            return;
        }
    };
    let report = &unit.report;
    let dim = Style::new().dim();

    if report.total_mutants == 0 && unit.abandoned.is_empty() {
        println!("  {} {}: no mutable lines", dim.apply_to("·"), run.name);
    } else if report.survived_count == 0 {
        let style = Style::new().green().bold();
        println!(
            "{} {}: {} mutants, {} killed, {} unknown",
            style.apply_to("✓"),
            run.name,
            report.total_mutants,
            report.killed_count,
            report.unknown_count,
        );
    } else {
        let style = Style::new().yellow().bold();
        println!(
            "{} {}: {} survived / {} mutants ({} score)",
            style.apply_to("!"),
            run.name,
            report.survived_count,
            report.total_mutants,
            score_pct(report.mutation_score()),
        );
    }

    print_unit_diagnostics(unit);

    for outcome in report.survivors() {
        let c = &outcome.candidate;
        let ref_style = Style::new().cyan().bold();
        let op_style = Style::new().magenta();
        println!(
            "  {} {}:{} {} → {}",
            ref_style.apply_to(format!("@m{}", c.id)),
            run.name,
            c.line_number(),
            op_style.apply_to(c.original_line.trim()),
            op_style.apply_to(c.mutated_line.trim()),
        );
    }
}

fn print_unit_diagnostics(unit: &UnitRun) {
    let dim = Style::new().dim();
    if !unit.abandoned.is_empty() {
        println!("  {} {} mutants abandoned (write failed)", dim.apply_to("·"), unit.abandoned.len());
    }
    if unit.skipped > 0 {
        println!("  {} {} mutants skipped (interrupted)", dim.apply_to("·"), unit.skipped);
    }
    for failure in &unit.restore_failures {
        print_error(&format!("@m{}: {}", failure.candidate.id, failure.error));
    }
    if !unit.intact {
        print_error("source file was NOT restored; check the .mutator.bak backup next to it");
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} contracts analyzed: {} mutants, {} killed, {} survived, {} unknown ({} score)",
        summary.analyzed_contracts,
        summary.total_mutants,
        summary.killed_count,
        summary.survived_count,
        summary.unknown_count,
        score_pct(summary.mutation_score()),
    );
}
