//! flowlens - work pattern reports from flow action logs
//!
//! Reads the per-flow action logs written by the recorder and prints
//! sessions, mined patterns, inefficiency signals, and recommendations.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use flowlens_core::analysis::{generate_report, FlowReport, InefficiencySignal};
use flowlens_core::{ActionLogStore, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flowlens")]
#[command(about = "Work pattern reports from flow action logs")]
#[command(version)]
struct Args {
    /// Flow to report on
    #[arg(long)]
    flow: Option<String>,

    /// List flows that have action logs
    #[arg(long)]
    list: bool,

    /// Override the session inactivity gap in minutes
    #[arg(long)]
    session_gap_mins: Option<u64>,

    /// Override the idle gap in minutes
    #[arg(long)]
    idle_gap_mins: Option<u64>,

    /// Number of top patterns to include
    #[arg(long)]
    top: Option<usize>,

    /// Export format (md = markdown, json = JSON)
    #[arg(long)]
    export: Option<String>,

    /// Read action logs from this directory instead of the default
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = flowlens_core::logging::init(&config.logging).ok();

    let store = match &args.data_dir {
        Some(dir) => ActionLogStore::new(dir.clone()),
        None => ActionLogStore::open_default(),
    };

    if args.list {
        let ids = store.flow_ids().context("failed to list flow logs")?;
        if ids.is_empty() {
            println!("No flow logs found in {}", store.root().display());
        }
        for id in ids {
            println!("{}", id);
        }
        return Ok(());
    }

    let Some(flow_id) = args.flow else {
        anyhow::bail!("pass --flow <id> to generate a report, or --list to see flows");
    };

    let mut analysis = config.analysis.clone();
    if let Some(mins) = args.session_gap_mins {
        analysis.session_gap_secs = mins * 60;
    }
    if let Some(mins) = args.idle_gap_mins {
        analysis.idle_gap_secs = mins * 60;
    }
    if let Some(top) = args.top {
        analysis.top_patterns = top;
    }

    let report =
        generate_report(&store, &flow_id, &analysis).context("failed to generate report")?;

    match args.export.as_deref() {
        Some("json") => print_json(&report)?,
        Some("md") => print_markdown(&report),
        Some(other) => anyhow::bail!("Unknown export format: {}. Use 'md' or 'json'", other),
        None => print_terminal(&report),
    }

    Ok(())
}

fn print_terminal(report: &FlowReport) {
    println!();
    println!("Flow report: {}", report.flow_id);
    println!("{}", "─".repeat(60));

    if report.is_empty() {
        println!("  No recorded actions for this flow.");
        println!();
        return;
    }

    println!();
    println!("SESSIONS");
    for (i, session) in report.sessions.iter().enumerate() {
        let start = session.started_at.with_timezone(&Local);
        let duration_mins = (session.ended_at - session.started_at).num_minutes();
        println!(
            "   {}. {}  {:>4} min  {:>4} actions{}",
            i + 1,
            start.format("%Y-%m-%d %H:%M"),
            duration_mins,
            session.action_count,
            if session.signals.is_empty() {
                String::new()
            } else {
                let kinds: Vec<&str> = session.signals.iter().map(|s| s.kind()).collect();
                format!("  [{}]", kinds.join(", "))
            }
        );
        for signal in &session.signals {
            println!("        - {}", describe_signal(signal));
        }
    }
    println!();

    if !report.patterns.is_empty() {
        println!("TOP PATTERNS");
        for pattern in &report.patterns {
            println!(
                "   {:<40} x{:<4} ({:.0}% of sessions)",
                pattern.ngram.join(" -> "),
                pattern.count,
                pattern.support * 100.0
            );
        }
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("RECOMMENDATIONS");
        for rec in &report.recommendations {
            println!("   * {}", rec);
        }
        println!();
    }
}

fn print_markdown(report: &FlowReport) {
    println!("# Flow report: {}", report.flow_id);
    println!();

    if report.is_empty() {
        println!("*No recorded actions for this flow.*");
        return;
    }

    println!("## Sessions");
    println!();
    println!("| # | Start | Duration (min) | Actions | Signals |");
    println!("|---|-------|----------------|---------|---------|");
    for (i, session) in report.sessions.iter().enumerate() {
        let kinds: Vec<&str> = session.signals.iter().map(|s| s.kind()).collect();
        println!(
            "| {} | {} | {} | {} | {} |",
            i + 1,
            session.started_at.format("%Y-%m-%d %H:%M"),
            (session.ended_at - session.started_at).num_minutes(),
            session.action_count,
            kinds.join(", ")
        );
    }
    println!();

    if !report.patterns.is_empty() {
        println!("## Top Patterns");
        println!();
        for pattern in &report.patterns {
            println!(
                "- `{}` - {} occurrences, {:.0}% of sessions",
                pattern.ngram.join(" -> "),
                pattern.count,
                pattern.support * 100.0
            );
        }
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("## Recommendations");
        println!();
        for rec in &report.recommendations {
            println!("- {}", rec);
        }
        println!();
    }

    println!("---");
    println!("*Generated by flowlens*");
}

fn print_json(report: &FlowReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn describe_signal(signal: &InefficiencySignal) -> String {
    match signal {
        InefficiencySignal::Rework {
            action_type,
            task_id,
            count,
        } => match task_id {
            Some(task_id) => format!(
                "rework: '{}' on task {} repeated {} times",
                action_type, task_id, count
            ),
            None => format!("rework: '{}' repeated {} times", action_type, count),
        },
        InefficiencySignal::Idle { duration_secs, .. } => {
            format!("idle: {} minute pause", duration_secs / 60)
        }
        InefficiencySignal::Detour {
            session_len,
            baseline_len,
            starting_action,
        } => format!(
            "detour: {} actions vs a typical {:.0} for '{}' sessions",
            session_len, baseline_len, starting_action
        ),
    }
}
