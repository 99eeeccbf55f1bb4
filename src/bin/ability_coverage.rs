//! Compile every card in a JSON card list and report which ability blocks
//! the pattern library recognizes.
//!
//! ```text
//! ability-coverage cards.json            # summary and missed blocks
//! ability-coverage cards.json --json     # full per-card report
//! RUST_LOG=rust_lorcana=debug ability-coverage cards.json
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rust_lorcana::cards::Card;
use rust_lorcana::compiler::{AbilityCompiler, CompileReport};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ability-coverage", about = "Report ability text the compiler does not recognize")]
struct Args {
    /// JSON file holding an array of cards.
    cards: PathBuf,

    /// Print the full report as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Exit with failure when any block is missed.
    #[arg(long)]
    strict: bool,

    /// Limit the missed-block listing.
    #[arg(long, default_value_t = 50)]
    show: usize,
}

#[derive(Debug, thiserror::Error)]
enum CoverageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse cards: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    cards: usize,
    blocks: usize,
    matched: usize,
    missed: usize,
    rules: BTreeMap<&'static str, usize>,
    reports: &'a [CompileReport],
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(missed) if args.strict && missed > 0 => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<usize, CoverageError> {
    let raw = std::fs::read_to_string(&args.cards).map_err(|source| CoverageError::Read {
        path: args.cards.clone(),
        source,
    })?;
    let cards: Vec<Card> = serde_json::from_str(&raw)?;
    info!(count = cards.len(), path = %args.cards.display(), "cards loaded");

    let compiler = AbilityCompiler::new();
    let reports: Vec<CompileReport> = cards
        .iter()
        .map(|card| compiler.compile_with_report(card).1)
        .collect();

    let mut rules = BTreeMap::new();
    for block in reports.iter().flat_map(|r| &r.matched) {
        *rules.entry(block.rule).or_insert(0) += 1;
    }
    let summary = Summary {
        cards: cards.len(),
        blocks: reports.iter().map(CompileReport::total).sum(),
        matched: reports.iter().map(|r| r.matched.len()).sum(),
        missed: reports.iter().map(|r| r.missed.len()).sum(),
        rules,
        reports: &reports,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary.missed);
    }

    let percent = if summary.blocks == 0 {
        100.0
    } else {
        summary.matched as f64 * 100.0 / summary.blocks as f64
    };
    println!(
        "{} cards, {} blocks, {} matched, {} missed ({percent:.1}% coverage)",
        summary.cards, summary.blocks, summary.matched, summary.missed
    );

    let mut by_rule: Vec<_> = summary.rules.iter().collect();
    by_rule.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (rule, count) in by_rule {
        println!("  {count:>5}  {rule}");
    }

    let missed: Vec<(&str, &str)> = reports
        .iter()
        .flat_map(|r| r.missed.iter().map(|text| (r.card.as_str(), text.as_str())))
        .collect();
    if !missed.is_empty() {
        println!("\nmissed:");
        for (card, text) in missed.iter().take(args.show) {
            println!("  [{card}] {text}");
        }
        if missed.len() > args.show {
            println!("  ... {} more", missed.len() - args.show);
        }
    }
    Ok(summary.missed)
}
