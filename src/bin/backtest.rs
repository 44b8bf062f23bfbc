use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use cricket_predictor::paths;
use cricket_predictor::report::{self, BacktestRow};
use cricket_predictor::resolver::{MatchInput, Resolver};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env");

    let db_path = parse_path_arg("--db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let xlsx_path = parse_path_arg("--xlsx");

    let resolver = Resolver::load_with_db(&db_path)?;

    let mut rows: Vec<BacktestRow> = Vec::new();
    for m in resolver.store().matches() {
        let Some(actual) = m.winner.as_deref() else {
            continue;
        };
        let input = MatchInput::new(
            &m.team_a,
            &m.team_b,
            &m.toss_winner,
            &m.toss_decision,
            &m.stadium,
        );
        let prediction = resolver.resolve(&input);
        rows.push(BacktestRow {
            match_id: m.match_id,
            team_a: m.team_a.clone(),
            team_b: m.team_b.clone(),
            actual: actual.to_string(),
            predicted: prediction.winner.clone(),
            method: prediction.method,
            correct: prediction.winner.as_deref() == Some(actual),
            confidence: prediction.confidence,
        });
    }
    if rows.is_empty() {
        return Err(anyhow!(
            "no finished matches in {}; run the ingest binary first",
            db_path.display()
        ));
    }

    let correct = rows.iter().filter(|r| r.correct).count();
    println!("Backtest complete");
    println!("Matches evaluated: {}", rows.len());
    println!(
        "Overall accuracy: {:.1}%",
        100.0 * correct as f64 / rows.len() as f64
    );
    for (method, (total, hit)) in report::method_totals(&rows) {
        println!("{method}: {hit}/{total} correct");
    }

    if let Some(path) = xlsx_path {
        report::export_backtest(&path, &rows)?;
        println!("Report: {}", path.display());
    }

    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
