use std::path::PathBuf;

use anyhow::{Context, Result};

use cricket_predictor::dataset::{self, CsvSources};
use cricket_predictor::paths;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env");

    let db_path = parse_path_arg("--db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;

    let sources = CsvSources {
        matches: parse_path_arg("--matches")
            .unwrap_or_else(|| PathBuf::from("dataset/matches.csv")),
        schedule: parse_path_arg("--schedule")
            .unwrap_or_else(|| PathBuf::from("dataset/match_schedule_results.csv")),
        innings: parse_path_arg("--innings")
            .unwrap_or_else(|| PathBuf::from("dataset/batting_summary.csv")),
        players: parse_path_arg("--players")
            .unwrap_or_else(|| PathBuf::from("dataset/world_cup_players_info.csv")),
    };

    let mut conn = dataset::open_db(&db_path)?;
    let summary = dataset::ingest_csv_sources(&mut conn, db_path.clone(), &sources)?;

    println!("Historical ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Matches upserted: {}", summary.matches_upserted);
    println!("Venues upserted: {}", summary.venues_upserted);
    println!("Players upserted: {}", summary.players_upserted);
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
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
