use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use cricket_predictor::dataset;
use cricket_predictor::features;
use cricket_predictor::paths;
use cricket_predictor::train::{self, TrainConfig};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env");

    let db_path = parse_path_arg("--db")
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = dataset::open_db(&db_path)?;
    let store = dataset::load_history(&conn)?;
    if store.is_empty() {
        return Err(anyhow!(
            "no matches in {}; run the ingest binary first",
            db_path.display()
        ));
    }

    let (teams, stadiums) = train::build_encoders(&store);
    let (rows, labels) = train::training_table(&store, &teams, &stadiums);
    if rows.is_empty() {
        return Err(anyhow!(
            "no trainable matches (need a declared winner and full innings figures)"
        ));
    }

    let cfg = TrainConfig {
        n_trees: parse_usize_arg("--trees").unwrap_or(200),
        seed: parse_u64_arg("--seed").unwrap_or(42),
        ..TrainConfig::default()
    };
    let schema = features::feature_schema();

    let (train_rows, train_labels, test_rows, test_labels) =
        train::split_train_test(&rows, &labels, 0.2, cfg.seed);
    let model = train::train_forest(&train_rows, &train_labels, &schema, &cfg)?;

    let team_map_path = paths::team_map_path().context("unable to resolve data directory")?;
    let stadium_map_path = paths::stadium_map_path().context("unable to resolve data directory")?;
    let model_path = paths::model_path().context("unable to resolve data directory")?;
    teams.save(&team_map_path)?;
    stadiums.save(&stadium_map_path)?;
    model.save(&model_path)?;

    println!("Model training complete");
    println!("Samples: {} ({} held out)", rows.len(), test_rows.len());
    println!("Teams: {}", teams.len());
    println!("Stadiums: {}", stadiums.len());
    println!("Classes: {}", model.classes().len());
    println!("Trees: {}", model.n_trees());
    if !test_rows.is_empty() {
        let accuracy = train::accuracy(&model, &test_rows, &test_labels)?;
        println!("Holdout accuracy: {:.1}%", accuracy * 100.0);
    }
    println!("Team map: {}", team_map_path.display());
    println!("Stadium map: {}", stadium_map_path.display());
    println!("Model: {}", model_path.display());

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

fn parse_usize_arg(name: &str) -> Option<usize> {
    parse_value_arg(name)?.parse::<usize>().ok()
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_value_arg(name)?.parse::<u64>().ok()
}

fn parse_value_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            let trimmed = next.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
