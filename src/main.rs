use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;

use cricket_predictor::dataset;
use cricket_predictor::paths;
use cricket_predictor::resolver::{MatchInput, Resolver};

const SQUAD_SIZE: usize = 11;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    println!("Cricket Match Outcome Predictor");

    let db_path = parse_db_path_arg()
        .or_else(paths::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = dataset::open_db(&db_path)?;

    let stdin = io::stdin();
    let team_a = prompt(&stdin, "Enter Team A: ")?;
    let team_b = prompt(&stdin, "Enter Team B: ")?;

    println!();
    println!("--- Team Selection ---");
    let squad_a = select_squad(&stdin, &conn, &team_a)?;
    println!("[INFO] {} players locked in for {team_a}", squad_a.len());
    let squad_b = select_squad(&stdin, &conn, &team_b)?;
    println!("[INFO] {} players locked in for {team_b}", squad_b.len());

    println!();
    println!("--- Match Details ---");
    let toss_winner = prompt(&stdin, "Enter Toss Winner Team: ")?;
    let toss_decision = prompt(&stdin, "Enter Toss Decision (Bat or Field): ")?;
    let stadium = prompt(&stdin, "Enter Stadium: ")?;

    // Squads are collected for the scorecard only; the classifier does not
    // consume player-level features.
    let input = MatchInput::new(&team_a, &team_b, &toss_winner, &toss_decision, &stadium);

    match Resolver::load_with_db(&db_path) {
        Ok(resolver) => {
            let prediction = resolver.resolve(&input);
            for note in &prediction.notes {
                println!("[INFO] {note}");
            }
            println!();
            println!("Prediction Result: {}", prediction.render());
        }
        Err(err) => {
            println!();
            println!("Prediction error: {err:#}");
        }
    }

    Ok(())
}

fn select_squad(stdin: &io::Stdin, conn: &Connection, team: &str) -> Result<Vec<String>> {
    let all_players = dataset::load_team_players(conn, team)?;
    if all_players.is_empty() {
        return Err(anyhow!(
            "no players found for {team}; run the ingest binary first"
        ));
    }
    if all_players.len() < SQUAD_SIZE {
        bail!(
            "only {} players on record for {team}, need {SQUAD_SIZE}",
            all_players.len()
        );
    }

    println!();
    println!("Available players for {team}:");
    for (idx, player) in all_players.iter().enumerate() {
        println!("  {}. {player}", idx + 1);
    }
    println!();
    println!("Please select {SQUAD_SIZE} players for {team} by entering the corresponding number.");

    let mut selected: Vec<String> = Vec::new();
    while selected.len() < SQUAD_SIZE {
        let raw = prompt(
            stdin,
            &format!(
                "Enter player #{} (1-{}): ",
                selected.len() + 1,
                all_players.len()
            ),
        )?;
        let Ok(pick) = raw.parse::<usize>() else {
            println!("Invalid input. Please enter a number.");
            continue;
        };
        if pick == 0 || pick > all_players.len() {
            println!("Invalid number. Please select a number from the list.");
            continue;
        }
        let player = &all_players[pick - 1];
        if selected.iter().any(|p| p == player) {
            println!("{player} is already selected. Please choose another player.");
        } else {
            println!("Added {player}.");
            selected.push(player.clone());
        }
    }
    Ok(selected)
}

fn prompt(stdin: &io::Stdin, message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    let read = stdin.read_line(&mut line).context("read stdin")?;
    if read == 0 {
        bail!("input stream closed");
    }
    Ok(line.trim().to_string())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
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
