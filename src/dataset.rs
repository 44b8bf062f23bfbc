use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use polars::prelude::*;
use rusqlite::{Connection, params};

use crate::history::{HistoryStore, MatchRecord};

/// The four CSV sources merged into the match database. `matches` carries one
/// row per match with per-side innings figures, `schedule` carries the
/// declared winner per match number, `innings` maps each team innings to the
/// venue it was played at, `players` is the squad roster table.
#[derive(Debug, Clone)]
pub struct CsvSources {
    pub matches: PathBuf,
    pub schedule: PathBuf,
    pub innings: PathBuf,
    pub players: PathBuf,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub matches_upserted: usize,
    pub venues_upserted: usize,
    pub players_upserted: usize,
    pub errors: Vec<String>,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            team_a TEXT NOT NULL,
            team_b TEXT NOT NULL,
            toss_winner TEXT NOT NULL,
            toss_decision TEXT NOT NULL,
            stadium TEXT NOT NULL,
            winner TEXT NULL,
            score_a REAL NULL,
            wickets_a REAL NULL,
            overs_a REAL NULL,
            runrate_a REAL NULL,
            score_b REAL NULL,
            wickets_b REAL NULL,
            overs_b REAL NULL,
            runrate_b REAL NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_teams ON matches(team_a, team_b);
        CREATE INDEX IF NOT EXISTS idx_matches_winner ON matches(winner);

        CREATE TABLE IF NOT EXISTS team_venues (
            team TEXT NOT NULL,
            venue TEXT NOT NULL,
            PRIMARY KEY (team, venue)
        );

        CREATE TABLE IF NOT EXISTS players (
            team TEXT NOT NULL,
            player TEXT NOT NULL,
            PRIMARY KEY (team, player)
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            matches_upserted INTEGER NOT NULL,
            venues_upserted INTEGER NOT NULL,
            players_upserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn ingest_csv_sources(
    conn: &mut Connection,
    db_path: PathBuf,
    sources: &CsvSources,
) -> Result<IngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, matches_upserted, venues_upserted, players_upserted, errors_json)
         VALUES (?1, NULL, 0, 0, 0, '[]')",
        params![started_at],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let mut errors: Vec<String> = Vec::new();

    // The match table and the winner column are required; venues and rosters
    // only degrade the home-ground note and the squad menus.
    let matches_df = read_csv(&sources.matches)?;
    let schedule_df = read_csv(&sources.schedule)?;
    let winners = parse_winner_map(&schedule_df)?;
    let records = parse_match_rows(&matches_df, &winners)?;

    let venue_rows = match read_csv(&sources.innings).and_then(|df| parse_venue_rows(&df)) {
        Ok(rows) => rows,
        Err(err) => {
            errors.push(format!("innings source: {err:#}"));
            Vec::new()
        }
    };
    let player_rows = match read_csv(&sources.players).and_then(|df| parse_player_rows(&df)) {
        Ok(rows) => rows,
        Err(err) => {
            errors.push(format!("players source: {err:#}"));
            Vec::new()
        }
    };

    let tx = conn.transaction().context("begin ingest transaction")?;
    for record in &records {
        upsert_match(&tx, record)?;
    }
    for (team, venue) in &venue_rows {
        tx.execute(
            "INSERT OR IGNORE INTO team_venues(team, venue) VALUES (?1, ?2)",
            params![team, venue],
        )
        .context("upsert team venue")?;
    }
    for (team, player) in &player_rows {
        tx.execute(
            "INSERT OR IGNORE INTO players(team, player) VALUES (?1, ?2)",
            params![team, player],
        )
        .context("upsert player")?;
    }
    tx.commit().context("commit ingest transaction")?;

    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, matches_upserted = ?2, venues_upserted = ?3,
             players_upserted = ?4, errors_json = ?5
         WHERE run_id = ?6",
        params![
            finished_at,
            records.len() as i64,
            venue_rows.len() as i64,
            player_rows.len() as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;

    Ok(IngestSummary {
        db_path,
        matches_upserted: records.len(),
        venues_upserted: venue_rows.len(),
        players_upserted: player_rows.len(),
        errors,
    })
}

pub fn load_history(conn: &Connection) -> Result<HistoryStore> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                match_id, team_a, team_b, toss_winner, toss_decision, stadium, winner,
                score_a, wickets_a, overs_a, runrate_a,
                score_b, wickets_b, overs_b, runrate_b
            FROM matches
            ORDER BY match_id ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MatchRecord {
                match_id: row.get::<_, u64>(0)?,
                team_a: row.get(1)?,
                team_b: row.get(2)?,
                toss_winner: row.get(3)?,
                toss_decision: row.get(4)?,
                stadium: row.get(5)?,
                winner: row.get(6)?,
                score_a: row.get(7)?,
                wickets_a: row.get(8)?,
                overs_a: row.get(9)?,
                runrate_a: row.get(10)?,
                score_b: row.get(11)?,
                wickets_b: row.get(12)?,
                overs_b: row.get(13)?,
                runrate_b: row.get(14)?,
            })
        })
        .context("query load matches")?;

    let mut matches = Vec::new();
    for row in rows {
        matches.push(row.context("decode match row")?);
    }

    let mut venue_stmt = conn
        .prepare("SELECT team, venue FROM team_venues")
        .context("prepare load venues query")?;
    let venue_rows = venue_stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .context("query load venues")?;

    let mut team_venues: HashMap<String, HashSet<String>> = HashMap::new();
    for row in venue_rows {
        let (team, venue) = row.context("decode venue row")?;
        team_venues.entry(team).or_default().insert(venue);
    }

    Ok(HistoryStore::new(matches, team_venues))
}

pub fn load_teams(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT team FROM players ORDER BY team ASC")
        .context("prepare load teams query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query load teams")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode team row")?);
    }
    Ok(out)
}

pub fn load_team_players(conn: &Connection, team: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT player FROM players WHERE team = ?1 ORDER BY player ASC")
        .context("prepare load players query")?;
    let rows = stmt
        .query_map(params![team.trim()], |row| row.get::<_, String>(0))
        .context("query load players")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode player row")?);
    }
    Ok(out)
}

fn upsert_match(tx: &rusqlite::Transaction<'_>, m: &MatchRecord) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            match_id, team_a, team_b, toss_winner, toss_decision, stadium, winner,
            score_a, wickets_a, overs_a, runrate_a,
            score_b, wickets_b, overs_b, runrate_b,
            updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16
        )
        ON CONFLICT(match_id) DO UPDATE SET
            team_a = excluded.team_a,
            team_b = excluded.team_b,
            toss_winner = excluded.toss_winner,
            toss_decision = excluded.toss_decision,
            stadium = excluded.stadium,
            winner = excluded.winner,
            score_a = excluded.score_a,
            wickets_a = excluded.wickets_a,
            overs_a = excluded.overs_a,
            runrate_a = excluded.runrate_a,
            score_b = excluded.score_b,
            wickets_b = excluded.wickets_b,
            overs_b = excluded.overs_b,
            runrate_b = excluded.runrate_b,
            updated_at = excluded.updated_at
        "#,
        params![
            m.match_id as i64,
            m.team_a,
            m.team_b,
            m.toss_winner,
            m.toss_decision,
            m.stadium,
            m.winner,
            m.score_a,
            m.wickets_a,
            m.overs_a,
            m.runrate_a,
            m.score_b,
            m.wickets_b,
            m.overs_b,
            m.runrate_b,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert match")?;
    Ok(())
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("open csv {}", path.display()))?
        .finish()
        .with_context(|| format!("parse csv {}", path.display()))
}

fn parse_match_rows(df: &DataFrame, winners: &HashMap<u64, String>) -> Result<Vec<MatchRecord>> {
    let ids = i64_col(df, "Match ID")?;
    let team_a = str_col(df, "Team A")?;
    let team_b = str_col(df, "Team B")?;
    let toss_winner = str_col(df, "Toss Winner")?;
    let toss_decision = str_col(df, "Toss Decision")?;
    let stadium = str_col(df, "Stadium")?;
    let score_a = f64_col(df, "Score A")?;
    let wickets_a = f64_col(df, "Wickets A")?;
    let overs_a = f64_col(df, "Overs Played A")?;
    let runrate_a = f64_col(df, "Runrate A")?;
    let score_b = f64_col(df, "Score B")?;
    let wickets_b = f64_col(df, "Wickets B")?;
    let overs_b = f64_col(df, "Overs Played B")?;
    let runrate_b = f64_col(df, "Runrate B")?;

    // Forward-fill per column, then drop rows still missing required fields
    // and collapse duplicate match ids (first row wins).
    let mut ff_team_a = ForwardFill::default();
    let mut ff_team_b = ForwardFill::default();
    let mut ff_toss_winner = ForwardFill::default();
    let mut ff_toss_decision = ForwardFill::default();
    let mut ff_stadium = ForwardFill::default();

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for idx in 0..df.height() {
        let Some(match_id) = ids.get(idx).and_then(|id| u64::try_from(id).ok()) else {
            continue;
        };
        let team_a = ff_team_a.next(team_a.get(idx));
        let team_b = ff_team_b.next(team_b.get(idx));
        let toss_winner = ff_toss_winner.next(toss_winner.get(idx));
        let toss_decision = ff_toss_decision.next(toss_decision.get(idx));
        let stadium = ff_stadium.next(stadium.get(idx));

        let (Some(team_a), Some(team_b), Some(toss_winner), Some(toss_decision), Some(stadium)) =
            (team_a, team_b, toss_winner, toss_decision, stadium)
        else {
            continue;
        };
        if !seen.insert(match_id) {
            continue;
        }

        out.push(MatchRecord {
            match_id,
            team_a,
            team_b,
            toss_winner,
            toss_decision,
            stadium,
            winner: winners.get(&match_id).cloned(),
            score_a: score_a.get(idx),
            wickets_a: wickets_a.get(idx),
            overs_a: overs_a.get(idx),
            runrate_a: runrate_a.get(idx),
            score_b: score_b.get(idx),
            wickets_b: wickets_b.get(idx),
            overs_b: overs_b.get(idx),
            runrate_b: runrate_b.get(idx),
        });
    }

    if out.is_empty() {
        return Err(anyhow!("match source produced no usable rows"));
    }
    Ok(out)
}

fn parse_winner_map(df: &DataFrame) -> Result<HashMap<u64, String>> {
    let ids = i64_col(df, "Match_no")?;
    let winners = str_col(df, "Winner")?;

    let mut out = HashMap::new();
    for idx in 0..df.height() {
        let Some(match_id) = ids.get(idx).and_then(|id| u64::try_from(id).ok()) else {
            continue;
        };
        let Some(winner) = winners.get(idx) else {
            continue;
        };
        let winner = winner.trim();
        if winner.is_empty() {
            continue;
        }
        out.entry(match_id).or_insert_with(|| winner.to_string());
    }
    Ok(out)
}

fn parse_venue_rows(df: &DataFrame) -> Result<Vec<(String, String)>> {
    let teams = str_col(df, "Team_Innings")?;
    let venues = str_col(df, "Venue")?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for idx in 0..df.height() {
        let (Some(team), Some(venue)) = (teams.get(idx), venues.get(idx)) else {
            continue;
        };
        let team = team.trim().to_string();
        let venue = venue.trim().to_string();
        if team.is_empty() || venue.is_empty() {
            continue;
        }
        if seen.insert((team.clone(), venue.clone())) {
            out.push((team, venue));
        }
    }
    Ok(out)
}

fn parse_player_rows(df: &DataFrame) -> Result<Vec<(String, String)>> {
    let teams = str_col(df, "team_name")?;
    let players = str_col(df, "player_name")?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for idx in 0..df.height() {
        let (Some(team), Some(player)) = (teams.get(idx), players.get(idx)) else {
            continue;
        };
        let team = team.trim().to_string();
        let player = player.trim().to_string();
        if team.is_empty() || player.is_empty() {
            continue;
        }
        if seen.insert((team.clone(), player.clone())) {
            out.push((team, player));
        }
    }
    Ok(out)
}

#[derive(Default)]
struct ForwardFill {
    last: Option<String>,
}

impl ForwardFill {
    fn next(&mut self, raw: Option<&str>) -> Option<String> {
        if let Some(value) = raw {
            let value = value.trim();
            if !value.is_empty() {
                self.last = Some(value.to_string());
            }
        }
        self.last.clone()
    }
}

fn str_col<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .with_context(|| format!("missing column {name:?}"))?
        .str()
        .with_context(|| format!("column {name:?} is not a string column"))
}

fn i64_col(df: &DataFrame, name: &str) -> Result<Int64Chunked> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column {name:?}"))?
        .cast(&DataType::Int64)
        .with_context(|| format!("column {name:?} is not an integer column"))?;
    Ok(series
        .i64()
        .with_context(|| format!("column {name:?} is not an integer column"))?
        .clone())
}

fn f64_col(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column {name:?}"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("column {name:?} is not a numeric column"))?;
    Ok(series
        .f64()
        .with_context(|| format!("column {name:?} is not a numeric column"))?
        .clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_fill_carries_last_value() {
        let mut ff = ForwardFill::default();
        assert_eq!(ff.next(Some("India")), Some("India".to_string()));
        assert_eq!(ff.next(None), Some("India".to_string()));
        assert_eq!(ff.next(Some("  ")), Some("India".to_string()));
        assert_eq!(ff.next(Some("Australia")), Some("Australia".to_string()));
    }

    #[test]
    fn forward_fill_starts_empty() {
        let mut ff = ForwardFill::default();
        assert_eq!(ff.next(None), None);
    }

    #[test]
    fn sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("history.sqlite");
        let mut conn = open_db(&db_path).unwrap();

        let record = MatchRecord {
            match_id: 7,
            team_a: "India".to_string(),
            team_b: "Australia".to_string(),
            toss_winner: "India".to_string(),
            toss_decision: "Bat".to_string(),
            stadium: "Ahmedabad".to_string(),
            winner: Some("Australia".to_string()),
            score_a: Some(240.0),
            wickets_a: Some(10.0),
            overs_a: Some(50.0),
            runrate_a: Some(4.8),
            score_b: Some(241.0),
            wickets_b: Some(4.0),
            overs_b: Some(43.0),
            runrate_b: Some(5.6),
        };
        let tx = conn.transaction().unwrap();
        upsert_match(&tx, &record).unwrap();
        // Same id again: the upsert must replace, not duplicate.
        upsert_match(&tx, &record).unwrap();
        tx.commit().unwrap();

        let store = load_history(&conn).unwrap();
        assert_eq!(store.total_matches(), 1);
        let loaded = &store.matches()[0];
        assert_eq!(loaded.winner.as_deref(), Some("Australia"));
        assert_eq!(loaded.score_b, Some(241.0));
    }
}
