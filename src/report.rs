use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::resolver::Method;

#[derive(Debug, Clone)]
pub struct BacktestRow {
    pub match_id: u64,
    pub team_a: String,
    pub team_b: String,
    pub actual: String,
    pub predicted: Option<String>,
    pub method: Method,
    pub correct: bool,
    pub confidence: Option<f64>,
}

pub fn export_backtest(path: &Path, rows: &[BacktestRow]) -> Result<()> {
    let mut prediction_rows = vec![vec![
        "Match ID".to_string(),
        "Team A".to_string(),
        "Team B".to_string(),
        "Actual Winner".to_string(),
        "Predicted Winner".to_string(),
        "Method".to_string(),
        "Correct".to_string(),
        "Confidence".to_string(),
    ]];
    for row in rows {
        prediction_rows.push(vec![
            row.match_id.to_string(),
            row.team_a.clone(),
            row.team_b.clone(),
            row.actual.clone(),
            row.predicted.clone().unwrap_or_else(|| "-".to_string()),
            row.method.to_string(),
            if row.correct { "yes" } else { "no" }.to_string(),
            row.confidence
                .map(|c| format!("{c:.3}"))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    let mut summary_rows = vec![vec![
        "Method".to_string(),
        "Predictions".to_string(),
        "Correct".to_string(),
        "Accuracy".to_string(),
    ]];
    for (method, (total, correct)) in method_totals(rows) {
        let accuracy = if total > 0 {
            format!("{:.1}%", 100.0 * correct as f64 / total as f64)
        } else {
            "-".to_string()
        };
        summary_rows.push(vec![
            method,
            total.to_string(),
            correct.to_string(),
            accuracy,
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Predictions").context("name sheet")?;
        write_rows(sheet, &prediction_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary").context("name sheet")?;
        write_rows(sheet, &summary_rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(())
}

pub fn method_totals(rows: &[BacktestRow]) -> BTreeMap<String, (usize, usize)> {
    let mut totals: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.method.to_string()).or_default();
        entry.0 += 1;
        if row.correct {
            entry.1 += 1;
        }
    }
    totals
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(method: Method, correct: bool) -> BacktestRow {
        BacktestRow {
            match_id: 1,
            team_a: "India".to_string(),
            team_b: "Australia".to_string(),
            actual: "India".to_string(),
            predicted: Some("India".to_string()),
            method,
            correct,
            confidence: Some(0.7),
        }
    }

    #[test]
    fn totals_group_by_method() {
        let rows = vec![
            row(Method::ModelInference, true),
            row(Method::ModelInference, false),
            row(Method::HeadToHead, true),
        ];
        let totals = method_totals(&rows);
        assert_eq!(totals.get("ML Model"), Some(&(2, 1)));
        assert_eq!(totals.get("Head-to-Head Record"), Some(&(1, 1)));
    }

    #[test]
    fn export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest.xlsx");
        export_backtest(&path, &[row(Method::WinRate, true)]).unwrap();
        assert!(path.exists());
    }
}
