/// Feature columns the classifier is trained with, in canonical order.
pub const FEATURE_NAMES: [&str; 14] = [
    "Toss Winner Encoded",
    "Team A Encoded",
    "Team B Encoded",
    "Stadium Encoded",
    "Toss Decision_Bat",
    "Toss Decision_Field",
    "Score A",
    "Wickets A",
    "Overs Played A",
    "Runrate A",
    "Score B",
    "Wickets B",
    "Overs Played B",
    "Runrate B",
];

// Stand-in values for in-match statistics that are unknown before the match
// starts. The model is trained with the real figures, so prediction-time
// vectors carry these fixed approximations instead.
pub const PLACEHOLDER_SCORE_A: f64 = 250.0;
pub const PLACEHOLDER_WICKETS_A: f64 = 5.0;
pub const PLACEHOLDER_OVERS_A: f64 = 50.0;
pub const PLACEHOLDER_RUNRATE_A: f64 = 5.0;
pub const PLACEHOLDER_SCORE_B: f64 = 240.0;
pub const PLACEHOLDER_WICKETS_B: f64 = 5.0;
pub const PLACEHOLDER_OVERS_B: f64 = 45.0;
pub const PLACEHOLDER_RUNRATE_B: f64 = 5.5;

/// Per-side innings figures fed to the classifier. At prediction time the
/// placeholder values are used; callers with better pre-match estimates can
/// override them (see `placeholders_from_env`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchStats {
    pub score_a: f64,
    pub wickets_a: f64,
    pub overs_a: f64,
    pub runrate_a: f64,
    pub score_b: f64,
    pub wickets_b: f64,
    pub overs_b: f64,
    pub runrate_b: f64,
}

impl MatchStats {
    pub fn placeholders() -> Self {
        Self {
            score_a: PLACEHOLDER_SCORE_A,
            wickets_a: PLACEHOLDER_WICKETS_A,
            overs_a: PLACEHOLDER_OVERS_A,
            runrate_a: PLACEHOLDER_RUNRATE_A,
            score_b: PLACEHOLDER_SCORE_B,
            wickets_b: PLACEHOLDER_WICKETS_B,
            overs_b: PLACEHOLDER_OVERS_B,
            runrate_b: PLACEHOLDER_RUNRATE_B,
        }
    }

    /// Placeholders with per-field env overrides (PREDICT_SCORE_A etc.).
    pub fn placeholders_from_env() -> Self {
        Self {
            score_a: env_f64("PREDICT_SCORE_A", PLACEHOLDER_SCORE_A),
            wickets_a: env_f64("PREDICT_WICKETS_A", PLACEHOLDER_WICKETS_A),
            overs_a: env_f64("PREDICT_OVERS_A", PLACEHOLDER_OVERS_A),
            runrate_a: env_f64("PREDICT_RUNRATE_A", PLACEHOLDER_RUNRATE_A),
            score_b: env_f64("PREDICT_SCORE_B", PLACEHOLDER_SCORE_B),
            wickets_b: env_f64("PREDICT_WICKETS_B", PLACEHOLDER_WICKETS_B),
            overs_b: env_f64("PREDICT_OVERS_B", PLACEHOLDER_OVERS_B),
            runrate_b: env_f64("PREDICT_RUNRATE_B", PLACEHOLDER_RUNRATE_B),
        }
    }
}

impl Default for MatchStats {
    fn default() -> Self {
        Self::placeholders()
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

/// Ordered name/value pairs. Order only matters until `reindex` aligns the
/// vector against the schema the model was trained with.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: f64) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Align against a trained schema: absent columns become 0.0, columns the
    /// schema does not know are dropped.
    pub fn reindex(&self, schema: &[String]) -> Vec<f64> {
        schema
            .iter()
            .map(|name| self.get(name).unwrap_or(0.0))
            .collect()
    }
}

pub fn feature_schema() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Build the classifier input for one match. The toss decision is matched
/// case-insensitively; an unrecognized decision leaves both one-hot flags 0.
pub fn build_features(
    toss_winner_code: i64,
    team_a_code: i64,
    team_b_code: i64,
    stadium_code: i64,
    toss_decision: &str,
    stats: &MatchStats,
) -> FeatureVector {
    let decision = toss_decision.trim();
    let mut features = FeatureVector::new();
    features.push("Toss Winner Encoded", toss_winner_code as f64);
    features.push("Team A Encoded", team_a_code as f64);
    features.push("Team B Encoded", team_b_code as f64);
    features.push("Stadium Encoded", stadium_code as f64);
    features.push(
        "Toss Decision_Bat",
        if decision.eq_ignore_ascii_case("bat") { 1.0 } else { 0.0 },
    );
    features.push(
        "Toss Decision_Field",
        if decision.eq_ignore_ascii_case("field") { 1.0 } else { 0.0 },
    );
    features.push("Score A", stats.score_a);
    features.push("Wickets A", stats.wickets_a);
    features.push("Overs Played A", stats.overs_a);
    features.push("Runrate A", stats.runrate_a);
    features.push("Score B", stats.score_b);
    features.push("Wickets B", stats.wickets_b);
    features.push("Overs Played B", stats.overs_b);
    features.push("Runrate B", stats.runrate_b);
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toss_decision_one_hot_is_case_insensitive() {
        let stats = MatchStats::placeholders();
        let bat = build_features(0, 1, 2, 0, "BAT", &stats);
        assert_eq!(bat.get("Toss Decision_Bat"), Some(1.0));
        assert_eq!(bat.get("Toss Decision_Field"), Some(0.0));

        let field = build_features(0, 1, 2, 0, " field ", &stats);
        assert_eq!(field.get("Toss Decision_Bat"), Some(0.0));
        assert_eq!(field.get("Toss Decision_Field"), Some(1.0));
    }

    #[test]
    fn unknown_toss_decision_leaves_both_flags_zero() {
        let f = build_features(0, 1, 2, 0, "declared", &MatchStats::placeholders());
        assert_eq!(f.get("Toss Decision_Bat"), Some(0.0));
        assert_eq!(f.get("Toss Decision_Field"), Some(0.0));
    }

    #[test]
    fn reindex_fills_missing_and_drops_extra() {
        let mut features = FeatureVector::new();
        features.push("Team A Encoded", 3.0);
        features.push("Unused Column", 9.0);

        let schema = vec!["Team A Encoded".to_string(), "Score A".to_string()];
        let row = features.reindex(&schema);
        assert_eq!(row, vec![3.0, 0.0]);
    }

    #[test]
    fn build_features_covers_full_schema() {
        let features = build_features(0, 1, 2, 3, "Bat", &MatchStats::placeholders());
        let row = features.reindex(&feature_schema());
        assert_eq!(row.len(), FEATURE_NAMES.len());
        assert_eq!(row[6], PLACEHOLDER_SCORE_A);
        assert_eq!(row[13], PLACEHOLDER_RUNRATE_B);
    }
}
