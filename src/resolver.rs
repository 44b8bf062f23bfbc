use std::fmt;

use anyhow::{Context, Result, anyhow};

use crate::dataset;
use crate::encoders::CategoryEncoder;
use crate::features::{self, MatchStats};
use crate::history::HistoryStore;
use crate::model::ForestModel;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ModelInference,
    HeadToHead,
    WinRate,
    Inconclusive,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Method::ModelInference => "ML Model",
            Method::HeadToHead => "Head-to-Head Record",
            Method::WinRate => "Overall Win Rate",
            Method::Inconclusive => "Inconclusive",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct MatchInput {
    pub team_a: String,
    pub team_b: String,
    pub toss_winner: String,
    pub toss_decision: String,
    pub stadium: String,
}

impl MatchInput {
    pub fn new(
        team_a: &str,
        team_b: &str,
        toss_winner: &str,
        toss_decision: &str,
        stadium: &str,
    ) -> Self {
        Self {
            team_a: team_a.trim().to_string(),
            team_b: team_b.trim().to_string(),
            toss_winner: toss_winner.trim().to_string(),
            toss_decision: toss_decision.trim().to_string(),
            stadium: stadium.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub winner: Option<String>,
    pub method: Method,
    pub explanation: String,
    /// Model-tier probability of the predicted class. The historical tiers
    /// carry no calibrated probability, so they leave this unset.
    pub confidence: Option<f64>,
    /// Tier-demotion diagnostics. Informational only; a populated list never
    /// means the prediction failed.
    pub notes: Vec<String>,
}

impl Prediction {
    pub fn render(&self) -> String {
        match &self.winner {
            Some(name) => format!(
                "Predicted winner: {name} (Method: {})\nReason: {}",
                self.method, self.explanation
            ),
            None => self.explanation.clone(),
        }
    }
}

/// Resolves a winner through three tiers of decreasing specificity: trained
/// model, head-to-head record, overall win rate. Each tier hands over only
/// when it explicitly fails or ties; every call terminates in exactly one
/// `Prediction` and no error ever escapes to the caller.
pub struct Resolver {
    store: HistoryStore,
    teams: CategoryEncoder,
    stadiums: CategoryEncoder,
    model: ForestModel,
    placeholders: MatchStats,
}

impl Resolver {
    pub fn new(
        store: HistoryStore,
        teams: CategoryEncoder,
        stadiums: CategoryEncoder,
        model: ForestModel,
    ) -> Self {
        Self {
            store,
            teams,
            stadiums,
            model,
            placeholders: MatchStats::placeholders(),
        }
    }

    pub fn with_placeholders(mut self, placeholders: MatchStats) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Wire up a resolver from the persisted artifacts and the default match
    /// database. A missing artifact is an error here, before any resolution
    /// is attempted.
    pub fn load_default() -> Result<Self> {
        let db_path = paths::default_db_path().context("unable to resolve data directory")?;
        Self::load_with_db(&db_path)
    }

    pub fn load_with_db(db_path: &std::path::Path) -> Result<Self> {
        let conn = dataset::open_db(db_path)?;
        let store = dataset::load_history(&conn)?;
        let teams =
            CategoryEncoder::load(&paths::team_map_path().context("unable to resolve data directory")?)?;
        let stadiums = CategoryEncoder::load(
            &paths::stadium_map_path().context("unable to resolve data directory")?,
        )?;
        let model =
            ForestModel::load(&paths::model_path().context("unable to resolve data directory")?)?;
        Ok(Self::new(store, teams, stadiums, model)
            .with_placeholders(MatchStats::placeholders_from_env()))
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn resolve(&self, input: &MatchInput) -> Prediction {
        let mut notes = Vec::new();

        match self.model_inference(input) {
            Ok(mut prediction) => {
                prediction.notes = notes;
                return prediction;
            }
            // Unforeseen data or a schema mismatch demotes to the historical
            // fallbacks; the cause is kept as a diagnostic.
            Err(err) => notes.push(format!("model inference skipped: {err:#}")),
        }

        if let Some(mut prediction) = self.head_to_head(input) {
            prediction.notes = notes;
            return prediction;
        }
        notes.push("head-to-head record is tied or missing".to_string());

        self.overall_win_rate(input, notes)
    }

    fn model_inference(&self, input: &MatchInput) -> Result<Prediction> {
        let team_a = self.encode_team(&input.team_a)?;
        let team_b = self.encode_team(&input.team_b)?;
        let toss_winner = self.encode_team(&input.toss_winner)?;
        let stadium = self
            .stadiums
            .encode(&input.stadium)
            .ok_or_else(|| anyhow!("stadium {:?} is not in the trained mapping", input.stadium))?;

        let features = features::build_features(
            toss_winner,
            team_a,
            team_b,
            stadium,
            &input.toss_decision,
            &self.placeholders,
        );
        let row = features.reindex(self.model.feature_names());
        let dist = self.model.predict_proba(&row)?;
        let (code, confidence) = dist
            .iter()
            .copied()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or_else(|| anyhow!("model produced an empty distribution"))?;
        let winner = self
            .teams
            .decode(code)
            .ok_or_else(|| anyhow!("predicted class {code} has no team mapping"))?
            .to_string();

        let mut explanation = format!(
            "Based on historical data and the trained model, the prediction is \
             influenced by key factors. The toss winner, {}, chose to {}.",
            input.toss_winner,
            input.toss_decision.to_lowercase()
        );
        if (input.toss_winner == input.team_a || input.toss_winner == input.team_b)
            && self.store.is_home_venue(&input.toss_winner, &input.stadium)
        {
            explanation.push_str(&format!(
                " The match is being played at {}, which is a home ground for {}, \
                 which historically can provide a significant advantage.",
                input.stadium, input.toss_winner
            ));
        }

        Ok(Prediction {
            winner: Some(winner),
            method: Method::ModelInference,
            explanation,
            confidence: Some(confidence),
            notes: Vec::new(),
        })
    }

    fn encode_team(&self, name: &str) -> Result<i64> {
        self.teams
            .encode(name)
            .ok_or_else(|| anyhow!("team {name:?} is not in the trained mapping"))
    }

    /// Strict majority over the head-to-head record. Equal counts (including
    /// 0-0) and an empty record both defer to the win-rate tier.
    fn head_to_head(&self, input: &MatchInput) -> Option<Prediction> {
        let matches = self.store.head_to_head(&input.team_a, &input.team_b);
        if matches.is_empty() {
            return None;
        }
        let wins_a = matches.iter().filter(|m| m.won_by(&input.team_a)).count();
        let wins_b = matches.iter().filter(|m| m.won_by(&input.team_b)).count();

        let (winner, loser) = if wins_a > wins_b {
            (&input.team_a, &input.team_b)
        } else if wins_b > wins_a {
            (&input.team_b, &input.team_a)
        } else {
            return None;
        };

        Some(Prediction {
            winner: Some(winner.clone()),
            method: Method::HeadToHead,
            confidence: None,
            explanation: format!(
                "The trained model could not be used due to unforeseen data. {winner} is \
                 predicted to win as they have a better historical record against {loser}."
            ),
            notes: Vec::new(),
        })
    }

    fn overall_win_rate(&self, input: &MatchInput, mut notes: Vec<String>) -> Prediction {
        let total = self.store.total_matches();
        if total == 0 {
            // 0/0 on both sides counts as a tie.
            notes.push("no historical matches loaded".to_string());
            return Prediction {
                winner: None,
                method: Method::Inconclusive,
                explanation: "Prediction inconclusive. No historical match data is available \
                              for the fallback analysis."
                    .to_string(),
                confidence: None,
                notes,
            };
        }

        let rate_a = self.store.win_rate(&input.team_a);
        let rate_b = self.store.win_rate(&input.team_b);

        let winner = if rate_a > rate_b {
            &input.team_a
        } else if rate_b > rate_a {
            &input.team_b
        } else {
            return Prediction {
                winner: None,
                method: Method::Inconclusive,
                explanation: "Prediction inconclusive. Teams have an equal overall win rate \
                              and no other historical data is available for a clear prediction."
                    .to_string(),
                confidence: None,
                notes,
            };
        };

        Prediction {
            winner: Some(winner.clone()),
            method: Method::WinRate,
            explanation: format!(
                "The trained model and head-to-head analysis could not be used. {winner} is \
                 predicted to win based on a higher overall win rate from all available data."
            ),
            confidence: None,
            notes,
        }
    }
}
