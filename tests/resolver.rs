use std::collections::{HashMap, HashSet};

use cricket_predictor::encoders::CategoryEncoder;
use cricket_predictor::features::feature_schema;
use cricket_predictor::history::{HistoryStore, MatchRecord};
use cricket_predictor::model::{ForestModel, Node, Tree};
use cricket_predictor::resolver::{MatchInput, Method, Resolver};

fn record(id: u64, team_a: &str, team_b: &str, winner: Option<&str>) -> MatchRecord {
    MatchRecord {
        match_id: id,
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        toss_winner: team_a.to_string(),
        toss_decision: "Bat".to_string(),
        stadium: "Ahmedabad".to_string(),
        winner: winner.map(|w| w.to_string()),
        score_a: None,
        wickets_a: None,
        overs_a: None,
        runrate_a: None,
        score_b: None,
        wickets_b: None,
        overs_b: None,
        runrate_b: None,
    }
}

fn input(team_a: &str, team_b: &str) -> MatchInput {
    MatchInput::new(team_a, team_b, team_a, "Bat", "Ahmedabad")
}

/// Single-leaf forest that always votes for `winner`.
fn leaf_model(teams: &CategoryEncoder, winner: &str) -> ForestModel {
    let classes: Vec<i64> = (0..teams.len() as i64).collect();
    let target = teams.encode(winner).expect("winner must be encodable");
    let counts: Vec<u32> = classes
        .iter()
        .map(|c| if *c == target { 1 } else { 0 })
        .collect();
    ForestModel::new(
        feature_schema(),
        classes,
        vec![Tree {
            nodes: vec![Node::Leaf { counts }],
        }],
    )
}

/// A model that errors on every call, so only the historical tiers can answer.
fn broken_model() -> ForestModel {
    ForestModel::new(feature_schema(), Vec::new(), Vec::new())
}

fn home_venues(team: &str, venue: &str) -> HashMap<String, HashSet<String>> {
    let mut venues = HashMap::new();
    venues.insert(
        team.to_string(),
        [venue.to_string()].into_iter().collect::<HashSet<_>>(),
    );
    venues
}

#[test]
fn known_inputs_resolve_via_model() {
    let teams = CategoryEncoder::from_names(["India", "Australia"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    let store = HistoryStore::new(vec![record(1, "India", "Australia", Some("India"))], HashMap::new());
    let resolver = Resolver::new(store, teams.clone(), stadiums, leaf_model(&teams, "India"));

    let prediction = resolver.resolve(&input("India", "Australia"));
    assert_eq!(prediction.method, Method::ModelInference);
    // Decoded team name, never a raw class code.
    assert_eq!(prediction.winner.as_deref(), Some("India"));
    assert!(prediction.confidence.is_some());
    assert!(prediction.notes.is_empty());
}

#[test]
fn render_has_winner_method_and_reason() {
    let teams = CategoryEncoder::from_names(["India", "Australia"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    let resolver = Resolver::new(
        HistoryStore::default(),
        teams.clone(),
        stadiums,
        leaf_model(&teams, "India"),
    );

    let rendered = resolver.resolve(&input("India", "Australia")).render();
    assert!(rendered.starts_with("Predicted winner: India (Method: ML Model)\nReason: "));
}

#[test]
fn home_ground_note_appended_for_toss_winner() {
    let teams = CategoryEncoder::from_names(["India", "Australia"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    let store = HistoryStore::new(Vec::new(), home_venues("India", "Ahmedabad"));
    let resolver = Resolver::new(store, teams.clone(), stadiums, leaf_model(&teams, "India"));

    let prediction = resolver.resolve(&input("India", "Australia"));
    assert_eq!(prediction.method, Method::ModelInference);
    assert!(prediction.explanation.contains("chose to bat"));
    assert!(prediction.explanation.contains("home ground for India"));
}

#[test]
fn no_home_note_when_toss_winner_is_neither_side() {
    let teams = CategoryEncoder::from_names(["India", "Australia", "England"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    let store = HistoryStore::new(Vec::new(), home_venues("England", "Ahmedabad"));
    let resolver = Resolver::new(store, teams.clone(), stadiums, leaf_model(&teams, "India"));

    let prediction = resolver.resolve(&MatchInput::new(
        "India",
        "Australia",
        "England",
        "Field",
        "Ahmedabad",
    ));
    assert_eq!(prediction.method, Method::ModelInference);
    assert!(!prediction.explanation.contains("home ground"));
}

#[test]
fn unknown_stadium_skips_model_and_uses_head_to_head() {
    let teams = CategoryEncoder::from_names(["India", "Australia"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    // The model would happily pick India, but the unknown stadium must demote
    // before inference. Head-to-head says Australia.
    let store = HistoryStore::new(
        vec![
            record(1, "India", "Australia", Some("Australia")),
            record(2, "Australia", "India", Some("Australia")),
            record(3, "India", "Australia", Some("India")),
        ],
        HashMap::new(),
    );
    let resolver = Resolver::new(store, teams.clone(), stadiums, leaf_model(&teams, "India"));

    let prediction = resolver.resolve(&MatchInput::new(
        "India",
        "Australia",
        "India",
        "Bat",
        "Narendra Modi Stadium",
    ));
    assert_eq!(prediction.method, Method::HeadToHead);
    assert_eq!(prediction.winner.as_deref(), Some("Australia"));
    assert!(!prediction.notes.is_empty());
}

#[test]
fn model_failure_demotes_instead_of_propagating() {
    let teams = CategoryEncoder::from_names(["India", "Australia"]);
    let stadiums = CategoryEncoder::from_names(["Ahmedabad"]);
    let store = HistoryStore::new(
        vec![
            record(1, "India", "Australia", Some("India")),
            record(2, "India", "Australia", Some("India")),
        ],
        HashMap::new(),
    );
    let resolver = Resolver::new(store, teams, stadiums, broken_model());

    let prediction = resolver.resolve(&input("India", "Australia"));
    assert_eq!(prediction.method, Method::HeadToHead);
    assert_eq!(prediction.winner.as_deref(), Some("India"));
}

#[test]
fn head_to_head_majority_with_unknown_teams() {
    // Both teams unknown to the encoders; India leads 2-1.
    let store = HistoryStore::new(
        vec![
            record(1, "India", "Australia", Some("India")),
            record(2, "Australia", "India", Some("India")),
            record(3, "India", "Australia", Some("Australia")),
        ],
        HashMap::new(),
    );
    let resolver = Resolver::new(
        store,
        CategoryEncoder::default(),
        CategoryEncoder::default(),
        broken_model(),
    );

    let prediction = resolver.resolve(&input("India", "Australia"));
    assert_eq!(prediction.method, Method::HeadToHead);
    assert_eq!(prediction.winner.as_deref(), Some("India"));

    // Swapping the sides filters the same match set.
    let swapped = resolver.resolve(&input("Australia", "India"));
    assert_eq!(swapped.method, Method::HeadToHead);
    assert_eq!(swapped.winner.as_deref(), Some("India"));
}

#[test]
fn tied_head_to_head_never_reports_head_to_head() {
    let store = HistoryStore::new(
        vec![
            record(1, "India", "Australia", Some("India")),
            record(2, "India", "Australia", Some("Australia")),
        ],
        HashMap::new(),
    );
    let resolver = Resolver::new(
        store,
        CategoryEncoder::default(),
        CategoryEncoder::default(),
        broken_model(),
    );

    // 1-1 head to head, and 1/2 vs 1/2 overall: fully tied.
    let prediction = resolver.resolve(&input("India", "Australia"));
    assert_eq!(prediction.method, Method::Inconclusive);
    assert_eq!(prediction.winner, None);
}

#[test]
fn win_rate_decides_when_no_head_to_head_exists() {
    // Nepal and Scotland never met. Ten matches overall; Nepal won 1,
    // Scotland won 3.
    let store = HistoryStore::new(
        vec![
            record(1, "Nepal", "India", Some("Nepal")),
            record(2, "Scotland", "India", Some("Scotland")),
            record(3, "Scotland", "England", Some("Scotland")),
            record(4, "Scotland", "Australia", Some("Scotland")),
            record(5, "India", "Australia", Some("India")),
            record(6, "India", "England", Some("India")),
            record(7, "Australia", "England", Some("Australia")),
            record(8, "Nepal", "Australia", Some("Australia")),
            record(9, "England", "Nepal", Some("England")),
            record(10, "India", "Scotland", Some("India")),
        ],
        HashMap::new(),
    );
    assert_eq!(store.total_matches(), 10);

    let resolver = Resolver::new(
        store,
        CategoryEncoder::default(),
        CategoryEncoder::default(),
        broken_model(),
    );
    let prediction = resolver.resolve(&input("Nepal", "Scotland"));
    assert_eq!(prediction.method, Method::WinRate);
    assert_eq!(prediction.winner.as_deref(), Some("Scotland"));
}

#[test]
fn empty_store_is_inconclusive_not_a_panic() {
    let resolver = Resolver::new(
        HistoryStore::default(),
        CategoryEncoder::default(),
        CategoryEncoder::default(),
        broken_model(),
    );
    let prediction = resolver.resolve(&input("Nepal", "Scotland"));
    assert_eq!(prediction.method, Method::Inconclusive);
    assert_eq!(prediction.winner, None);
    assert!(prediction.render().contains("inconclusive") || prediction.render().contains("Inconclusive"));
}
