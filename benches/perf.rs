use std::collections::HashMap;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use cricket_predictor::features;
use cricket_predictor::history::{HistoryStore, MatchRecord};
use cricket_predictor::resolver::{MatchInput, Resolver};
use cricket_predictor::train::{self, TrainConfig};

const TEAMS: [&str; 8] = [
    "India",
    "Australia",
    "England",
    "New Zealand",
    "Pakistan",
    "South Africa",
    "Sri Lanka",
    "Bangladesh",
];
const STADIUMS: [&str; 4] = ["Ahmedabad", "Lucknow", "Chennai", "Pune"];

fn synthetic_store(rounds: usize) -> HistoryStore {
    let mut matches = Vec::new();
    let mut id = 0u64;
    for round in 0..rounds {
        for a in 0..TEAMS.len() {
            for b in (a + 1)..TEAMS.len() {
                id += 1;
                matches.push(MatchRecord {
                    match_id: id,
                    team_a: TEAMS[a].to_string(),
                    team_b: TEAMS[b].to_string(),
                    toss_winner: TEAMS[a].to_string(),
                    toss_decision: if round % 2 == 0 { "Bat" } else { "Field" }.to_string(),
                    stadium: STADIUMS[(a + b) % STADIUMS.len()].to_string(),
                    winner: Some(TEAMS[a.min(b)].to_string()),
                    score_a: Some(220.0 + (id % 60) as f64),
                    wickets_a: Some((id % 10) as f64),
                    overs_a: Some(50.0),
                    runrate_a: Some(4.4 + (id % 6) as f64 * 0.2),
                    score_b: Some(210.0 + (id % 70) as f64),
                    wickets_b: Some((id % 8) as f64),
                    overs_b: Some(47.0),
                    runrate_b: Some(4.2 + (id % 5) as f64 * 0.25),
                });
            }
        }
    }
    HistoryStore::new(matches, HashMap::new())
}

fn trained_resolver(rounds: usize) -> Resolver {
    let store = synthetic_store(rounds);
    let (teams, stadiums) = train::build_encoders(&store);
    let (rows, labels) = train::training_table(&store, &teams, &stadiums);
    let cfg = TrainConfig {
        n_trees: 20,
        ..TrainConfig::default()
    };
    let model = train::train_forest(&rows, &labels, &features::feature_schema(), &cfg)
        .expect("bench model trains");
    Resolver::new(store, teams, stadiums, model)
}

fn bench_model_inference(c: &mut Criterion) {
    let resolver = trained_resolver(8);
    let input = MatchInput::new("India", "Australia", "India", "Bat", "Ahmedabad");
    c.bench_function("resolve_model_inference", |b| {
        b.iter(|| {
            let prediction = resolver.resolve(black_box(&input));
            black_box(prediction.method);
        })
    });
}

fn bench_fallback_cascade(c: &mut Criterion) {
    let resolver = trained_resolver(8);
    // Unknown team forces the full historical scan through tiers 2 and 3.
    let input = MatchInput::new("Netherlands", "Australia", "Netherlands", "Bat", "Ahmedabad");
    c.bench_function("resolve_fallback_cascade", |b| {
        b.iter(|| {
            let prediction = resolver.resolve(black_box(&input));
            black_box(prediction.method);
        })
    });
}

fn bench_forest_training(c: &mut Criterion) {
    let store = synthetic_store(4);
    let (teams, stadiums) = train::build_encoders(&store);
    let (rows, labels) = train::training_table(&store, &teams, &stadiums);
    let schema = features::feature_schema();
    let cfg = TrainConfig {
        n_trees: 10,
        ..TrainConfig::default()
    };
    c.bench_function("train_forest_10_trees", |b| {
        b.iter(|| {
            let model = train::train_forest(&rows, &labels, &schema, &cfg).unwrap();
            black_box(model.n_trees());
        })
    });
}

criterion_group!(
    benches,
    bench_model_inference,
    bench_fallback_cascade,
    bench_forest_training
);
criterion_main!(benches);
