use anyhow::{Result, anyhow, bail};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::encoders::CategoryEncoder;
use crate::features::{self, MatchStats};
use crate::history::HistoryStore;
use crate::model::{ForestModel, Node, Tree};

#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 32,
            min_leaf: 1,
            seed: 42,
        }
    }
}

/// Team encoder from the union of both side columns, the toss winner and the
/// declared winner; stadium encoder independently from the stadium column.
pub fn build_encoders(store: &HistoryStore) -> (CategoryEncoder, CategoryEncoder) {
    let mut team_names = Vec::new();
    let mut stadium_names = Vec::new();
    for m in store.matches() {
        team_names.push(m.team_a.clone());
        team_names.push(m.team_b.clone());
        team_names.push(m.toss_winner.clone());
        if let Some(winner) = &m.winner {
            team_names.push(winner.clone());
        }
        stadium_names.push(m.stadium.clone());
    }
    (
        CategoryEncoder::from_names(team_names),
        CategoryEncoder::from_names(stadium_names),
    )
}

/// Encoded feature rows and winner labels for every match that has a declared
/// winner, full innings figures and encodable names. Rows that cannot be
/// encoded are skipped, matching how the training frame drops unusable rows.
pub fn training_table(
    store: &HistoryStore,
    teams: &CategoryEncoder,
    stadiums: &CategoryEncoder,
) -> (Vec<Vec<f64>>, Vec<i64>) {
    let schema = features::feature_schema();
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for m in store.matches() {
        let Some(winner) = m.winner.as_deref() else {
            continue;
        };
        let (Some(team_a), Some(team_b), Some(toss_winner), Some(stadium), Some(label)) = (
            teams.encode(&m.team_a),
            teams.encode(&m.team_b),
            teams.encode(&m.toss_winner),
            stadiums.encode(&m.stadium),
            teams.encode(winner),
        ) else {
            continue;
        };
        let (
            Some(score_a),
            Some(wickets_a),
            Some(overs_a),
            Some(runrate_a),
            Some(score_b),
            Some(wickets_b),
            Some(overs_b),
            Some(runrate_b),
        ) = (
            m.score_a, m.wickets_a, m.overs_a, m.runrate_a, m.score_b, m.wickets_b, m.overs_b,
            m.runrate_b,
        )
        else {
            continue;
        };

        let stats = MatchStats {
            score_a,
            wickets_a,
            overs_a,
            runrate_a,
            score_b,
            wickets_b,
            overs_b,
            runrate_b,
        };
        let vector = features::build_features(
            toss_winner,
            team_a,
            team_b,
            stadium,
            &m.toss_decision,
            &stats,
        );
        rows.push(vector.reindex(&schema));
        labels.push(label);
    }

    (rows, labels)
}

pub fn train_forest(
    rows: &[Vec<f64>],
    labels: &[i64],
    feature_names: &[String],
    cfg: &TrainConfig,
) -> Result<ForestModel> {
    if rows.is_empty() {
        bail!("no training rows");
    }
    if rows.len() != labels.len() {
        bail!(
            "{} training rows but {} labels",
            rows.len(),
            labels.len()
        );
    }
    let n_features = feature_names.len();
    if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
        bail!(
            "training row has {} features, schema has {}",
            bad.len(),
            n_features
        );
    }
    if cfg.n_trees == 0 {
        bail!("n_trees must be positive");
    }

    let mut classes: Vec<i64> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let class_of = |label: i64| -> usize {
        classes
            .binary_search(&label)
            .unwrap_or(0)
    };
    let y: Vec<usize> = labels.iter().map(|l| class_of(*l)).collect();

    let m_try = (n_features as f64).sqrt().round().max(1.0) as usize;
    let trees: Vec<Tree> = (0..cfg.n_trees)
        .into_par_iter()
        .map(|tree_idx| {
            let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(tree_idx as u64));
            let indices: Vec<usize> = (0..rows.len())
                .map(|_| rng.gen_range(0..rows.len()))
                .collect();
            let mut nodes = Vec::new();
            grow_tree(
                &mut nodes,
                rows,
                &y,
                classes.len(),
                indices,
                0,
                m_try,
                cfg,
                &mut rng,
            );
            Tree { nodes }
        })
        .collect();

    Ok(ForestModel::new(feature_names.to_vec(), classes, trees))
}

/// Shuffled train/holdout split. `test_fraction` is clamped so both sides
/// stay non-empty when there are at least two samples.
pub fn split_train_test(
    rows: &[Vec<f64>],
    labels: &[i64],
    test_fraction: f64,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<i64>, Vec<Vec<f64>>, Vec<i64>) {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut n_test = (rows.len() as f64 * test_fraction).round() as usize;
    if rows.len() >= 2 {
        n_test = n_test.clamp(1, rows.len() - 1);
    } else {
        n_test = 0;
    }

    let mut train_rows = Vec::new();
    let mut train_labels = Vec::new();
    let mut test_rows = Vec::new();
    let mut test_labels = Vec::new();
    for (pos, idx) in order.into_iter().enumerate() {
        if pos < n_test {
            test_rows.push(rows[idx].clone());
            test_labels.push(labels[idx]);
        } else {
            train_rows.push(rows[idx].clone());
            train_labels.push(labels[idx]);
        }
    }
    (train_rows, train_labels, test_rows, test_labels)
}

pub fn accuracy(model: &ForestModel, rows: &[Vec<f64>], labels: &[i64]) -> Result<f64> {
    if rows.is_empty() {
        return Err(anyhow!("no evaluation rows"));
    }
    let mut correct = 0usize;
    for (row, label) in rows.iter().zip(labels) {
        if model.predict(row)? == *label {
            correct += 1;
        }
    }
    Ok(correct as f64 / rows.len() as f64)
}

#[allow(clippy::too_many_arguments)]
fn grow_tree(
    nodes: &mut Vec<Node>,
    rows: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    indices: Vec<usize>,
    depth: usize,
    m_try: usize,
    cfg: &TrainConfig,
    rng: &mut StdRng,
) -> usize {
    let counts = class_counts(y, &indices, n_classes);
    let n = indices.len();

    let is_pure = counts.iter().filter(|c| **c > 0).count() <= 1;
    if is_pure || depth >= cfg.max_depth || n < cfg.min_leaf.max(1) * 2 {
        nodes.push(Node::Leaf { counts });
        return nodes.len() - 1;
    }

    let n_features = rows.first().map_or(0, |r| r.len());
    let mut split = best_split(rows, y, n_classes, &indices, m_try, rng);
    if split.is_none() && m_try < n_features {
        // The sampled features were constant or unhelpful; widen to the full
        // set before declaring a leaf.
        split = best_split(rows, y, n_classes, &indices, n_features, rng);
    }
    let Some((feature, threshold)) = split else {
        nodes.push(Node::Leaf { counts });
        return nodes.len() - 1;
    };

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|idx| rows[*idx][feature] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        nodes.push(Node::Leaf { counts });
        return nodes.len() - 1;
    }

    let node_idx = nodes.len();
    // Placeholder, replaced once both children exist.
    nodes.push(Node::Leaf { counts: Vec::new() });
    let left = grow_tree(
        nodes,
        rows,
        y,
        n_classes,
        left_indices,
        depth + 1,
        m_try,
        cfg,
        rng,
    );
    let right = grow_tree(
        nodes,
        rows,
        y,
        n_classes,
        right_indices,
        depth + 1,
        m_try,
        cfg,
        rng,
    );
    nodes[node_idx] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_idx
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<u32> {
    let mut counts = vec![0u32; n_classes];
    for idx in indices {
        counts[y[*idx]] += 1;
    }
    counts
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|c| {
            let p = f64::from(*c) / total;
            p * p
        })
        .sum::<f64>()
}

fn best_split(
    rows: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    indices: &[usize],
    m_try: usize,
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let n_features = rows.first()?.len();
    let mut feature_pool: Vec<usize> = (0..n_features).collect();
    feature_pool.shuffle(rng);
    feature_pool.truncate(m_try.clamp(1, n_features));

    let n = indices.len();
    let parent_counts = class_counts(y, indices, n_classes);
    let parent_impurity = gini(&parent_counts, n);

    let mut best: Option<(usize, f64, f64)> = None;
    for feature in feature_pool {
        let mut pairs: Vec<(f64, usize)> = indices
            .iter()
            .map(|idx| (rows[*idx][feature], y[*idx]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0u32; n_classes];
        let mut right_counts = parent_counts.clone();
        for split_at in 1..n {
            let (value, class) = pairs[split_at - 1];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            // Only split between distinct values.
            if pairs[split_at].0 <= value {
                continue;
            }
            let weighted = (split_at as f64 * gini(&left_counts, split_at)
                + (n - split_at) as f64 * gini(&right_counts, n - split_at))
                / n as f64;
            if best.is_none_or(|(_, _, best_weighted)| weighted < best_weighted) {
                let threshold = (value + pairs[split_at].0) / 2.0;
                best = Some((feature, threshold, weighted));
            }
        }
    }

    let (feature, threshold, weighted) = best?;
    if parent_impurity - weighted <= 1e-12 {
        return None;
    }
    Some((feature, threshold))
}
