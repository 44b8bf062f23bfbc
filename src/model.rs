use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

const MODEL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        counts: Vec<u32>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn leaf_counts(&self, row: &[f64]) -> Result<&[u32]> {
        let mut idx = 0usize;
        let mut steps = 0usize;
        loop {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| anyhow!("tree node {idx} out of bounds"))?;
            match node {
                Node::Leaf { counts } => return Ok(counts),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row
                        .get(*feature)
                        .ok_or_else(|| anyhow!("feature index {feature} outside input row"))?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
            }
            steps += 1;
            if steps > self.nodes.len() {
                bail!("tree traversal did not terminate");
            }
        }
    }
}

/// Trained random-forest classifier over the encoded match features. The
/// artifact carries the exact feature schema it was fitted with; inputs must
/// be reindexed to that schema before calling `predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    version: u32,
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<Tree>,
}

impl ForestModel {
    pub fn new(feature_names: Vec<String>, classes: Vec<i64>, trees: Vec<Tree>) -> Self {
        Self {
            version: MODEL_VERSION,
            feature_names,
            classes,
            trees,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Winner class code for one input row. A row that does not match the
    /// trained schema is a hard error here; the resolver demotes it to the
    /// historical fallbacks.
    pub fn predict(&self, row: &[f64]) -> Result<i64> {
        let scores = self.class_scores(row)?;
        let best = scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
            .ok_or_else(|| anyhow!("model has no classes"))?;
        Ok(self.classes[best])
    }

    /// Probability distribution over class codes, averaged across trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<(i64, f64)>> {
        let scores = self.class_scores(row)?;
        Ok(self.classes.iter().copied().zip(scores).collect())
    }

    fn class_scores(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.feature_names.len() {
            bail!(
                "input has {} features but the model was trained with {}",
                row.len(),
                self.feature_names.len()
            );
        }
        if self.trees.is_empty() {
            bail!("model has no trees");
        }
        if self.classes.is_empty() {
            bail!("model has no classes");
        }

        let mut scores = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            let counts = tree.leaf_counts(row)?;
            if counts.len() != self.classes.len() {
                bail!(
                    "leaf has {} class counts but the model has {} classes",
                    counts.len(),
                    self.classes.len()
                );
            }
            let total: u32 = counts.iter().sum();
            if total == 0 {
                continue;
            }
            for (score, count) in scores.iter_mut().zip(counts) {
                *score += f64::from(*count) / f64::from(total);
            }
        }

        let sum: f64 = scores.iter().sum();
        if sum > 0.0 {
            for score in &mut scores {
                *score /= sum;
            }
        }
        Ok(scores)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let json = serde_json::to_string(self).context("serialize model")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write model {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("swap model {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("read model {}", path.display()))?;
        let model = serde_json::from_str::<Self>(&raw)
            .with_context(|| format!("parse model {}", path.display()))?;
        if model.version != MODEL_VERSION {
            return Err(anyhow!(
                "model {} has version {} (expected {})",
                path.display(),
                model.version,
                MODEL_VERSION
            ));
        }
        Ok(model)
    }
}
