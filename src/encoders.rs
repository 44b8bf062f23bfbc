use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const ENCODER_VERSION: u32 = 1;

/// Name-to-code mapping for one categorical column, built once from observed
/// data in first-seen order. Codes are only stable within a single build, so
/// the encoder is always written and read together with the model artifact.
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoder {
    names: Vec<String>,
    codes: HashMap<String, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncoderFile {
    version: u32,
    names: Vec<String>,
}

impl CategoryEncoder {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || out.codes.contains_key(name) {
                continue;
            }
            out.codes.insert(name.to_string(), out.names.len() as i64);
            out.names.push(name.to_string());
        }
        out
    }

    /// Unseen names return None; callers treat that as "data not foreseen"
    /// and fall back, never as an error.
    pub fn encode(&self, name: &str) -> Option<i64> {
        self.codes.get(name.trim()).copied()
    }

    pub fn decode(&self, code: i64) -> Option<&str> {
        let idx = usize::try_from(code).ok()?;
        self.names.get(idx).map(|s| s.as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = EncoderFile {
            version: ENCODER_VERSION,
            names: self.names.clone(),
        };
        let json = serde_json::to_string(&file).context("serialize encoder")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write encoder {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("swap encoder {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read encoder {}", path.display()))?;
        let file = serde_json::from_str::<EncoderFile>(&raw)
            .with_context(|| format!("parse encoder {}", path.display()))?;
        if file.version != ENCODER_VERSION {
            return Err(anyhow!(
                "encoder {} has version {} (expected {})",
                path.display(),
                file.version,
                ENCODER_VERSION
            ));
        }
        Ok(Self::from_names(file.names))
    }
}
