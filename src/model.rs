//! Trained scoring model contract and a logistic linear implementation.
//!
//! Models are produced elsewhere and loaded read-only; one instance is shared
//! by every concurrent disambiguation call.

use crate::features::FeatureInstance;
use crate::score::ScoreSet;
use crate::GeoscopeError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Label whose normalized score is the probability that a candidate is the
/// correct referent.
pub const TRUE_LABEL: &str = "true";
pub const FALSE_LABEL: &str = "false";

/// `classify(instance, model)`: label → score, normalized on read.
/// Must emit `TRUE_LABEL` for every instance it is given.
pub trait ScoringModel: Send + Sync {
    fn classify(&self, instance: &FeatureInstance) -> Result<ScoreSet, GeoscopeError>;
}

/// Exported weights (deserialized from JSON).
#[derive(Deserialize)]
struct ExportedModel {
    weights: HashMap<String, f64>,
    #[serde(default)]
    bias: f64,
}

/// Logistic model over numeric features: `p = σ(w·x + b)`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    weights: HashMap<String, f64>,
    bias: f64,
    hash: String,
}

/// Compute a SipHash fingerprint of raw bytes, returned as 16-char hex string.
fn siphash_hex(data: &[u8]) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::hash::DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LinearModel {
    pub fn new(weights: HashMap<String, f64>, bias: f64) -> Self {
        Self {
            weights,
            bias,
            hash: String::new(),
        }
    }

    /// Parse a model from raw JSON bytes.
    pub fn from_json(raw: &[u8]) -> Result<Self, GeoscopeError> {
        let exported: ExportedModel = serde_json::from_slice(raw)?;
        Ok(Self {
            weights: exported.weights,
            bias: exported.bias,
            hash: siphash_hex(raw),
        })
    }

    pub fn load(path: &Path) -> Result<Self, GeoscopeError> {
        let raw = std::fs::read(path)?;
        let model = Self::from_json(&raw)
            .map_err(|e| GeoscopeError::Input(format!("{}: {e}", path.display())))?;
        log::info!(
            "loaded scoring model from {} ({} weights, hash {})",
            path.display(),
            model.weights.len(),
            model.hash
        );
        Ok(model)
    }

    /// Fingerprint of the bytes the model was parsed from; empty for in-memory models.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    fn margin(&self, instance: &FeatureInstance) -> f64 {
        let dot: f64 = instance
            .numeric
            .iter()
            .filter_map(|(name, x)| self.weights.get(name).map(|w| w * x))
            .sum();
        dot + self.bias
    }
}

impl ScoringModel for LinearModel {
    fn classify(&self, instance: &FeatureInstance) -> Result<ScoreSet, GeoscopeError> {
        let p = sigmoid(self.margin(instance));
        let mut scores = ScoreSet::new();
        scores.add_raw(TRUE_LABEL, p);
        scores.add_raw(FALSE_LABEL, 1.0 - p);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::CandidateKey;

    fn instance(features: &[(&str, f64)]) -> FeatureInstance {
        let mut inst = FeatureInstance::new(CandidateKey { mention: 0, candidate: 0 });
        for (name, v) in features {
            inst.numeric.insert(name.to_string(), *v);
        }
        inst
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
        assert!(sigmoid(2.0) > 0.88);
        assert!(sigmoid(-2.0) < 0.12);
    }

    #[test]
    fn zero_margin_scores_one_half() {
        let model = LinearModel::new(HashMap::new(), 0.0);
        let mut scores = model.classify(&instance(&[("name_match", 1.0)])).unwrap();
        assert!((scores.normalized(TRUE_LABEL) - 0.5).abs() < 1e-12);
        assert!((scores.normalized(FALSE_LABEL) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weights_apply_to_matching_features() {
        let json = br#"{"weights": {"name_match": 2.0, "ambiguity": 1.0}, "bias": -1.0}"#;
        let model = LinearModel::from_json(json).unwrap();
        assert_eq!(model.hash().len(), 16);

        let inst = instance(&[("name_match", 1.0), ("ambiguity", 0.5), ("unused", 9.0)]);
        let mut scores = model.classify(&inst).unwrap();
        let expected = sigmoid(2.0 + 0.5 - 1.0);
        assert!((scores.normalized(TRUE_LABEL) - expected).abs() < 1e-12);
    }

    #[test]
    fn identical_bytes_share_a_fingerprint() {
        let json = br#"{"weights": {"a": 1.0}}"#;
        let a = LinearModel::from_json(json).unwrap();
        let b = LinearModel::from_json(json).unwrap();
        let c = LinearModel::from_json(br#"{"weights": {"a": 2.0}}"#).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(LinearModel::from_json(b"{\"bias\": 1.0}").is_err());
        assert!(LinearModel::from_json(b"not json").is_err());
    }
}
