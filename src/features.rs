//! Candidate feature extraction.
//!
//! One `FeatureInstance` per (mention, candidate) pair, joined back to its
//! origin through `CandidateKey`.

use crate::cooccur::FeatureValue;
use crate::location::{LocationCandidate, Mention};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Position of a candidate within the input: `mentions[mention].candidates[candidate]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CandidateKey {
    pub mention: usize,
    pub candidate: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInstance {
    pub key: CandidateKey,
    pub numeric: BTreeMap<String, f64>,
    pub nominal: Vec<FeatureValue>,
}

impl FeatureInstance {
    pub fn new(key: CandidateKey) -> Self {
        Self {
            key,
            numeric: BTreeMap::new(),
            nominal: Vec::new(),
        }
    }

    pub fn numeric(&self, name: &str) -> f64 {
        self.numeric.get(name).copied().unwrap_or(0.0)
    }

    fn set(&mut self, name: impl Into<String>, value: f64) {
        self.numeric.insert(name.into(), value);
    }

    fn tag(&mut self, attribute: &str, value: impl Into<String>) {
        self.nominal.push(FeatureValue::new(attribute, value));
    }
}

pub trait FeatureExtractor: Send + Sync {
    fn make_instances(&self, text: &str, mentions: &[Mention]) -> Vec<FeatureInstance>;
}

pub const DEFAULT_PROXIMITY_KM: f64 = 250.0;

/// Surface, ambiguity and geographic-context features.
#[derive(Debug, Clone)]
pub struct ContextFeatures {
    proximity_m: f64,
}

impl Default for ContextFeatures {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_KM)
    }
}

impl ContextFeatures {
    pub fn new(proximity_km: f64) -> Self {
        Self {
            proximity_m: proximity_km * 1000.0,
        }
    }

    /// Fraction of other mentions with at least one candidate near `candidate`.
    fn context_support(&self, mentions: &[Mention], own: usize, candidate: &LocationCandidate) -> f64 {
        let Some(here) = candidate.coordinate else {
            return 0.0;
        };
        let mut others = 0usize;
        let mut near = 0usize;
        for (i, m) in mentions.iter().enumerate() {
            if i == own || m.candidates.is_empty() {
                continue;
            }
            others += 1;
            let close = m.candidates.iter().any(|c| {
                c.coordinate
                    .is_some_and(|there| here.distance_m(&there) <= self.proximity_m)
            });
            if close {
                near += 1;
            }
        }
        if others == 0 {
            0.0
        } else {
            near as f64 / others as f64
        }
    }
}

/// Case-insensitive occurrences of `surface` in `text` not embedded in a
/// longer word. Half boundaries only look outside the match, so surfaces that
/// start or end in punctuation ("Washington D.C.") still count.
fn mention_frequency(text: &str, surface: &str) -> usize {
    if surface.trim().is_empty() {
        return 0;
    }
    Regex::new(&format!(
        r"(?i)\b{{start-half}}{}\b{{end-half}}",
        regex::escape(surface)
    ))
    .map(|re| re.find_iter(text).count())
    .unwrap_or(0)
}

fn ambiguity_bucket(n: usize) -> &'static str {
    match n {
        0 | 1 => "unique",
        2 | 3 => "low",
        _ => "high",
    }
}

impl FeatureExtractor for ContextFeatures {
    fn make_instances(&self, text: &str, mentions: &[Mention]) -> Vec<FeatureInstance> {
        let mut instances = Vec::new();
        let mut frequencies: HashMap<String, usize> = HashMap::new();

        for (mi, mention) in mentions.iter().enumerate() {
            let n = mention.candidates.len();
            let freq = *frequencies
                .entry(mention.surface().to_lowercase())
                .or_insert_with(|| mention_frequency(text, mention.surface()));

            for (ci, candidate) in mention.candidates.iter().enumerate() {
                let mut inst = FeatureInstance::new(CandidateKey {
                    mention: mi,
                    candidate: ci,
                });

                let name_match = candidate.name.to_lowercase() == mention.surface().to_lowercase();
                let support = self.context_support(mentions, mi, candidate);

                inst.set("name_match", if name_match { 1.0 } else { 0.0 });
                inst.set("ambiguity", 1.0 / n as f64);
                inst.set("mention_frequency", freq as f64);
                inst.set("has_coordinate", if candidate.coordinate.is_some() { 1.0 } else { 0.0 });
                inst.set("context_support", support);
                if let Some(t) = &candidate.place_type {
                    inst.set(format!("type:{}", t.to_lowercase()), 1.0);
                }

                inst.tag("name_match", if name_match { "yes" } else { "no" });
                inst.tag(
                    "place_type",
                    candidate
                        .place_type
                        .as_deref()
                        .map(str::to_lowercase)
                        .unwrap_or_else(|| "unknown".into()),
                );
                inst.tag("ambiguity", ambiguity_bucket(n));
                inst.tag(
                    "context",
                    if support > 0.0 { "supported" } else { "unsupported" },
                );

                instances.push(inst);
            }
        }

        instances
    }
}
