//! Co-occurrence nominal classifier.
//!
//! Training counts how often each category co-occurs with each nominal
//! feature value. Classification sums, per category, the conditional share
//! `count(c, v) / rowSum(v)` over the input's feature values. The result is a
//! sum-of-shares heuristic: raw scores are not renormalized to a probability
//! distribution, although the returned `ScoreSet` can normalize on read.

use crate::cli::ClassifyArgs;
use crate::features::FeatureInstance;
use crate::model::ScoringModel;
use crate::score::{Category, ScoreSet};
use crate::GeoscopeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::path::Path;

/// A nominal `attribute=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureValue {
    pub attribute: String,
    pub value: String,
}

impl FeatureValue {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.attribute, self.value)
    }
}

impl std::str::FromStr for FeatureValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((attr, value)) if !attr.is_empty() => Ok(FeatureValue::new(attr, value)),
            _ => Err(format!("expected attribute=value, got {s:?}")),
        }
    }
}

/// One training example. `category` may be absent; such rows are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabeledInstance {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
}

impl LabeledInstance {
    pub fn new(category: Option<&str>, features: &[(&str, &str)]) -> Self {
        Self {
            category: category.map(String::from),
            features: features
                .iter()
                .map(|(a, v)| (a.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn feature_values(&self) -> impl Iterator<Item = FeatureValue> + '_ {
        self.features.iter().map(|(a, v)| FeatureValue::new(a, v))
    }
}

/// Immutable (category, value) → count table with per-value row sums.
/// Each category carries its share of trained instances as its prior.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceTable {
    categories: Vec<Category>,
    category_index: HashMap<String, usize>,
    counts: HashMap<FeatureValue, HashMap<usize, u64>>,
    row_sums: HashMap<FeatureValue, u64>,
}

impl CooccurrenceTable {
    pub fn count(&self, category: &str, value: &FeatureValue) -> u64 {
        let Some(&ci) = self.category_index.get(category) else {
            return 0;
        };
        self.counts
            .get(value)
            .and_then(|row| row.get(&ci))
            .copied()
            .unwrap_or(0)
    }

    pub fn row_sum(&self, value: &FeatureValue) -> u64 {
        self.row_sums.get(value).copied().unwrap_or(0)
    }

    /// Known categories in first-seen order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    fn category_slot(&mut self, label: &str) -> usize {
        if let Some(&i) = self.category_index.get(label) {
            return i;
        }
        let i = self.categories.len();
        self.categories.push(Category::new(label));
        self.category_index.insert(label.to_string(), i);
        i
    }
}

/// Outcome counts of a training pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrainingReport {
    pub trained: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct CooccurrenceClassifier {
    table: CooccurrenceTable,
}

impl CooccurrenceClassifier {
    /// Build the table from labelled instances. Instances without a target
    /// category are skipped and counted in the report.
    pub fn train<'a, I>(instances: I) -> (Self, TrainingReport)
    where
        I: IntoIterator<Item = &'a LabeledInstance>,
    {
        let mut table = CooccurrenceTable::default();
        let mut report = TrainingReport::default();
        let mut class_counts: Vec<u64> = Vec::new();

        for instance in instances {
            let Some(label) = instance.category.as_deref() else {
                report.skipped += 1;
                continue;
            };
            let ci = table.category_slot(label);
            if ci == class_counts.len() {
                class_counts.push(0);
            }
            class_counts[ci] += 1;
            for value in instance.feature_values() {
                *table.counts.entry(value).or_default().entry(ci).or_insert(0) += 1;
            }
            report.trained += 1;
        }

        for (category, &n) in table.categories.iter_mut().zip(&class_counts) {
            *category = Category::with_prior(category.label(), n as f64 / report.trained as f64);
        }

        table.row_sums = table
            .counts
            .iter()
            .map(|(value, row)| (value.clone(), row.values().sum()))
            .collect();

        if report.skipped > 0 {
            log::warn!(
                "skipped {} training instance(s) without a target category",
                report.skipped
            );
        }
        log::info!(
            "co-occurrence table: {} categories, {} feature values from {} instances",
            table.categories.len(),
            table.row_sums.len(),
            report.trained
        );

        (Self { table }, report)
    }

    pub fn table(&self) -> &CooccurrenceTable {
        &self.table
    }

    /// Score every known category against `features` into a fresh set.
    /// Values never seen in training contribute 0.
    pub fn classify(&self, features: &[FeatureValue]) -> ScoreSet {
        let mut scores = ScoreSet::new();
        for category in &self.table.categories {
            scores.add_raw(category.clone(), 0.0);
            for value in features {
                let row = self.table.row_sum(value);
                if row == 0 {
                    continue;
                }
                let share = self.table.count(category.label(), value) as f64 / row as f64;
                scores.add_raw(category.clone(), share);
            }
        }
        scores
    }
}

impl ScoringModel for CooccurrenceClassifier {
    fn classify(&self, instance: &FeatureInstance) -> Result<ScoreSet, GeoscopeError> {
        Ok(CooccurrenceClassifier::classify(self, &instance.nominal))
    }
}

/// Read labelled instances from a JSON Lines file. Blank lines are ignored.
pub fn load_instances(path: &Path) -> Result<Vec<LabeledInstance>, GeoscopeError> {
    let file = std::fs::File::open(path)?;
    let mut instances = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let instance: LabeledInstance = serde_json::from_str(&line)
            .map_err(|e| GeoscopeError::Input(format!("{}:{}: {e}", path.display(), n + 1)))?;
        instances.push(instance);
    }
    Ok(instances)
}

#[derive(Serialize)]
struct CategoryScore<'a> {
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior: Option<f64>,
    raw: f64,
    normalized: f64,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    report: TrainingReport,
    scores: Vec<CategoryScore<'a>>,
}

pub fn handle_classify(args: &ClassifyArgs) -> Result<(), GeoscopeError> {
    let instances = load_instances(&args.train)?;
    let (classifier, report) = CooccurrenceClassifier::train(&instances);

    let mut scores = classifier.classify(&args.features);
    let raws: Vec<f64> = scores.entries().iter().map(|e| e.raw()).collect();
    let rows = scores
        .normalized_all()
        .into_iter()
        .zip(raws)
        .map(|((category, normalized), raw)| CategoryScore {
            category: category.label(),
            prior: category.prior(),
            raw,
            normalized,
        })
        .collect();

    crate::print_json(&ClassifyOutput {
        report,
        scores: rows,
    })
}
