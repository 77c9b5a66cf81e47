//! Per-target category score container.
//!
//! Raw scores are accumulated from evidence; normalized scores are a cached
//! derived view (`max(raw_i, 0) / Σ max(raw_j, 0)`) recomputed lazily on the
//! first read after any mutation. A negative raw score carries no mass, so
//! normalized scores always lie in [0, 1].

use crate::GeoscopeError;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A classification label. Equality and hashing use the label only.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior: Option<f64>,
}

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prior: None,
        }
    }

    pub fn with_prior(label: impl Into<String>, prior: f64) -> Self {
        Self {
            label: label.into(),
            prior: Some(prior),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn prior(&self) -> Option<f64> {
        self.prior
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for Category {}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::new(label)
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::new(label)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone)]
pub struct ScoreEntry {
    category: Category,
    raw: f64,
    normalized: f64,
}

impl ScoreEntry {
    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn raw(&self) -> f64 {
        self.raw
    }
}

/// Ordered category scores sharing one normalization epoch.
///
/// Invariant: while `dirty` is false, every entry's `normalized` equals
/// `mass / total` where `mass = max(raw, 0)` (0 when total mass is zero).
#[derive(Debug, Clone, Default)]
pub struct ScoreSet {
    entries: Vec<ScoreEntry>,
    index: HashMap<String, usize>,
    dirty: bool,
}

impl ScoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to the category's raw score, creating the entry if absent.
    pub fn add_raw(&mut self, category: impl Into<Category>, delta: f64) {
        let category = category.into();
        match self.index.get(category.label()) {
            Some(&i) => self.entries[i].raw += delta,
            None => {
                self.index
                    .insert(category.label().to_string(), self.entries.len());
                self.entries.push(ScoreEntry {
                    category,
                    raw: delta,
                    normalized: 0.0,
                });
            }
        }
        self.dirty = true;
    }

    /// Multiply an existing category's raw score by `factor`.
    pub fn scale_raw(&mut self, label: &str, factor: f64) -> Result<(), GeoscopeError> {
        let &i = self.index.get(label).ok_or_else(|| {
            GeoscopeError::Precondition(format!("cannot scale absent category {label:?}"))
        })?;
        self.entries[i].raw *= factor;
        self.dirty = true;
        Ok(())
    }

    /// Normalized score for `label`, recomputing the whole set first if dirty.
    /// Absent categories score 0.
    pub fn normalized(&mut self, label: &str) -> f64 {
        self.refresh();
        self.index
            .get(label)
            .map(|&i| self.entries[i].normalized)
            .unwrap_or(0.0)
    }

    /// All (category, normalized score) pairs in insertion order.
    pub fn normalized_all(&mut self) -> Vec<(&Category, f64)> {
        self.refresh();
        self.entries
            .iter()
            .map(|e| (&e.category, e.normalized))
            .collect()
    }

    pub fn raw(&self, label: &str) -> Option<f64> {
        self.index.get(label).map(|&i| self.entries[i].raw)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().map(|e| &e.category)
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        let total: f64 = self.entries.iter().map(|e| e.raw.max(0.0)).sum();
        for entry in &mut self.entries {
            entry.normalized = if total > 0.0 {
                entry.raw.max(0.0) / total
            } else {
                0.0
            };
        }
        self.dirty = false;
    }
}
