//! Place-name disambiguation: pick at most one candidate per mention.

use crate::cli::DisambiguateArgs;
use crate::config::GeoscopeConfig;
use crate::cooccur::{load_instances, CooccurrenceClassifier};
use crate::features::{CandidateKey, ContextFeatures, FeatureExtractor};
use crate::location::{Document, LocationCandidate, Mention};
use crate::model::{LinearModel, ScoringModel, TRUE_LABEL};
use crate::scope::ScopeStrategy;
use crate::GeoscopeError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum "true" probability for a best candidate to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.5;

/// An accepted (mention, candidate) pair, by index into the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub mention: usize,
    pub candidate: usize,
    pub score: f64,
}

impl Resolution {
    pub fn mention_in<'a>(&self, mentions: &'a [Mention]) -> Option<&'a Mention> {
        mentions.get(self.mention)
    }

    pub fn candidate_in<'a>(&self, mentions: &'a [Mention]) -> Option<&'a LocationCandidate> {
        self.mention_in(mentions)?.candidates.get(self.candidate)
    }
}

/// Resolve mentions to candidates. Mentions that do not resolve are absent
/// from the output; output is ordered by mention index.
pub trait Disambiguator {
    fn disambiguate(&self, text: &str, mentions: &[Mention]) -> Result<Vec<Resolution>, GeoscopeError>;
}

/// Scores every candidate with a trained model and keeps the per-mention
/// arg-max when it clears `ACCEPT_THRESHOLD`.
pub struct ModelDisambiguator {
    model: Arc<dyn ScoringModel>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl ModelDisambiguator {
    pub fn new(
        model: Option<Arc<dyn ScoringModel>>,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Result<Self, GeoscopeError> {
        let model = model.ok_or_else(|| {
            GeoscopeError::Precondition("disambiguator requires a scoring model".into())
        })?;
        Ok(Self { model, extractor })
    }

    fn score_candidates(
        &self,
        text: &str,
        mentions: &[Mention],
    ) -> Result<HashMap<CandidateKey, f64>, GeoscopeError> {
        let mut scores = HashMap::new();
        for instance in self.extractor.make_instances(text, mentions) {
            let key = instance.key;
            if mentions
                .get(key.mention)
                .and_then(|m| m.candidates.get(key.candidate))
                .is_none()
            {
                return Err(GeoscopeError::Invariant(format!(
                    "feature instance {key:?} does not match any candidate"
                )));
            }

            let mut labels = self.model.classify(&instance)?;
            if !labels.contains(TRUE_LABEL) {
                return Err(GeoscopeError::Invariant(format!(
                    "model produced no {TRUE_LABEL:?} score for {key:?}"
                )));
            }
            if scores.insert(key, labels.normalized(TRUE_LABEL)).is_some() {
                return Err(GeoscopeError::Invariant(format!(
                    "duplicate feature instance for {key:?}"
                )));
            }
        }
        Ok(scores)
    }
}

impl Disambiguator for ModelDisambiguator {
    fn disambiguate(&self, text: &str, mentions: &[Mention]) -> Result<Vec<Resolution>, GeoscopeError> {
        let scores = self.score_candidates(text, mentions)?;
        let mut resolved = Vec::new();

        for (mi, mention) in mentions.iter().enumerate() {
            let mut max = 0.0;
            let mut best = None;

            for ci in 0..mention.candidates.len() {
                let key = CandidateKey {
                    mention: mi,
                    candidate: ci,
                };
                let &score = scores.get(&key).ok_or_else(|| {
                    GeoscopeError::Invariant(format!("no score recorded for {key:?}"))
                })?;
                if score > max {
                    max = score;
                    best = Some(ci);
                }
            }

            match best {
                Some(ci) if max >= ACCEPT_THRESHOLD => resolved.push(Resolution {
                    mention: mi,
                    candidate: ci,
                    score: max,
                }),
                _ => log::debug!(
                    "mention {:?} at {} unresolved (best score {max:.3})",
                    mention.surface(),
                    mention.span.start
                ),
            }
        }

        Ok(resolved)
    }
}

/// Baseline: every mention with candidates resolves to its first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl Disambiguator for FirstCandidate {
    fn disambiguate(&self, _text: &str, mentions: &[Mention]) -> Result<Vec<Resolution>, GeoscopeError> {
        Ok(mentions
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.candidates.is_empty())
            .map(|(mi, _)| Resolution {
                mention: mi,
                candidate: 0,
                score: 1.0,
            })
            .collect())
    }
}

/// The candidates picked by `resolutions`, in resolution order.
pub fn resolved_locations(mentions: &[Mention], resolutions: &[Resolution]) -> Vec<LocationCandidate> {
    resolutions
        .iter()
        .filter_map(|r| r.candidate_in(mentions))
        .cloned()
        .collect()
}

#[derive(Serialize)]
struct ResolvedMention<'a> {
    start: usize,
    end: usize,
    value: &'a str,
    candidate: &'a LocationCandidate,
    score: f64,
}

#[derive(Serialize)]
struct DisambiguateOutput<'a> {
    resolved: Vec<ResolvedMention<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<Option<LocationCandidate>>,
}

fn build_disambiguator(
    args: &DisambiguateArgs,
    config: &GeoscopeConfig,
) -> Result<Box<dyn Disambiguator>, GeoscopeError> {
    if args.baseline {
        log::info!("using first-candidate baseline");
        return Ok(Box::new(FirstCandidate));
    }
    let extractor = Arc::new(ContextFeatures::new(config.disambiguation.proximity_km));

    let model: Option<Arc<dyn ScoringModel>> = if let Some(path) = &args.train {
        let instances = load_instances(path)?;
        let (classifier, _) = CooccurrenceClassifier::train(&instances);
        Some(Arc::new(classifier))
    } else if let Some(path) = args.model.as_ref().or(config.disambiguation.model.as_ref()) {
        Some(Arc::new(LinearModel::load(path)?))
    } else {
        None
    };

    ModelDisambiguator::new(model, extractor)
        .map(|d| Box::new(d) as Box<dyn Disambiguator>)
        .map_err(|e| match e {
            GeoscopeError::Precondition(msg) => GeoscopeError::Precondition(format!(
                "{msg}; pass --model, --train, set disambiguation.model in config, or use --baseline"
            )),
            other => other,
        })
}

pub fn handle_disambiguate(args: &DisambiguateArgs, config: &GeoscopeConfig) -> Result<(), GeoscopeError> {
    let doc: Document = crate::read_json(&args.input)?;
    let disambiguator = build_disambiguator(args, config)?;
    let resolutions = disambiguator.disambiguate(&doc.text, &doc.mentions)?;

    let scope = if args.scope {
        let locations = resolved_locations(&doc.mentions, &resolutions);
        let strategy = config.scope.strategy.build();
        Some(strategy.scope(&locations).cloned())
    } else {
        None
    };

    let resolved = resolutions
        .iter()
        .filter_map(|r| {
            let mention = r.mention_in(&doc.mentions)?;
            Some(ResolvedMention {
                start: mention.span.start,
                end: mention.span.end,
                value: mention.surface(),
                candidate: r.candidate_in(&doc.mentions)?,
                score: r.score,
            })
        })
        .collect();

    crate::print_json(&DisambiguateOutput { resolved, scope })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureInstance;
    use crate::score::ScoreSet;

    /// Candidates are keyed by `(mention, candidate)`; the test injects exact
    /// probabilities for each.
    struct FixedScores(HashMap<CandidateKey, f64>);

    impl ScoringModel for FixedScores {
        fn classify(&self, instance: &FeatureInstance) -> Result<ScoreSet, GeoscopeError> {
            let p = self.0.get(&instance.key).copied().unwrap_or(0.0);
            let mut s = ScoreSet::new();
            s.add_raw("true", p);
            s.add_raw("false", 1.0 - p);
            Ok(s)
        }
    }

    struct NoTrueLabel;

    impl ScoringModel for NoTrueLabel {
        fn classify(&self, _instance: &FeatureInstance) -> Result<ScoreSet, GeoscopeError> {
            let mut s = ScoreSet::new();
            s.add_raw("false", 1.0);
            Ok(s)
        }
    }

    /// Drops the instance for the last candidate of every mention.
    struct LossyExtractor;

    impl FeatureExtractor for LossyExtractor {
        fn make_instances(&self, text: &str, mentions: &[Mention]) -> Vec<FeatureInstance> {
            let mut all = ContextFeatures::default().make_instances(text, mentions);
            all.retain(|i| i.key.candidate + 1 < mentions[i.key.mention].candidates.len());
            all
        }
    }

    fn key(mention: usize, candidate: usize) -> CandidateKey {
        CandidateKey { mention, candidate }
    }

    fn mentions() -> Vec<Mention> {
        vec![
            Mention::new(0, 5, "Paris")
                .with_candidate(LocationCandidate::new("p1", "Paris"))
                .with_candidate(LocationCandidate::new("p2", "Paris"))
                .with_candidate(LocationCandidate::new("p3", "Paris")),
            Mention::new(10, 16, "Dublin")
                .with_candidate(LocationCandidate::new("d1", "Dublin"))
                .with_candidate(LocationCandidate::new("d2", "Dublin")),
        ]
    }

    fn disambiguator(scores: &[(CandidateKey, f64)]) -> ModelDisambiguator {
        let model: Arc<dyn ScoringModel> = Arc::new(FixedScores(scores.iter().copied().collect()));
        ModelDisambiguator::new(Some(model), Arc::new(ContextFeatures::default())).unwrap()
    }

    #[test]
    fn picks_highest_scoring_candidate() {
        let d = disambiguator(&[
            (key(0, 0), 0.2),
            (key(0, 1), 0.9),
            (key(0, 2), 0.6),
            (key(1, 0), 0.7),
            (key(1, 1), 0.1),
        ]);
        let out = d.disambiguate("", &mentions()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].mention, out[0].candidate), (0, 1));
        assert!((out[0].score - 0.9).abs() < 1e-12);
        assert_eq!((out[1].mention, out[1].candidate), (1, 0));
    }

    #[test]
    fn threshold_boundary() {
        let d = disambiguator(&[(key(0, 0), 0.5), (key(1, 0), 0.4999999)]);
        let out = d.disambiguate("", &mentions()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mention, 0);
        assert_eq!(out[0].candidate, 0);
    }

    #[test]
    fn tie_keeps_first_seen() {
        let d = disambiguator(&[(key(0, 1), 0.8), (key(0, 2), 0.8)]);
        let out = d.disambiguate("", &mentions()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].candidate, 1);
    }

    #[test]
    fn all_zero_scores_resolve_nothing() {
        let d = disambiguator(&[]);
        assert!(d.disambiguate("", &mentions()).unwrap().is_empty());
    }

    #[test]
    fn mention_without_candidates_is_absent() {
        let d = disambiguator(&[(key(1, 0), 0.9)]);
        let input = vec![
            Mention::new(0, 3, "Foo"),
            Mention::new(4, 7, "Bar").with_candidate(LocationCandidate::new("b", "Bar")),
        ];
        let out = d.disambiguate("", &input).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].mention, out[0].candidate), (1, 0));
        assert!((out[0].score - 0.9).abs() < 1e-12);
        assert_eq!(out[0].candidate_in(&input).unwrap().id, "b");
    }

    #[test]
    fn absent_model_is_a_precondition_error() {
        let err = ModelDisambiguator::new(None, Arc::new(ContextFeatures::default()))
            .err()
            .unwrap();
        assert!(matches!(err, GeoscopeError::Precondition(_)));
    }

    #[test]
    fn missing_true_label_is_an_invariant_violation() {
        let d = ModelDisambiguator::new(Some(Arc::new(NoTrueLabel)), Arc::new(ContextFeatures::default()))
            .unwrap();
        let err = d.disambiguate("", &mentions()).unwrap_err();
        assert!(matches!(err, GeoscopeError::Invariant(_)));
    }

    #[test]
    fn missing_instance_is_an_invariant_violation() {
        let model: Arc<dyn ScoringModel> = Arc::new(FixedScores(HashMap::new()));
        let d = ModelDisambiguator::new(Some(model), Arc::new(LossyExtractor)).unwrap();
        let err = d.disambiguate("", &mentions()).unwrap_err();
        assert!(matches!(err, GeoscopeError::Invariant(_)));
    }

    #[test]
    fn first_candidate_baseline() {
        let input = mentions();
        let out = FirstCandidate.disambiguate("", &input).unwrap();
        let ids: Vec<String> = resolved_locations(&input, &out).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["p1", "d1"]);
    }
}
