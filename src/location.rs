use crate::geo::GeoCoordinate;
use serde::{Deserialize, Serialize};

/// One real-world place a mention could refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<GeoCoordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
}

impl LocationCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate: None,
            place_type: None,
        }
    }

    pub fn at(mut self, coordinate: GeoCoordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    pub fn of_type(mut self, place_type: impl Into<String>) -> Self {
        self.place_type = Some(place_type.into());
        self
    }
}

/// Located text span, `start..end` in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub value: String,
}

/// A span believed to name a place, with its candidates in iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    #[serde(flatten)]
    pub span: Span,
    #[serde(default)]
    pub candidates: Vec<LocationCandidate>,
}

impl Mention {
    pub fn new(start: usize, end: usize, value: impl Into<String>) -> Self {
        Self {
            span: Span {
                start,
                end,
                value: value.into(),
            },
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, candidate: LocationCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn surface(&self) -> &str {
        &self.span.value
    }
}

/// Input document for disambiguation.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_json_is_flat() {
        let json = r#"{
            "start": 4, "end": 9, "value": "Paris",
            "candidates": [
                {"id": "2988507", "name": "Paris", "coordinate": {"lat": 48.85, "lon": 2.35}, "place_type": "city"},
                {"id": "4717560", "name": "Paris"}
            ]
        }"#;
        let m: Mention = serde_json::from_str(json).unwrap();
        assert_eq!(m.surface(), "Paris");
        assert_eq!(m.span.start, 4);
        assert_eq!(m.candidates.len(), 2);
        assert!(m.candidates[0].coordinate.is_some());
        assert!(m.candidates[1].coordinate.is_none());
        assert_eq!(m.candidates[0].place_type.as_deref(), Some("city"));
    }

    #[test]
    fn mention_without_candidates() {
        let m: Mention = serde_json::from_str(r#"{"start": 0, "end": 3, "value": "Foo"}"#).unwrap();
        assert!(m.candidates.is_empty());
    }
}
