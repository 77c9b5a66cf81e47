//! Document geographic scope: compute an ideal center, then snap to the
//! nearest real location so the answer is always an actual place.

use crate::cli::ScopeArgs;
use crate::config::{GeoscopeConfig, ScopeStrategyKind};
use crate::geo::{centroid, spherical_midpoint, GeoCoordinate};
use crate::location::LocationCandidate;
use crate::GeoscopeError;

pub trait ScopeStrategy {
    /// The most representative location, or `None` when no input has a coordinate.
    fn scope<'a>(&self, locations: &'a [LocationCandidate]) -> Option<&'a LocationCandidate>;
}

/// Unit-vector average on the sphere.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointScope;

/// Flat mean of latitudes and longitudes. Cheaper, but skews near the
/// antimeridian and the poles.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidScope;

fn coordinates(locations: &[LocationCandidate]) -> Vec<GeoCoordinate> {
    locations.iter().filter_map(|l| l.coordinate).collect()
}

/// Location with a coordinate strictly closest to `target`; first wins ties.
pub fn nearest<'a>(locations: &'a [LocationCandidate], target: &GeoCoordinate) -> Option<&'a LocationCandidate> {
    let mut best: Option<(&LocationCandidate, f64)> = None;
    for location in locations {
        let Some(coord) = location.coordinate else {
            continue;
        };
        let d = coord.distance_m(target);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((location, d));
        }
    }
    best.map(|(l, _)| l)
}

impl ScopeStrategy for MidpointScope {
    fn scope<'a>(&self, locations: &'a [LocationCandidate]) -> Option<&'a LocationCandidate> {
        let center = spherical_midpoint(&coordinates(locations))?;
        let chosen = nearest(locations, &center);
        if let Some(l) = chosen {
            log::debug!(
                "midpoint ({:.4}, {:.4}) snapped to {} ({})",
                center.latitude(),
                center.longitude(),
                l.name,
                l.id
            );
        }
        chosen
    }
}

impl ScopeStrategy for CentroidScope {
    fn scope<'a>(&self, locations: &'a [LocationCandidate]) -> Option<&'a LocationCandidate> {
        let center = centroid(&coordinates(locations))?;
        nearest(locations, &center)
    }
}

impl ScopeStrategyKind {
    pub fn build(self) -> Box<dyn ScopeStrategy> {
        match self {
            ScopeStrategyKind::Midpoint => Box::new(MidpointScope),
            ScopeStrategyKind::Centroid => Box::new(CentroidScope),
        }
    }
}

pub fn handle_scope(args: &ScopeArgs, config: &GeoscopeConfig) -> Result<(), GeoscopeError> {
    let locations: Vec<LocationCandidate> = crate::read_json(&args.input)?;
    let strategy = args.strategy.unwrap_or(config.scope.strategy).build();
    crate::print_json(&strategy.scope(&locations))
}
