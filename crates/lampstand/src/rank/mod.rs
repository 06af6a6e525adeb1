//! Proximity ranking of directory entries around a user position.
//!
//! Ranking is pure: given the entries, the coordinates resolved for them, the
//! user's coordinate and a radius it produces a [`Ranking`]. Distances are rounded
//! to one decimal place before filtering and sorting, and sorting is stable so
//! equal distances keep dataset order.

use std::fmt;

use lampstand_directory::{Coordinate, DirectoryEntry, Region};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    error::{LampstandError, Result},
    geo::{approximate_region, distance_km},
    geocode::ResolvedCoordinates,
};

/// Radii offered by the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SearchRadius {
    Km25,
    #[default]
    Km50,
    Km100,
    Km250,
}

impl SearchRadius {
    pub const ALL: [Self; 4] = [Self::Km25, Self::Km50, Self::Km100, Self::Km250];

    pub const fn km(self) -> u32 {
        match self {
            Self::Km25 => 25,
            Self::Km50 => 50,
            Self::Km100 => 100,
            Self::Km250 => 250,
        }
    }
}

impl TryFrom<u32> for SearchRadius {
    type Error = LampstandError;

    fn try_from(km: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|radius| radius.km() == km)
            .ok_or(LampstandError::InvalidRadius(km))
    }
}

impl fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", self.km())
    }
}

/// A directory entry together with its distance from the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub entry: DirectoryEntry,
    /// Rounded to one decimal place; `None` when the entry has no coordinate.
    pub distance_km: Option<f64>,
}

/// Outcome of ranking one set of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Ranking {
    /// Entries within the radius, nearest first.
    WithinRadius(Vec<RankedEntry>),
    /// Nothing was within the radius; every entry in the user's approximate region.
    RegionFallback {
        region: Region,
        entries: Vec<RankedEntry>,
    },
    /// Nothing within the radius and no usable region fallback.
    NoResults,
}

impl Ranking {
    pub fn entries(&self) -> &[RankedEntry] {
        match self {
            Self::WithinRadius(entries) | Self::RegionFallback { entries, .. } => entries,
            Self::NoResults => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Filters and orders entries by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityRanker {
    /// Compute distances on the rayon pool once there are at least this many entries.
    pub parallel_threshold: usize,
    /// Fall back to the user's region when nothing is within the radius.
    pub region_fallback: bool,
}

impl Default for ProximityRanker {
    fn default() -> Self {
        Self {
            parallel_threshold: 2048,
            region_fallback: true,
        }
    }
}

impl ProximityRanker {
    /// Rounded distance from `origin` for each entry, in input order.
    pub fn distances(
        &self,
        entries: &[&DirectoryEntry],
        coordinates: &ResolvedCoordinates,
        origin: Coordinate,
    ) -> Vec<Option<f64>> {
        let measure = |entry: &&DirectoryEntry| {
            coordinates
                .coordinate_for(entry)
                .map(|coordinate| distance_km(origin, coordinate))
        };
        if entries.len() >= self.parallel_threshold {
            entries.par_iter().map(measure).collect()
        } else {
            entries.iter().map(measure).collect()
        }
    }

    /// Entries at most `radius` away, nearest first. Entries without a
    /// coordinate are left out.
    pub fn within_radius(
        &self,
        entries: &[&DirectoryEntry],
        coordinates: &ResolvedCoordinates,
        origin: Coordinate,
        radius: SearchRadius,
    ) -> Vec<RankedEntry> {
        let limit = f64::from(radius.km());
        let mut ranked: Vec<RankedEntry> = entries
            .iter()
            .zip(self.distances(entries, coordinates, origin))
            .filter_map(|(entry, distance)| {
                distance
                    .filter(|d| *d <= limit)
                    .map(|d| ranked_entry(entry, Some(d)))
            })
            .collect();
        sort_by_distance(&mut ranked);
        ranked
    }

    /// Every entry tagged with the region `origin` appears to be in. Entries with
    /// a coordinate come first, nearest first; the rest follow in input order.
    pub fn region_fallback(
        &self,
        entries: &[&DirectoryEntry],
        coordinates: &ResolvedCoordinates,
        origin: Coordinate,
    ) -> Option<(Region, Vec<RankedEntry>)> {
        let region = approximate_region(origin)?;
        let in_region: Vec<&DirectoryEntry> = entries
            .iter()
            .copied()
            .filter(|entry| entry.region == region)
            .collect();

        let (mut located, unlocated): (Vec<_>, Vec<_>) = in_region
            .iter()
            .zip(self.distances(&in_region, coordinates, origin))
            .map(|(entry, distance)| ranked_entry(entry, distance))
            .partition(|ranked| ranked.distance_km.is_some());
        sort_by_distance(&mut located);
        located.extend(unlocated);
        Some((region, located))
    }

    /// Rank `entries` around `origin`, falling back to the user's region when
    /// nothing is within `radius`.
    #[instrument(
        name = "Rank entries",
        skip(self, entries, coordinates),
        fields(entries = entries.len()),
        level = "debug"
    )]
    pub fn rank(
        &self,
        entries: &[&DirectoryEntry],
        coordinates: &ResolvedCoordinates,
        origin: Coordinate,
        radius: SearchRadius,
    ) -> Ranking {
        let nearby = self.within_radius(entries, coordinates, origin, radius);
        if !nearby.is_empty() {
            debug!(results = nearby.len(), "Entries found within radius");
            return Ranking::WithinRadius(nearby);
        }
        if !self.region_fallback {
            return Ranking::NoResults;
        }

        match self.region_fallback(entries, coordinates, origin) {
            Some((region, entries)) if !entries.is_empty() => {
                debug!(%region, results = entries.len(), "Falling back to region listing");
                Ranking::RegionFallback { region, entries }
            }
            Some((region, _)) => {
                debug!(%region, "No entries in the user's region");
                Ranking::NoResults
            }
            None => {
                debug!("User position is outside every known region");
                Ranking::NoResults
            }
        }
    }
}

fn ranked_entry(entry: &DirectoryEntry, distance_km: Option<f64>) -> RankedEntry {
    RankedEntry {
        entry: entry.clone(),
        distance_km,
    }
}

/// Stable ascending sort; entries without a distance sort last.
fn sort_by_distance(entries: &mut [RankedEntry]) {
    entries.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use lampstand_directory::test_data::{
        MELBOURNE, NEWCASTLE, NORTH_WEST_SYDNEY, SYDNEY, WOLLONGONG, entry, regional_nsw,
        sydney_and_melbourne,
    };

    use super::*;

    fn ids(entries: &[RankedEntry]) -> Vec<&str> {
        entries.iter().map(|r| r.entry.id.as_str()).collect()
    }

    #[test]
    fn test_radius_values() {
        assert_eq!(SearchRadius::try_from(25).unwrap(), SearchRadius::Km25);
        assert_eq!(SearchRadius::try_from(250).unwrap(), SearchRadius::Km250);
        assert!(matches!(
            SearchRadius::try_from(30),
            Err(LampstandError::InvalidRadius(30))
        ));
        assert_eq!(SearchRadius::default().km(), 50);
        assert_eq!(SearchRadius::Km100.to_string(), "100 km");
    }

    #[test]
    fn test_sydney_within_fifty_km() {
        let directory = sydney_and_melbourne();
        let entries: Vec<_> = directory.iter().collect();
        let ranker = ProximityRanker::default();

        let ranking = ranker.rank(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km50,
        );

        let Ranking::WithinRadius(results) = &ranking else {
            panic!("expected results within radius, got {ranking:?}");
        };
        assert_eq!(ids(results), vec!["nw-sydney"]);
        let distance = results[0].distance_km.unwrap();
        assert!((distance - 20.9).abs() < 0.2, "got {distance}");
    }

    #[test]
    fn test_results_sorted_and_bounded() {
        let directory = regional_nsw();
        let entries: Vec<_> = directory.iter().collect();
        let ranker = ProximityRanker::default();

        for radius in SearchRadius::ALL {
            let results =
                ranker.within_radius(&entries, &ResolvedCoordinates::new(), SYDNEY, radius);
            for ranked in &results {
                assert!(ranked.distance_km.unwrap() <= f64::from(radius.km()));
            }
            for pair in results.windows(2) {
                assert!(pair[0].distance_km <= pair[1].distance_km);
            }
        }

        let results = ranker.within_radius(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km250,
        );
        assert_eq!(ids(&results), vec!["wollongong", "newcastle"]);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        // Due south of the origin, so the distance is exactly the arc length
        let south_by = |km: f64| {
            let degrees = (km / crate::geo::EARTH_RADIUS_KM).to_degrees();
            Coordinate::new(SYDNEY.latitude - degrees, SYDNEY.longitude)
        };
        let on_edge = entry("on-edge", "Edge", Region::Nsw, Some(south_by(25.04)));
        let past_edge = entry("past-edge", "Past", Region::Nsw, Some(south_by(25.06)));
        let entries = vec![&on_edge, &past_edge];

        let results = ProximityRanker::default().within_radius(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km25,
        );
        assert_eq!(ids(&results), vec!["on-edge"]);
        assert_eq!(results[0].distance_km, Some(25.0));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let a = entry("a", "A", Region::Nsw, Some(NORTH_WEST_SYDNEY));
        let b = entry("b", "B", Region::Nsw, Some(WOLLONGONG));
        let c = entry("c", "C", Region::Nsw, Some(NORTH_WEST_SYDNEY));
        let entries = vec![&a, &b, &c];

        let results = ProximityRanker::default().within_radius(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km100,
        );
        assert_eq!(ids(&results), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_unresolved_entries_are_excluded() {
        let located = entry("located", "Located", Region::Nsw, Some(NORTH_WEST_SYDNEY));
        let unlocated = entry("unlocated", "Unlocated", Region::Nsw, None);
        let entries = vec![&located, &unlocated];

        let results = ProximityRanker::default().within_radius(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km250,
        );
        assert_eq!(ids(&results), vec!["located"]);

        let mut coordinates = ResolvedCoordinates::new();
        coordinates.insert("unlocated", WOLLONGONG);
        let results = ProximityRanker::default().within_radius(
            &entries,
            &coordinates,
            SYDNEY,
            SearchRadius::Km250,
        );
        assert_eq!(ids(&results), vec!["located", "unlocated"]);
    }

    #[test]
    fn test_region_fallback_when_nothing_nearby() {
        let directory = regional_nsw();
        let entries: Vec<_> = directory.iter().collect();

        let ranking = ProximityRanker::default().rank(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km25,
        );

        let Ranking::RegionFallback { region, entries } = &ranking else {
            panic!("expected a region fallback, got {ranking:?}");
        };
        assert_eq!(*region, Region::Nsw);
        assert_eq!(ids(entries), vec!["wollongong", "newcastle"]);
    }

    #[test]
    fn test_region_fallback_lists_unlocated_last() {
        let far = entry("far", "Far", Region::Nsw, Some(NEWCASTLE));
        let unknown = entry("unknown", "Unknown", Region::Nsw, None);
        let near = entry("near", "Near", Region::Nsw, Some(WOLLONGONG));
        let other = entry("other", "Other", Region::Vic, Some(MELBOURNE));
        let entries = vec![&far, &unknown, &near, &other];

        let (region, results) = ProximityRanker::default()
            .region_fallback(&entries, &ResolvedCoordinates::new(), SYDNEY)
            .unwrap();
        assert_eq!(region, Region::Nsw);
        assert_eq!(ids(&results), vec!["near", "far", "unknown"]);
        assert_eq!(results[2].distance_km, None);
    }

    #[test]
    fn test_no_results_outside_every_region() {
        let directory = regional_nsw();
        let entries: Vec<_> = directory.iter().collect();
        let mid_ocean = Coordinate::new(-40.0, 100.0);

        let ranking = ProximityRanker::default().rank(
            &entries,
            &ResolvedCoordinates::new(),
            mid_ocean,
            SearchRadius::Km250,
        );
        assert_eq!(ranking, Ranking::NoResults);
        assert!(ranking.is_empty());
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let directory = regional_nsw();
        let entries: Vec<_> = directory.iter().collect();
        let ranker = ProximityRanker {
            region_fallback: false,
            ..ProximityRanker::default()
        };
        let ranking = ranker.rank(
            &entries,
            &ResolvedCoordinates::new(),
            SYDNEY,
            SearchRadius::Km25,
        );
        assert_eq!(ranking, Ranking::NoResults);
    }

    #[test]
    fn test_parallel_distances_match_sequential() {
        let directory = regional_nsw();
        let entries: Vec<_> = directory.iter().collect();
        let coordinates = ResolvedCoordinates::new();

        let sequential = ProximityRanker::default().distances(&entries, &coordinates, SYDNEY);
        let parallel = ProximityRanker {
            parallel_threshold: 0,
            ..ProximityRanker::default()
        }
        .distances(&entries, &coordinates, SYDNEY);
        assert_eq!(sequential, parallel);
    }
}
