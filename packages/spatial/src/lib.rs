#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial indexes for the proximity join and the hotspot grid.
//!
//! Points are stored in an R-tree as unit vectors on the sphere. Chord
//! length between unit vectors grows monotonically with great-circle
//! distance, so an axis-aligned box around the query vector bounds every
//! candidate within a given distance; candidates are then measured exactly
//! with the haversine formula.

pub mod grid;
pub mod zip;

use rstar::{AABB, RTree, RTreeObject};

pub use grid::{CellId, Grid};
pub use zip::ZipCentroids;

/// Mean Earth radius used for every distance in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Search half-width for the first nearest-neighbour search.
const INITIAL_SEARCH_M: f64 = 250.0;

/// Slack applied to chord bounds so float rounding never excludes a
/// point that sits exactly on the search radius.
const CHORD_SLACK: f64 = 1.0 + 1e-9;

/// Great-circle distance in meters between two WGS84 points.
#[must_use]
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Converts a lat/lng pair to a unit vector.
fn to_unit_vector(lat: f64, lng: f64) -> [f64; 3] {
    let phi = lat.to_radians();
    let lambda = lng.to_radians();
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

/// Chord length on the unit sphere for a great-circle distance in meters.
fn chord_for_distance(distance_m: f64) -> f64 {
    let theta = (distance_m / EARTH_RADIUS_M).min(std::f64::consts::PI);
    2.0 * (theta / 2.0).sin() * CHORD_SLACK
}

/// An indexed point stored in the R-tree.
struct IndexedPoint {
    position: [f64; 3],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// A match returned by [`ProximityIndex`] queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the matched point in the slice the index was built from.
    pub index: usize,
    /// Great-circle distance to the query point, in meters.
    pub distance_m: f64,
}

/// Nearest-neighbour and radius index over a fixed set of points.
///
/// Built once per analysis pass and queried read-only. Duplicate
/// coordinates are kept as separate entries.
pub struct ProximityIndex {
    tree: RTree<IndexedPoint>,
    coordinates: Vec<(f64, f64)>,
}

impl ProximityIndex {
    /// Builds an index from `(latitude, longitude)` pairs.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let coordinates: Vec<(f64, f64)> = points.into_iter().collect();
        let entries = coordinates
            .iter()
            .enumerate()
            .map(|(index, &(lat, lng))| IndexedPoint {
                position: to_unit_vector(lat, lng),
                index,
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built proximity index over {} points", tree.size());

        Self { tree, coordinates }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Nearest indexed point to a query location. Ties resolve to the
    /// lowest index. Returns `None` for an empty index.
    #[must_use]
    pub fn nearest(&self, lat: f64, lng: f64) -> Option<Neighbor> {
        if self.is_empty() {
            return None;
        }

        // Grow a box until it holds a candidate, then search the box that
        // contains the whole ball around that candidate's distance.
        let query = to_unit_vector(lat, lng);
        let mut half_width = chord_for_distance(INITIAL_SEARCH_M);
        loop {
            if let Some(candidate) = self.closest_in_box(query, lat, lng, half_width) {
                let bound = chord_for_distance(candidate.distance_m);
                if bound <= half_width {
                    return Some(candidate);
                }
                return self.closest_in_box(query, lat, lng, bound);
            }
            // Any box wider than the sphere's diameter holds every point.
            if half_width > 2.0 {
                return None;
            }
            half_width *= 4.0;
        }
    }

    /// Every indexed point within `radius_m` of the query location, sorted
    /// by distance and then by index.
    #[must_use]
    pub fn within(&self, lat: f64, lng: f64, radius_m: f64) -> Vec<Neighbor> {
        if self.is_empty() || radius_m < 0.0 {
            return Vec::new();
        }

        let query = to_unit_vector(lat, lng);
        let mut matches: Vec<Neighbor> = self
            .candidates(query, chord_for_distance(radius_m))
            .map(|entry| self.measure(entry.index, lat, lng))
            .filter(|n| n.distance_m <= radius_m)
            .collect();
        matches.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then(a.index.cmp(&b.index))
        });
        matches
    }

    fn candidates(
        &self,
        center: [f64; 3],
        half_width: f64,
    ) -> impl Iterator<Item = &IndexedPoint> + '_ {
        let envelope = AABB::from_corners(
            [
                center[0] - half_width,
                center[1] - half_width,
                center[2] - half_width,
            ],
            [
                center[0] + half_width,
                center[1] + half_width,
                center[2] + half_width,
            ],
        );
        self.tree.locate_in_envelope_intersecting(&envelope)
    }

    fn closest_in_box(
        &self,
        center: [f64; 3],
        lat: f64,
        lng: f64,
        half_width: f64,
    ) -> Option<Neighbor> {
        let mut best: Option<Neighbor> = None;

        for entry in self.candidates(center, half_width) {
            let candidate = self.measure(entry.index, lat, lng);
            match best {
                None => best = Some(candidate),
                Some(current)
                    if candidate.distance_m < current.distance_m
                        || (candidate.distance_m == current.distance_m
                            && candidate.index < current.index) =>
                {
                    best = Some(candidate);
                }
                _ => {}
            }
        }

        best
    }

    fn measure(&self, index: usize, lat: f64, lng: f64) -> Neighbor {
        let (p_lat, p_lng) = self.coordinates[index];
        Neighbor {
            index,
            distance_m: haversine_m(lat, lng, p_lat, p_lng),
        }
    }
}

/// Moves a point `distance_m` due north (positive) or south (negative).
/// Used to place test points at exact distances.
#[must_use]
pub fn offset_north(lat: f64, lng: f64, distance_m: f64) -> (f64, f64) {
    (lat + (distance_m / EARTH_RADIUS_M).to_degrees(), lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // Syracuse City Hall to Carrier Dome, roughly 1.6 km.
        let d = haversine_m(43.0495, -76.1474, 43.0362, -76.1363);
        assert!((1_600.0..1_800.0).contains(&d), "got {d}");
        assert!(haversine_m(43.0, -76.0, 43.0, -76.0).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn empty_index_has_no_neighbor() {
        let index = ProximityIndex::new(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.nearest(13.0, -75.0), None);
        assert!(index.within(13.0, -75.0, 500.0).is_empty());
    }

    #[test]
    fn nearest_matches_brute_force() {
        let points: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let i = f64::from(i);
                (43.0 + (i * 0.37).sin() * 0.05, -76.1 + (i * 0.11).cos() * 0.05)
            })
            .collect();
        let index = ProximityIndex::new(points.clone());

        for &(q_lat, q_lng) in &[(43.01, -76.12), (43.2, -76.5), (42.0, -75.0)] {
            let expected = points
                .iter()
                .map(|&(lat, lng)| haversine_m(q_lat, q_lng, lat, lng))
                .fold(f64::INFINITY, f64::min);
            let found = index.nearest(q_lat, q_lng).unwrap();
            assert!((found.distance_m - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn nearest_finds_distant_point() {
        let index = ProximityIndex::new(vec![(-33.86, 151.21)]);
        let found = index.nearest(43.05, -76.15).unwrap();
        assert_eq!(found.index, 0);
        assert!(found.distance_m > 15_000_000.0);
    }

    #[test]
    fn within_radius_sorted() {
        let origin = (13.0, -75.0);
        let near = offset_north(origin.0, origin.1, 50.0);
        let mid = offset_north(origin.0, origin.1, 150.0);
        let far = offset_north(origin.0, origin.1, 900.0);
        let index = ProximityIndex::new(vec![far, mid, near]);

        let found = index.within(origin.0, origin.1, 200.0);
        let order: Vec<usize> = found.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![2, 1]);
        assert!((found[0].distance_m - 50.0).abs() < 1e-6);
    }

    #[test]
    fn duplicates_are_kept() {
        let index = ProximityIndex::new(vec![(43.0, -76.0), (43.0, -76.0)]);
        assert_eq!(index.within(43.0, -76.0, 1.0).len(), 2);
        assert_eq!(index.nearest(43.0, -76.0).unwrap().index, 0);
    }
}
