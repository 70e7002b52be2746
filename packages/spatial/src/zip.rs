//! Zip code centroids for attributing points without a zip.
//!
//! Centroids are the mean position of every point carrying a given
//! five-digit zip. Anything else (ZIP+4 leftovers, partial codes) is
//! ignored so it cannot become a bogus centroid.

use std::collections::BTreeMap;

use crate::ProximityIndex;

/// Nearest-centroid lookup over zip codes.
pub struct ZipCentroids {
    zips: Vec<String>,
    centroids: Vec<(f64, f64)>,
    index: ProximityIndex,
}

impl ZipCentroids {
    /// Builds centroids from `(zip, latitude, longitude)` triples.
    #[must_use]
    pub fn build<'a>(points: impl IntoIterator<Item = (&'a str, f64, f64)>) -> Self {
        let mut sums: BTreeMap<&'a str, (f64, f64, u32)> = BTreeMap::new();
        for (zip, lat, lng) in points {
            if !is_five_digit_zip(zip) {
                continue;
            }
            let entry = sums.entry(zip).or_insert((0.0, 0.0, 0));
            entry.0 += lat;
            entry.1 += lng;
            entry.2 += 1;
        }

        let mut zips = Vec::with_capacity(sums.len());
        let mut centroids = Vec::with_capacity(sums.len());
        for (zip, (lat_sum, lng_sum, count)) in sums {
            let n = f64::from(count);
            zips.push(zip.to_owned());
            centroids.push((lat_sum / n, lng_sum / n));
        }

        log::debug!("Computed {} zip centroids", zips.len());

        let index = ProximityIndex::new(centroids.iter().copied());
        Self {
            zips,
            centroids,
            index,
        }
    }

    /// Zip of the centroid nearest to a point.
    #[must_use]
    pub fn nearest_zip(&self, lat: f64, lng: f64) -> Option<&str> {
        self.index
            .nearest(lat, lng)
            .map(|neighbor| self.zips[neighbor.index].as_str())
    }

    /// Centroid of a zip as `(latitude, longitude)`.
    #[must_use]
    pub fn centroid(&self, zip: &str) -> Option<(f64, f64)> {
        self.zips
            .binary_search_by(|z| z.as_str().cmp(zip))
            .ok()
            .map(|i| self.centroids[i])
    }

    /// Number of zips with a centroid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zips.len()
    }

    /// Whether no centroid could be formed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zips.is_empty()
    }
}

/// Whether a zip is a plain five-digit code.
#[must_use]
pub fn is_five_digit_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_is_mean_position() {
        let centroids = ZipCentroids::build(vec![
            ("13205", 43.00, -76.10),
            ("13205", 43.02, -76.12),
            ("13210", 43.04, -76.13),
        ]);
        assert_eq!(centroids.len(), 2);
        let (lat, lng) = centroids.centroid("13205").unwrap();
        assert!((lat - 43.01).abs() < 1e-12);
        assert!((lng + 76.11).abs() < 1e-12);
        assert_eq!(centroids.centroid("99999"), None);
    }

    #[test]
    fn nearest_zip_picks_closest_centroid() {
        let centroids = ZipCentroids::build(vec![("13205", 43.00, -76.10), ("13210", 43.04, -76.13)]);
        assert_eq!(centroids.nearest_zip(43.035, -76.13), Some("13210"));
        assert_eq!(centroids.nearest_zip(42.99, -76.09), Some("13205"));
    }

    #[test]
    fn ignores_malformed_zips() {
        let centroids = ZipCentroids::build(vec![("1320", 43.0, -76.1), ("ABCDE", 43.0, -76.1)]);
        assert!(centroids.is_empty());
        assert_eq!(centroids.nearest_zip(43.0, -76.1), None);
    }

    #[test]
    fn five_digit_check() {
        assert!(is_five_digit_zip("13205"));
        assert!(!is_five_digit_zip("1320"));
        assert!(!is_five_digit_zip("13205-1234"));
    }
}
