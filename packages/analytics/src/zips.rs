//! Zip attribution for crime incidents.
//!
//! Crime exports rarely carry a zip, so an incident without one takes the
//! zip of the nearest decay-indicator zip centroid.

use decay_map_decay_models::{CrimeIncident, DecayIndicator};
use decay_map_spatial::ZipCentroids;

/// Zip per crime, in input order.
#[derive(Debug, Clone, Default)]
pub struct CrimeZips {
    /// Attributed zip for each crime (`None` when nothing could be found).
    pub zips: Vec<Option<String>>,
    /// How many crimes took their zip from a centroid.
    pub from_centroid: u64,
    /// How many crimes ended up without a zip.
    pub unattributed: u64,
}

impl CrimeZips {
    /// Zip of the crime at `index`.
    #[must_use]
    pub fn zip(&self, index: usize) -> Option<&str> {
        self.zips.get(index).and_then(|z| z.as_deref())
    }
}

/// Centroids built from the zips carried by decay indicators.
#[must_use]
pub fn indicator_centroids(indicators: &[DecayIndicator]) -> ZipCentroids {
    ZipCentroids::build(indicators.iter().filter_map(|ind| {
        ind.point
            .zip_code
            .as_deref()
            .map(|zip| (zip, ind.point.latitude(), ind.point.longitude()))
    }))
}

/// Attributes every crime to a zip.
#[must_use]
pub fn attribute_crimes(crimes: &[CrimeIncident], indicators: &[DecayIndicator]) -> CrimeZips {
    let centroids = indicator_centroids(indicators);
    let mut result = CrimeZips {
        zips: Vec::with_capacity(crimes.len()),
        ..CrimeZips::default()
    };

    for crime in crimes {
        let own = crime
            .point
            .zip_code
            .as_deref()
            .filter(|zip| !zip.is_empty());
        let zip = if let Some(zip) = own {
            Some(zip.to_owned())
        } else {
            let nearest = centroids
                .nearest_zip(crime.point.latitude(), crime.point.longitude())
                .map(str::to_owned);
            if nearest.is_some() {
                result.from_centroid += 1;
            }
            nearest
        };
        if zip.is_none() {
            result.unattributed += 1;
        }
        result.zips.push(zip);
    }

    if result.unattributed > 0 {
        log::warn!(
            "{} of {} crimes could not be attributed to a zip",
            result.unattributed,
            crimes.len()
        );
    }
    log::debug!(
        "{} crimes took the zip of the nearest centroid ({} centroids)",
        result.from_centroid,
        centroids.len()
    );

    result
}


#[cfg(test)]
mod tests {
    use super::fixtures::{crime, indicator};
    use super::*;
    use decay_map_decay_models::DecayType;

    #[test]
    fn own_zip_wins_over_centroid() {
        let indicators = vec![indicator(43.05, -76.15, DecayType::Unfit, Some("13205"))];
        let crimes = vec![crime(43.05, -76.15, "LARCENY", Some("13210"))];
        let zips = attribute_crimes(&crimes, &indicators);
        assert_eq!(zips.zip(0), Some("13210"));
        assert_eq!(zips.from_centroid, 0);
    }

    #[test]
    fn missing_zip_takes_nearest_centroid() {
        let indicators = vec![
            indicator(43.00, -76.10, DecayType::Unfit, Some("13205")),
            indicator(43.10, -76.20, DecayType::Vacant, Some("13204")),
        ];
        let crimes = vec![
            crime(43.01, -76.11, "LARCENY", None),
            crime(43.09, -76.19, "ROBBERY", None),
        ];
        let zips = attribute_crimes(&crimes, &indicators);
        assert_eq!(zips.zip(0), Some("13205"));
        assert_eq!(zips.zip(1), Some("13204"));
        assert_eq!(zips.from_centroid, 2);
        assert_eq!(zips.unattributed, 0);
    }

    #[test]
    fn no_centroids_leaves_crime_unattributed() {
        let indicators = vec![indicator(43.0, -76.1, DecayType::Unfit, None)];
        let crimes = vec![crime(43.0, -76.1, "LARCENY", None)];
        let zips = attribute_crimes(&crimes, &indicators);
        assert_eq!(zips.zip(0), None);
        assert_eq!(zips.unattributed, 1);
    }
}
