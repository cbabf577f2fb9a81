//! In-memory nearest-airport search

use super::{Airport, AirportLookup, AirportQuery};

/// Mean Earth radius in meters
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine)
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Linear-scan airport finder over a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticAirportFinder {
    airports: Vec<Airport>,
}

impl StaticAirportFinder {
    pub fn new(airports: Vec<Airport>) -> Self {
        Self { airports }
    }

    /// Number of airports loaded
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl AirportLookup for StaticAirportFinder {
    fn find_nearest(&self, query: &AirportQuery) -> Vec<Airport> {
        let mut hits: Vec<(f64, &Airport)> = self
            .airports
            .iter()
            .filter(|a| query.filter.accepts(a.airport_type))
            .map(|a| {
                let d = distance_meters(
                    query.latitude,
                    query.longitude,
                    a.latitude_deg,
                    a.longitude_deg,
                );
                (d, a)
            })
            .filter(|(d, _)| *d <= query.radius_meters)
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter()
            .take(query.max_airports)
            .map(|(_, a)| a.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::{AirportFilter, AirportType};

    fn airport(icao: &str, airport_type: AirportType, lat: f64, lon: f64) -> Airport {
        Airport {
            airport_type,
            icao: icao.into(),
            name: format!("{} airport", icao),
            latitude_deg: lat,
            longitude_deg: lon,
            elevation_ft: 100,
        }
    }

    fn finder() -> StaticAirportFinder {
        StaticAirportFinder::new(vec![
            airport("LSZH", AirportType::LargeAirport, 47.4647, 8.5492),
            airport("LSZR", AirportType::MediumAirport, 47.4850, 9.5608),
            airport("LSMD", AirportType::SmallAirport, 47.3986, 8.6481),
            airport("LSGG", AirportType::LargeAirport, 46.2381, 6.1090),
        ])
    }

    fn query(filter: AirportFilter, radius: f64, max: usize) -> AirportQuery {
        AirportQuery {
            latitude: 47.45,
            longitude: 8.55,
            radius_meters: radius,
            max_airports: max,
            filter,
        }
    }

    #[test]
    fn test_distance() {
        // One degree along the equator
        let degree = 2.0 * std::f64::consts::PI * EARTH_RADIUS_METERS / 360.0;
        let d = distance_meters(0.0, 0.0, 0.0, 1.0);
        assert!((d - degree).abs() < 1e-6, "got {}", d);

        // Zurich to Geneva is about 230 km
        let d = distance_meters(47.4647, 8.5492, 46.2381, 6.1090);
        assert!((225_000.0..235_000.0).contains(&d), "got {}", d);
        assert_eq!(distance_meters(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_nearest_first_within_radius() {
        let found = finder().find_nearest(&query(AirportFilter::ALL, 50_000.0, 10));
        let icaos: Vec<_> = found.iter().map(|a| a.icao.as_str()).collect();
        assert_eq!(icaos, vec!["LSZH", "LSMD"]);
    }

    #[test]
    fn test_max_count() {
        let found = finder().find_nearest(&query(AirportFilter::ALL, 500_000.0, 3));
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].icao, "LSZH");
    }

    #[test]
    fn test_filter() {
        let filter = AirportFilter::parse("small_airport");
        let found = finder().find_nearest(&query(filter, 500_000.0, 10));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].icao, "LSMD");
    }

    #[test]
    fn test_empty_result() {
        let found =
            StaticAirportFinder::default().find_nearest(&query(AirportFilter::ALL, 1.0, 10));
        assert!(found.is_empty());
    }
}
