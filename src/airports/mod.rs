//! Nearest-airport lookups
//!
//! The relay answers `airports` queries through the [`AirportLookup`] trait.
//! [`StaticAirportFinder`] searches an in-memory list by great-circle
//! distance.

pub mod finder;

pub use finder::StaticAirportFinder;

/// Default search radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 50_000.0;

/// Default maximum number of airports returned
pub const DEFAULT_MAX_AIRPORTS: usize = 10;

/// Airport category, as named in the OurAirports data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AirportType {
    SmallAirport,
    MediumAirport,
    LargeAirport,
    Heliport,
    SeaplaneBase,
    BalloonPort,
    Closed,
}

impl AirportType {
    const ALL: [AirportType; 7] = [
        AirportType::SmallAirport,
        AirportType::MediumAirport,
        AirportType::LargeAirport,
        AirportType::Heliport,
        AirportType::SeaplaneBase,
        AirportType::BalloonPort,
        AirportType::Closed,
    ];

    /// Parse a type name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name.trim())
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AirportType::SmallAirport => "small_airport",
            AirportType::MediumAirport => "medium_airport",
            AirportType::LargeAirport => "large_airport",
            AirportType::Heliport => "heliport",
            AirportType::SeaplaneBase => "seaplane_base",
            AirportType::BalloonPort => "balloonport",
            AirportType::Closed => "closed",
        }
    }

    /// Bit in an [`AirportFilter`] mask
    pub fn bit(&self) -> u64 {
        1 << (*self as u64)
    }
}

/// Bitmask of accepted airport types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirportFilter(pub u64);

impl AirportFilter {
    /// Accept every type
    pub const ALL: AirportFilter = AirportFilter((1 << 7) - 1);

    /// Parse a `|`-separated list of type names
    ///
    /// Unknown names contribute nothing, so a filter made only of unknown
    /// names matches no airport.
    pub fn parse(filter: &str) -> Self {
        let mask = filter
            .split('|')
            .filter_map(AirportType::parse)
            .fold(0, |mask, t| mask | t.bit());
        AirportFilter(mask)
    }

    /// Whether this filter accepts `airport_type`
    pub fn accepts(&self, airport_type: AirportType) -> bool {
        self.0 & airport_type.bit() != 0
    }
}

impl Default for AirportFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// An airport record
#[derive(Debug, Clone, PartialEq)]
pub struct Airport {
    pub airport_type: AirportType,
    pub icao: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_ft: i32,
}

/// Parameters of a nearest-airport search
#[derive(Debug, Clone, PartialEq)]
pub struct AirportQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub max_airports: usize,
    pub filter: AirportFilter,
}

/// Nearest-airport search
pub trait AirportLookup: Send + Sync + 'static {
    /// Airports within the query radius, nearest first, at most
    /// `max_airports` of them
    fn find_nearest(&self, query: &AirportQuery) -> Vec<Airport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trip_names() {
        for t in AirportType::ALL {
            assert_eq!(AirportType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AirportType::parse("spaceport"), None);
    }

    #[test]
    fn test_filter_parse() {
        let filter = AirportFilter::parse("large_airport|heliport");
        assert!(filter.accepts(AirportType::LargeAirport));
        assert!(filter.accepts(AirportType::Heliport));
        assert!(!filter.accepts(AirportType::SmallAirport));
    }

    #[test]
    fn test_filter_unknown_names_match_nothing() {
        let filter = AirportFilter::parse("spaceport");
        assert_eq!(filter, AirportFilter(0));
        assert!(!filter.accepts(AirportType::LargeAirport));
    }

    #[test]
    fn test_default_filter_accepts_everything() {
        let filter = AirportFilter::default();
        assert!(AirportType::ALL.iter().all(|t| filter.accepts(*t)));
    }
}
