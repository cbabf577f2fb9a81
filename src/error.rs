//! Crate-level error type

use std::time::Duration;

use crate::sim::SimError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug)]
pub enum Error {
    /// Socket or listener failure
    Io(std::io::Error),
    /// Simulation source failure
    Sim(SimError),
    /// The simulator could not be reached before the deadline
    ConnectTimeout(Duration),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Sim(e) => write!(f, "Simulation error: {}", e),
            Error::ConnectTimeout(after) => write!(
                f,
                "Establishing a connection with the simulator timed out after {:?}",
                after
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Sim(e) => Some(e),
            Error::ConnectTimeout(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<SimError> for Error {
    fn from(e: SimError) -> Self {
        Error::Sim(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_sim_error_converts_with_source() {
        let err: Error = SimError::NotConnected.into();

        assert!(matches!(err, Error::Sim(SimError::NotConnected)));
        assert!(err.to_string().starts_with("Simulation error:"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_connect_timeout_display() {
        let err = Error::ConnectTimeout(Duration::from_secs(600));

        assert_eq!(
            err.to_string(),
            "Establishing a connection with the simulator timed out after 600s"
        );
        assert!(err.source().is_none());
    }
}
