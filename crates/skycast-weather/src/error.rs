//! Lookup error taxonomy.
//!
//! `Display` carries diagnostic detail for logs; [`LookupError::user_message`]
//! is the text shown to the person who typed the query.

use std::fmt;

use thiserror::Error;

use crate::retry::RequestError;
use crate::transport::TransportError;

/// Which upstream call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Geocoding search for the given place name
    Place(String),
    Forecast,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Place(name) => write!(f, "geocoding lookup for '{}'", name),
            Target::Forecast => write!(f, "forecast request"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Upstream circuit is open; request not attempted")]
    ServiceUnavailable,

    #[error("Network error during {target}: {source}")]
    Network {
        target: Target,
        source: TransportError,
    },

    #[error("{target} failed with HTTP {status}")]
    LookupFailed { target: Target, status: u16 },

    #[error("No places match '{name}'")]
    NotFound { name: String },

    #[error("Unusable response from {target}: {reason}")]
    DataUnavailable { target: Target, reason: String },
}

impl LookupError {
    /// Classify the terminal failure of a retried call.
    pub fn from_request(target: Target, err: RequestError) -> Self {
        match err {
            RequestError::Transport(source) => LookupError::Network { target, source },
            RequestError::Status(status) => LookupError::LookupFailed { target, status },
        }
    }

    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceUnavailable => {
                "Service is currently unavailable. Please try again later.".to_string()
            }
            Self::Network {
                target: Target::Place(name),
                ..
            } => format!("Network error while looking up {}.", name),
            Self::Network {
                target: Target::Forecast,
                ..
            } => "Network error while fetching weather data.".to_string(),
            Self::LookupFailed {
                target: Target::Place(name),
                ..
            }
            | Self::DataUnavailable {
                target: Target::Place(name),
                ..
            } => format!("Location {} lookup failed.", name),
            Self::LookupFailed {
                target: Target::Forecast,
                ..
            } => "Weather request failed.".to_string(),
            Self::NotFound { .. } => "Could not find that place.".to_string(),
            Self::DataUnavailable {
                target: Target::Forecast,
                ..
            } => "Weather data unavailable.".to_string(),
        }
    }

    /// Whether this failure was counted against the circuit breaker.
    pub fn is_upstream_fault(&self) -> bool {
        !matches!(self, Self::ServiceUnavailable | Self::NotFound { .. })
    }
}
