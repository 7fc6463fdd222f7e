//! Weather lookup for Skycast
//!
//! Resolves a typed place name through the Open-Meteo geocoding search, then
//! fetches current conditions from the Open-Meteo forecast API. Outbound calls
//! are retried with a fixed backoff and gated by a shared circuit breaker.

pub mod breaker;
pub mod clock;
pub mod error;
pub mod forecast;
pub mod geocode;
pub mod lookup;
pub mod retry;
pub mod transport;
pub mod types;
pub mod upstream;

pub use breaker::{BreakerSettings, CircuitBreaker, CircuitState, CircuitStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LookupError, Target};
pub use forecast::WeatherFetcher;
pub use geocode::{pick_best, GeocodeEndpoint, LocationResolver};
pub use lookup::WeatherLookup;
pub use retry::{with_retry, RequestError, RetryPolicy, RetryingRequester};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::*;
pub use upstream::Upstream;
