//! Geocode-then-forecast chain.
//!
//! The two calls are strictly sequential since the forecast needs the
//! resolved coordinates. Both go through one shared breaker.

use std::sync::Arc;
use std::time::Duration;

use skycast_core::Config;
use tracing::instrument;

use crate::breaker::{BreakerSettings, CircuitBreaker};
use crate::clock::{Clock, SystemClock};
use crate::error::LookupError;
use crate::forecast::WeatherFetcher;
use crate::geocode::{GeocodeEndpoint, LocationResolver};
use crate::retry::{RetryPolicy, RetryingRequester};
use crate::transport::{ReqwestTransport, Transport, TransportError};
use crate::types::LookupReport;
use crate::upstream::Upstream;

#[derive(Clone)]
pub struct WeatherLookup {
    resolver: LocationResolver,
    fetcher: WeatherFetcher,
    breaker: Arc<CircuitBreaker>,
}

impl WeatherLookup {
    /// Build a lookup backed by reqwest and the system clock.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.endpoints.timeout_secs))?;
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(SystemClock)))
    }

    pub fn with_parts(config: &Config, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::from(&config.breaker)));
        let requester = RetryingRequester::new(transport, RetryPolicy::from(&config.retry));
        let upstream = Upstream::new(requester, breaker.clone(), clock);

        Self {
            resolver: LocationResolver::new(
                upstream.clone(),
                GeocodeEndpoint::from(&config.endpoints),
            ),
            fetcher: WeatherFetcher::from_config(upstream, &config.endpoints),
            breaker,
        }
    }

    /// Resolve `raw_query` and fetch current weather for the winning place.
    #[instrument(skip(self), level = "info")]
    pub async fn lookup(&self, raw_query: &str) -> Result<LookupReport, LookupError> {
        let place = self.resolver.resolve(raw_query).await?;
        let weather = self.fetcher.fetch_for(&place).await?;
        Ok(LookupReport { place, weather })
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &WeatherFetcher {
        &self.fetcher
    }

    /// Shared upstream health gate
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}
