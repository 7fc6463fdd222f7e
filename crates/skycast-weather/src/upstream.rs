//! Breaker-gated, retried access to the upstream services.
//!
//! Both the geocoding and the forecast paths follow the same pattern:
//! refuse while the breaker is open, retry the call, then report the outcome
//! to the breaker. Failures are recorded and logged before the error is
//! handed back.

use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::clock::Clock;
use crate::error::{LookupError, Target};
use crate::retry::RetryingRequester;
use crate::transport::HttpResponse;

#[derive(Clone)]
pub struct Upstream {
    requester: RetryingRequester,
    breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
}

impl Upstream {
    pub fn new(
        requester: RetryingRequester,
        breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            requester,
            breaker,
            clock,
        }
    }

    /// GET `url` unless the breaker is open.
    pub(crate) async fn get(&self, target: &Target, url: &str) -> Result<HttpResponse, LookupError> {
        if self.breaker.is_open(self.clock.now()) {
            tracing::warn!(%target, "Circuit open, refusing upstream call");
            return Err(LookupError::ServiceUnavailable);
        }

        match self.requester.call(url).await {
            Ok(response) => Ok(response),
            Err(err) => {
                let err = LookupError::from_request(target.clone(), err);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Count `err` against the breaker and log it.
    pub(crate) fn fail(&self, err: &LookupError) {
        self.breaker.record_failure(self.clock.now());
        tracing::error!(error = %err, "Upstream call failed");
    }

    pub(crate) fn succeed(&self) {
        self.breaker.record_success();
    }
}
