//! Forward geocoding: turn a typed place name into coordinates.
//! Uses the Open-Meteo geocoding search - free, no API key required.

use std::cmp::Reverse;

use skycast_core::EndpointConfig;
use tracing::instrument;

use crate::error::{LookupError, Target};
use crate::types::{GeocodeCandidate, GeocodeResponse, LocationQuery, ResolvedPlace};
use crate::upstream::Upstream;

#[derive(Debug, Clone)]
pub struct GeocodeEndpoint {
    pub base_url: String,
    pub result_count: u32,
    pub language: String,
}

impl From<&EndpointConfig> for GeocodeEndpoint {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            base_url: config.geocoding_url.clone(),
            result_count: config.result_count,
            language: config.language.clone(),
        }
    }
}

#[derive(Clone)]
pub struct LocationResolver {
    upstream: Upstream,
    endpoint: GeocodeEndpoint,
}

impl LocationResolver {
    pub fn new(upstream: Upstream, endpoint: GeocodeEndpoint) -> Self {
        Self { upstream, endpoint }
    }

    /// Resolve a raw query such as `"paris, tx"` to a single place.
    ///
    /// An empty candidate list is a valid answer and yields `NotFound`
    /// without counting against the breaker.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, raw_query: &str) -> Result<ResolvedPlace, LookupError> {
        let query = LocationQuery::parse(raw_query);
        let target = Target::Place(query.name.clone());
        let url = self.search_url(&query.name);

        let response = self.upstream.get(&target, &url).await?;

        let body: GeocodeResponse = match response.json() {
            Ok(body) => body,
            Err(e) => {
                let err = LookupError::DataUnavailable {
                    target,
                    reason: e.to_string(),
                };
                self.upstream.fail(&err);
                return Err(err);
            }
        };

        let candidates = body.results.unwrap_or_default();
        let Some(best) = pick_best(&candidates, &query.name, &query.hint) else {
            tracing::info!("No geocoding results for {}", query.name);
            return Err(LookupError::NotFound { name: query.name });
        };

        self.upstream.succeed();

        let place = ResolvedPlace::from(best);
        tracing::info!(
            candidates = candidates.len(),
            "Resolved to {} ({}, {})",
            place.display_name(),
            place.latitude,
            place.longitude
        );
        Ok(place)
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}?name={}&count={}&language={}&format=json",
            self.endpoint.base_url,
            urlencoding::encode(name),
            self.endpoint.result_count,
            urlencoding::encode(&self.endpoint.language),
        )
    }
}

/// Pick the best match for `name` among `candidates`.
///
/// 1. A non-empty `hint` narrows the list to candidates whose country, admin1
///    or admin2 contains it, or whose country code equals it (all
///    case-insensitive). A US postal abbreviation ("tx") also matches the
///    state it stands for in admin1, so "paris, tx" lands on Paris, Texas.
///    This also narrows abbreviations that plain substring matching would
///    ignore: "portland, me" picks Maine instead of falling back to the
///    full list and the larger Portland, Oregon. If nothing matches, the
///    full list is kept.
/// 2. Candidates whose name equals `name` (case-insensitive) are preferred; if
///    there are none, the pool from step 1 is kept.
/// 3. The highest population wins (missing counts as 0). Ties go to the
///    earliest candidate.
///
/// Returns `None` only for an empty candidate list.
pub fn pick_best<'a>(
    candidates: &'a [GeocodeCandidate],
    name: &str,
    hint: &str,
) -> Option<&'a GeocodeCandidate> {
    let all: Vec<&GeocodeCandidate> = candidates.iter().collect();

    let pool = if hint.is_empty() {
        all
    } else {
        let hint = hint.to_lowercase();
        let hinted: Vec<&GeocodeCandidate> = all
            .iter()
            .copied()
            .filter(|c| matches_hint(c, &hint))
            .collect();
        if hinted.is_empty() {
            all
        } else {
            hinted
        }
    };

    let name = name.to_lowercase();
    let exact: Vec<&GeocodeCandidate> = pool
        .iter()
        .copied()
        .filter(|c| lower(&c.name) == name)
        .collect();
    let pool = if exact.is_empty() { pool } else { exact };

    // min_by_key keeps the first of equal keys
    pool.into_iter()
        .min_by_key(|c| Reverse(c.population_or_zero()))
}

fn matches_hint(candidate: &GeocodeCandidate, hint: &str) -> bool {
    let admin1 = lower(&candidate.admin1);
    lower(&candidate.country).contains(hint)
        || admin1.contains(hint)
        || lower(&candidate.admin2).contains(hint)
        || lower(&candidate.country_code) == hint
        || us_state_name(hint).is_some_and(|state| admin1 == state)
}

/// Full lowercase state name for a lowercase USPS abbreviation.
fn us_state_name(abbreviation: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(code, _)| *code == abbreviation)
        .map(|(_, name)| *name)
}

const US_STATES: &[(&str, &str)] = &[
    ("al", "alabama"),
    ("ak", "alaska"),
    ("az", "arizona"),
    ("ar", "arkansas"),
    ("ca", "california"),
    ("co", "colorado"),
    ("ct", "connecticut"),
    ("de", "delaware"),
    ("dc", "district of columbia"),
    ("fl", "florida"),
    ("ga", "georgia"),
    ("hi", "hawaii"),
    ("id", "idaho"),
    ("il", "illinois"),
    ("in", "indiana"),
    ("ia", "iowa"),
    ("ks", "kansas"),
    ("ky", "kentucky"),
    ("la", "louisiana"),
    ("me", "maine"),
    ("md", "maryland"),
    ("ma", "massachusetts"),
    ("mi", "michigan"),
    ("mn", "minnesota"),
    ("ms", "mississippi"),
    ("mo", "missouri"),
    ("mt", "montana"),
    ("ne", "nebraska"),
    ("nv", "nevada"),
    ("nh", "new hampshire"),
    ("nj", "new jersey"),
    ("nm", "new mexico"),
    ("ny", "new york"),
    ("nc", "north carolina"),
    ("nd", "north dakota"),
    ("oh", "ohio"),
    ("ok", "oklahoma"),
    ("or", "oregon"),
    ("pa", "pennsylvania"),
    ("ri", "rhode island"),
    ("sc", "south carolina"),
    ("sd", "south dakota"),
    ("tn", "tennessee"),
    ("tx", "texas"),
    ("ut", "utah"),
    ("vt", "vermont"),
    ("va", "virginia"),
    ("wa", "washington"),
    ("wv", "west virginia"),
    ("wi", "wisconsin"),
    ("wy", "wyoming"),
];

fn lower(field: &Option<String>) -> String {
    field.as_deref().unwrap_or_default().to_lowercase()
}
