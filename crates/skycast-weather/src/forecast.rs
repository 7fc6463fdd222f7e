use chrono::NaiveDateTime;
use skycast_core::EndpointConfig;
use tracing::instrument;

use crate::error::{LookupError, Target};
use crate::types::{CurrentWeatherPayload, ForecastResponse, ResolvedPlace, WeatherCondition, WeatherSnapshot};
use crate::upstream::Upstream;

/// Open-Meteo reports `current_weather.time` as ISO-8601 without seconds.
const TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Clone)]
pub struct WeatherFetcher {
    upstream: Upstream,
    base_url: String,
}

impl WeatherFetcher {
    pub fn new(upstream: Upstream, base_url: impl Into<String>) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(upstream: Upstream, config: &EndpointConfig) -> Self {
        Self::new(upstream, config.forecast_url.clone())
    }

    /// Current weather at the given coordinates.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, LookupError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current_weather=true",
            self.base_url, latitude, longitude
        );

        let response = self.upstream.get(&Target::Forecast, &url).await?;

        let snapshot = response
            .json::<ForecastResponse>()
            .map_err(|e| e.to_string())
            .and_then(|body| {
                body.current_weather
                    .ok_or_else(|| "response has no current_weather".to_string())
            })
            .and_then(snapshot_from_payload);

        match snapshot {
            Ok(snapshot) => {
                self.upstream.succeed();
                tracing::debug!(
                    temperature = snapshot.temperature,
                    windspeed = snapshot.windspeed,
                    "Fetched current weather"
                );
                Ok(snapshot)
            }
            Err(reason) => {
                let err = LookupError::DataUnavailable {
                    target: Target::Forecast,
                    reason,
                };
                self.upstream.fail(&err);
                Err(err)
            }
        }
    }

    pub async fn fetch_for(&self, place: &ResolvedPlace) -> Result<WeatherSnapshot, LookupError> {
        self.fetch(place.latitude, place.longitude).await
    }
}

fn snapshot_from_payload(payload: CurrentWeatherPayload) -> Result<WeatherSnapshot, String> {
    let observed_at = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&payload.time, fmt).ok())
        .ok_or_else(|| format!("unrecognised observation time '{}'", payload.time))?;

    Ok(WeatherSnapshot {
        temperature: payload.temperature,
        windspeed: payload.windspeed,
        wind_direction: payload.winddirection,
        condition: payload.weathercode.and_then(WeatherCondition::from_wmo_code),
        observed_at,
    })
}
