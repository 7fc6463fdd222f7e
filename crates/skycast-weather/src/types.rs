use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from WMO codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Map a WMO weather code. Codes outside the published table map to `None`.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Option<Self> {
        let condition = match code {
            0 => Self::Clear,
            1..=2 => Self::PartlyCloudy,
            3 => Self::Cloudy,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 | 66 | 67 => Self::Sleet, // freezing drizzle / rain
            61 | 63 | 80 => Self::Rain,
            65 | 81 | 82 => Self::HeavyRain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => return None,
        };
        Some(condition)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Free-text query split into a place name and an optional disambiguating hint.
///
/// `"Paris, Texas"` becomes `{ name: "Paris", hint: "Texas" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    pub name: String,
    /// Empty when the query carried no hint
    pub hint: String,
}

impl LocationQuery {
    /// Split on commas, trim every part and drop the empty ones.
    ///
    /// The first surviving part is the name and the second the hint; anything
    /// after that is ignored. If no part survives, the raw query is the name.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',').map(str::trim).filter(|p| !p.is_empty());
        let name = parts.next().unwrap_or(raw).to_string();
        let hint = parts.next().unwrap_or_default().to_string();
        Self { name, hint }
    }
}

/// One match from the geocoding search. Everything but the coordinates may be
/// missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub admin2: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeocodeCandidate {
    pub fn population_or_zero(&self) -> u64 {
        self.population.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub results: Option<Vec<GeocodeCandidate>>,
}

/// The single place picked for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub country: String,
    /// State or region, when the service reported one
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl ResolvedPlace {
    /// "Name, Country", or just the name when the country is unknown
    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

impl From<&GeocodeCandidate> for ResolvedPlace {
    fn from(candidate: &GeocodeCandidate) -> Self {
        Self {
            name: candidate.name.clone().unwrap_or_default(),
            country: candidate.country.clone().unwrap_or_default(),
            admin1: candidate.admin1.clone().filter(|a| !a.is_empty()),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ForecastResponse {
    #[serde(default)]
    pub current_weather: Option<CurrentWeatherPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CurrentWeatherPayload {
    pub temperature: f64,
    pub windspeed: f64,
    #[serde(default)]
    pub winddirection: Option<f64>,
    #[serde(default)]
    pub weathercode: Option<i32>,
    pub time: String,
}

/// Current conditions at a coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// °C
    pub temperature: f64,
    /// km/h
    pub windspeed: f64,
    /// Degrees, meteorological convention
    pub wind_direction: Option<f64>,
    pub condition: Option<WeatherCondition>,
    /// Observation time as reported (GMT unless a timezone was requested)
    pub observed_at: NaiveDateTime,
}

/// A resolved place together with its current weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupReport {
    pub place: ResolvedPlace,
    pub weather: WeatherSnapshot,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_parse_name_and_hint() {
        let q = LocationQuery::parse("Paris, Texas");
        assert_eq!(q.name, "Paris");
        assert_eq!(q.hint, "Texas");
    }

    #[test]
    fn test_parse_without_comma() {
        let q = LocationQuery::parse("  Springfield ");
        assert_eq!(q.name, "Springfield");
        assert_eq!(q.hint, "");
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(LocationQuery::parse("Paris,").hint, "");
        assert_eq!(LocationQuery::parse("Paris,,France").hint, "France");
        assert_eq!(LocationQuery::parse(" , Paris").name, "Paris");
    }

    #[test]
    fn test_parse_ignores_extra_segments() {
        let q = LocationQuery::parse("Portland, Oregon, USA");
        assert_eq!(q.name, "Portland");
        assert_eq!(q.hint, "Oregon");
    }

    #[test]
    fn test_parse_only_commas_keeps_raw() {
        let q = LocationQuery::parse(",,");
        assert_eq!(q.name, ",,");
        assert_eq!(q.hint, "");
    }

    #[test]
    fn test_candidate_with_missing_fields() {
        let c: GeocodeCandidate =
            serde_json::from_str(r#"{"name":"Nowhere","latitude":1.5,"longitude":-2.0}"#).unwrap();
        assert_eq!(c.country, None);
        assert_eq!(c.population_or_zero(), 0);
    }

    #[test]
    fn test_empty_geocode_response() {
        let r: GeocodeResponse = serde_json::from_str("{}").unwrap();
        assert!(r.results.is_none());

        let r: GeocodeResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(r.results.is_none());
    }

    #[test]
    fn test_display_name() {
        let place = ResolvedPlace {
            name: "Paris".into(),
            country: "France".into(),
            admin1: None,
            latitude: 48.85,
            longitude: 2.35,
        };
        assert_eq!(place.display_name(), "Paris, France");

        let bare = ResolvedPlace {
            country: String::new(),
            ..place
        };
        assert_eq!(bare.display_name(), "Paris");
    }

    #[test]
    fn test_wmo_codes() {
        assert_eq!(WeatherCondition::from_wmo_code(0), Some(WeatherCondition::Clear));
        assert_eq!(WeatherCondition::from_wmo_code(2), Some(WeatherCondition::PartlyCloudy));
        assert_eq!(WeatherCondition::from_wmo_code(48), Some(WeatherCondition::Fog));
        assert_eq!(WeatherCondition::from_wmo_code(57), Some(WeatherCondition::Sleet));
        assert_eq!(WeatherCondition::from_wmo_code(67), Some(WeatherCondition::Sleet));
        assert_eq!(WeatherCondition::from_wmo_code(82), Some(WeatherCondition::HeavyRain));
        assert_eq!(WeatherCondition::from_wmo_code(86), Some(WeatherCondition::Snow));
        assert_eq!(WeatherCondition::from_wmo_code(99), Some(WeatherCondition::Thunderstorm));
        assert_eq!(WeatherCondition::from_wmo_code(999), None);
        assert_eq!(WeatherCondition::from_wmo_code(-1), None);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::Clear.description(), "Clear");
        assert_eq!(WeatherCondition::HeavyRain.description(), "Heavy Rain");
    }
}
