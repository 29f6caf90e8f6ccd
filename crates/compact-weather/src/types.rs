use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::classify_condition;

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Unit symbol as drawn on the watch ("C" or "F").
    pub fn symbol(&self) -> char {
        match self {
            Self::Celsius => 'C',
            Self::Fahrenheit => 'F',
        }
    }
}

/// Pictograph selected on the watch. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherIcon {
    Sunny = 0,
    #[default]
    Cloudy = 1,
    Rain = 2,
    Snow = 3,
    Thunder = 4,
}

impl WeatherIcon {
    /// Numeric code understood by the watch firmware (0..=4).
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Inverse of [`WeatherIcon::code`]; unknown codes fall back to cloudy
    /// the same way the firmware does.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Sunny,
            2 => Self::Rain,
            3 => Self::Snow,
            4 => Self::Thunder,
            _ => Self::Cloudy,
        }
    }
}

/// A geolocation fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub fixed_at: DateTime<Utc>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            fixed_at: Utc::now(),
        }
    }

    /// Age of the fix relative to `now`. Fixes from the future count as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.fixed_at).to_std().unwrap_or_default()
    }
}

/// Current conditions as reported by the provider, in both units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub temp_f: f64,
    pub condition_text: String,
    /// Place name the provider matched the query to, when it reports one
    pub place: Option<String>,
}

impl CurrentConditions {
    /// Raw temperature in the requested unit
    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.temp_c,
            TemperatureUnit::Fahrenheit => self.temp_f,
        }
    }
}

/// The three-field summary relayed to the watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature: i32,
    pub condition: String,
    pub icon: WeatherIcon,
}

impl WeatherReport {
    /// Build a report from provider conditions in the given unit.
    pub fn from_conditions(conditions: &CurrentConditions, unit: TemperatureUnit) -> Self {
        Self {
            temperature: round_temperature(conditions.temperature(unit)),
            condition: conditions.condition_text.clone(),
            icon: classify_condition(Some(&conditions.condition_text)),
        }
    }
}

/// Round to the nearest integer with halves going up (-2.5 becomes -2).
///
/// Non-finite readings collapse to 0.
pub fn round_temperature(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    // `as` saturates at the i32 bounds
    (value + 0.5).floor() as i32
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Weather API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(temp_c: f64, temp_f: f64, text: &str) -> CurrentConditions {
        CurrentConditions {
            temp_c,
            temp_f,
            condition_text: text.to_string(),
            place: None,
        }
    }

    #[test]
    fn test_icon_codes() {
        assert_eq!(WeatherIcon::Sunny.code(), 0);
        assert_eq!(WeatherIcon::Cloudy.code(), 1);
        assert_eq!(WeatherIcon::Rain.code(), 2);
        assert_eq!(WeatherIcon::Snow.code(), 3);
        assert_eq!(WeatherIcon::Thunder.code(), 4);
    }

    #[test]
    fn test_icon_from_unknown_code_is_cloudy() {
        assert_eq!(WeatherIcon::from_code(4), WeatherIcon::Thunder);
        assert_eq!(WeatherIcon::from_code(17), WeatherIcon::Cloudy);
        assert_eq!(WeatherIcon::from_code(-1), WeatherIcon::Cloudy);
    }

    #[test]
    fn test_round_temperature() {
        assert_eq!(round_temperature(71.6), 72);
        assert_eq!(round_temperature(22.3), 22);
        assert_eq!(round_temperature(0.5), 1);
        assert_eq!(round_temperature(-2.5), -2);
        assert_eq!(round_temperature(-2.6), -3);
        assert_eq!(round_temperature(f64::NAN), 0);
    }

    #[test]
    fn test_report_uses_selected_unit() {
        let c = conditions(22.3, 71.6, "Partly cloudy");

        let f = WeatherReport::from_conditions(&c, TemperatureUnit::Fahrenheit);
        assert_eq!(f.temperature, 72);

        let c_report = WeatherReport::from_conditions(&c, TemperatureUnit::Celsius);
        assert_eq!(c_report.temperature, 22);
        assert_eq!(c_report.condition, "Partly cloudy");
        assert_eq!(c_report.icon, WeatherIcon::Cloudy);
    }

    #[test]
    fn test_location_age() {
        let now = Utc::now();
        let loc = Location {
            latitude: 1.0,
            longitude: 2.0,
            fixed_at: now - chrono::Duration::seconds(30),
        };
        assert_eq!(loc.age(now).as_secs(), 30);

        let future = Location { fixed_at: now + chrono::Duration::seconds(5), ..loc };
        assert_eq!(future.age(now), std::time::Duration::ZERO);
    }

    #[test]
    fn test_unit_symbol() {
        assert_eq!(TemperatureUnit::Celsius.symbol(), 'C');
        assert_eq!(TemperatureUnit::default().symbol(), 'F');
    }
}
