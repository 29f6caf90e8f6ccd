//! Maps free-text condition descriptions onto the five watch icons.
//!
//! Matching is by lowercase substring against an ordered rule table; the
//! first rule whose pattern occurs in the text wins. Patterns that contain
//! other patterns, or that should dominate mixed descriptions such as
//! "Patchy light rain with thunder", come first.

use crate::types::WeatherIcon;

/// Ordered `(pattern, icon)` rules. Patterns are lowercase.
pub const ICON_RULES: &[(&str, WeatherIcon)] = &[
    ("thunder", WeatherIcon::Thunder),
    ("blizzard", WeatherIcon::Snow),
    ("snow", WeatherIcon::Snow),
    ("sleet", WeatherIcon::Snow),
    ("ice pellets", WeatherIcon::Snow),
    ("rain", WeatherIcon::Rain),
    ("drizzle", WeatherIcon::Rain),
    ("sunny", WeatherIcon::Sunny),
    ("clear", WeatherIcon::Sunny),
    ("partly cloudy", WeatherIcon::Cloudy),
    ("cloudy", WeatherIcon::Cloudy),
    ("overcast", WeatherIcon::Cloudy),
    ("mist", WeatherIcon::Cloudy),
    ("fog", WeatherIcon::Cloudy),
];

/// Icon used when nothing matches
pub const DEFAULT_ICON: WeatherIcon = WeatherIcon::Cloudy;

/// Classify a condition description. Never fails: empty, absent and
/// unrecognised descriptions all yield [`DEFAULT_ICON`].
pub fn classify_condition(condition: Option<&str>) -> WeatherIcon {
    let Some(condition) = condition.filter(|c| !c.is_empty()) else {
        return DEFAULT_ICON;
    };

    let lower = condition.to_lowercase();
    ICON_RULES
        .iter()
        .find(|(pattern, _)| lower.contains(*pattern))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}
