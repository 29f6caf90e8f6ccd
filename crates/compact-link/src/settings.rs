//! Settings snapshot parsed from the blob the settings page saves.
//!
//! Each field in the blob is either `{"value": x}` or a bare `x`. A missing
//! (or `null`) field reads as off, empty or zero, except `UseGPS`, which
//! stays on unless explicitly `false`. [`Settings::default`] holds the
//! defaults the settings form declares.

use compact_weather::TemperatureUnit;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings blob is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Settings blob must be a JSON object")]
    NotAnObject,
}

/// Color swatches offered by the form, in wire-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    #[default]
    Black = 0,
    Blue = 1,
    Red = 2,
    Green = 3,
    Purple = 4,
    Orange = 5,
    Teal = 6,
}

const SWATCHES: [(&str, ColorTheme); 7] = [
    ("0x000000", ColorTheme::Black),
    ("0x0000FF", ColorTheme::Blue),
    ("0xFF0000", ColorTheme::Red),
    ("0x00FF00", ColorTheme::Green),
    ("0xAA00FF", ColorTheme::Purple),
    ("0xFF5500", ColorTheme::Orange),
    ("0x00AAAA", ColorTheme::Teal),
];

impl ColorTheme {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Hex swatch string as the form emits it
    pub fn swatch(&self) -> &'static str {
        SWATCHES
            .iter()
            .find(|(_, theme)| theme == self)
            .map(|(hex, _)| *hex)
            .unwrap_or("0x000000")
    }

    /// Look up a swatch string. Unknown swatches map to the default theme.
    pub fn from_swatch(swatch: &str) -> Self {
        SWATCHES
            .iter()
            .find(|(hex, _)| hex.eq_ignore_ascii_case(swatch.trim()))
            .map(|(_, theme)| *theme)
            .unwrap_or_default()
    }

    /// Look up an `0xRRGGBB` integer
    pub fn from_rgb(rgb: u64) -> Self {
        Self::from_swatch(&format!("0x{:06X}", rgb))
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::from_swatch(s),
            Value::Number(n) => n.as_u64().map(Self::from_rgb).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Immutable view of the user's preferences for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub time_format: i32,
    pub color_theme: ColorTheme,
    pub invert_colors: bool,
    pub show_weather: bool,
    pub show_battery: bool,
    pub show_date: bool,
    pub use_gps: bool,
    pub zip_code: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Fahrenheit,
            time_format: 0,
            color_theme: ColorTheme::Black,
            invert_colors: false,
            show_weather: true,
            show_battery: true,
            show_date: true,
            use_gps: true,
            zip_code: String::new(),
        }
    }
}

impl Settings {
    /// Parse a serialized settings blob.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SettingsError> {
        let obj = value.as_object().ok_or(SettingsError::NotAnObject)?;

        let temperature_unit = if flag(obj, "TemperatureUnit") {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        };

        Ok(Self {
            temperature_unit,
            time_format: field(obj, "TimeFormat").map(parse_int).unwrap_or(0),
            color_theme: field(obj, "ColorTheme")
                .map(ColorTheme::from_value)
                .unwrap_or_default(),
            invert_colors: flag(obj, "InvertColors"),
            show_weather: flag(obj, "ShowWeather"),
            show_battery: flag(obj, "ShowBattery"),
            show_date: flag(obj, "ShowDate"),
            // Only an explicit `false` turns GPS off
            use_gps: field(obj, "UseGPS").map_or(true, |v| !matches!(v, Value::Bool(false))),
            zip_code: field(obj, "ZipCode").map(text).unwrap_or_default(),
        })
    }
}

/// Unwrap `{"value": x}`; treat `null` as absent.
fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let raw = obj.get(key)?;
    let value = match raw {
        Value::Object(inner) if inner.contains_key("value") => inner.get("value")?,
        other => other,
    };
    (!value.is_null()).then_some(value)
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    field(obj, key).is_some_and(truthy)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Integer parse with a leading-digits rule: `"2"` and `" 2 hours"` give 2,
/// anything without leading digits gives 0.
fn parse_int(value: &Value) -> i32 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(0),
        Value::String(s) => parse_leading_int(s).unwrap_or(0),
        _ => 0,
    }
}

fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i32::try_from(signed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_swatch_lookup() {
        assert_eq!(ColorTheme::from_swatch("0xFF0000"), ColorTheme::Red);
        assert_eq!(ColorTheme::from_swatch("0xFF0000").code(), 2);
        assert_eq!(ColorTheme::from_swatch("0xff5500"), ColorTheme::Orange);
        assert_eq!(ColorTheme::from_swatch("0x123456"), ColorTheme::Black);
        assert_eq!(ColorTheme::from_swatch("red").code(), 0);
        assert_eq!(ColorTheme::from_rgb(0x00AAAA), ColorTheme::Teal);
        assert_eq!(ColorTheme::Purple.swatch(), "0xAA00FF");
    }

    #[test]
    fn test_empty_blob_reads_as_off() {
        let settings = Settings::from_json("{}").unwrap();
        assert!(settings.use_gps);
        assert_eq!(settings.temperature_unit, TemperatureUnit::Fahrenheit);
        assert!(!settings.invert_colors);
        assert!(!settings.show_weather);
        assert!(!settings.show_battery);
        assert!(!settings.show_date);
        assert_eq!(settings.time_format, 0);
        assert_eq!(settings.color_theme, ColorTheme::Black);
        assert_eq!(settings.zip_code, "");
    }

    #[test]
    fn test_form_defaults_show_everything() {
        let defaults = Settings::default();
        assert!(defaults.show_weather && defaults.show_battery && defaults.show_date);
        assert!(defaults.use_gps);
        assert!(!defaults.invert_colors);
    }

    #[test]
    fn test_wrapped_values() {
        let settings = Settings::from_value(&json!({
            "TemperatureUnit": {"value": true},
            "TimeFormat": {"value": "2"},
            "ColorTheme": {"value": "0x0000FF"},
            "InvertColors": {"value": true},
            "ShowWeather": {"value": false},
            "ShowBattery": {"value": true},
            "ShowDate": {"value": false},
            "UseGPS": {"value": false},
            "ZipCode": {"value": "90210"}
        }))
        .unwrap();

        assert_eq!(settings.temperature_unit, TemperatureUnit::Celsius);
        assert_eq!(settings.time_format, 2);
        assert_eq!(settings.color_theme, ColorTheme::Blue);
        assert!(settings.invert_colors);
        assert!(!settings.show_weather);
        assert!(settings.show_battery);
        assert!(!settings.show_date);
        assert!(!settings.use_gps);
        assert_eq!(settings.zip_code, "90210");
    }

    #[test]
    fn test_bare_values() {
        let settings = Settings::from_value(&json!({
            "TemperatureUnit": false,
            "TimeFormat": 1,
            "ColorTheme": 0xFF0000,
            "UseGPS": true,
            "ZipCode": "London"
        }))
        .unwrap();

        assert_eq!(settings.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(settings.time_format, 1);
        assert_eq!(settings.color_theme, ColorTheme::Red);
        assert!(settings.use_gps);
        assert_eq!(settings.zip_code, "London");
    }

    #[test]
    fn test_use_gps_only_disabled_by_explicit_false() {
        for value in [json!(true), json!(0), json!(""), json!({"value": null})] {
            let settings = Settings::from_value(&json!({ "UseGPS": value })).unwrap();
            assert!(settings.use_gps, "{value}");
        }
        let off = Settings::from_value(&json!({"UseGPS": {"value": false}})).unwrap();
        assert!(!off.use_gps);
    }

    #[test]
    fn test_time_format_parsing() {
        let parse = |v: Value| Settings::from_value(&json!({ "TimeFormat": v })).unwrap().time_format;
        assert_eq!(parse(json!("1")), 1);
        assert_eq!(parse(json!(" 2 ")), 2);
        assert_eq!(parse(json!("abc")), 0);
        assert_eq!(parse(json!("")), 0);
        assert_eq!(parse(json!(2.9)), 2);
        assert_eq!(parse(json!(true)), 0);
        assert_eq!(parse(json!("99999999999")), 0);
    }

    #[test]
    fn test_numeric_zip_code_is_text() {
        let settings = Settings::from_value(&json!({"ZipCode": 90210})).unwrap();
        assert_eq!(settings.zip_code, "90210");
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            Settings::from_json("[1, 2]"),
            Err(SettingsError::NotAnObject)
        ));
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(SettingsError::InvalidJson(_))
        ));
    }
}
