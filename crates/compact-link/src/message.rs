//! Fixed-field messages exchanged with the watch.

use std::collections::BTreeMap;

use compact_weather::{TemperatureUnit, WeatherIcon, WeatherReport};
use serde_json::{json, Map, Value};

use crate::dict::{Dictionary, MessageError, TupleValue};
use crate::settings::Settings;

/// First numeric id; keys are numbered in declaration order from here.
pub const MESSAGE_KEY_BASE: u32 = 10000;

/// Keys shared with the watch firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum MessageKey {
    Temperature = MESSAGE_KEY_BASE,
    Condition,
    WeatherIcon,
    TemperatureUnit,
    TimeFormat,
    ColorTheme,
    InvertColors,
    ShowWeather,
    ShowBattery,
    ShowDate,
    UseGps,
    ZipCode,
}

impl MessageKey {
    pub const ALL: [MessageKey; 12] = [
        Self::Temperature,
        Self::Condition,
        Self::WeatherIcon,
        Self::TemperatureUnit,
        Self::TimeFormat,
        Self::ColorTheme,
        Self::InvertColors,
        Self::ShowWeather,
        Self::ShowBattery,
        Self::ShowDate,
        Self::UseGps,
        Self::ZipCode,
    ];

    pub fn id(&self) -> u32 {
        *self as u32
    }

    /// Name used by the settings page and in JSON payloads
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Condition => "Condition",
            Self::WeatherIcon => "WeatherIcon",
            Self::TemperatureUnit => "TemperatureUnit",
            Self::TimeFormat => "TimeFormat",
            Self::ColorTheme => "ColorTheme",
            Self::InvertColors => "InvertColors",
            Self::ShowWeather => "ShowWeather",
            Self::ShowBattery => "ShowBattery",
            Self::ShowDate => "ShowDate",
            Self::UseGps => "UseGPS",
            Self::ZipCode => "ZipCode",
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

fn check_cstring(key: MessageKey, value: &str) -> Result<(), MessageError> {
    if value.contains('\0') {
        return Err(MessageError::InteriorNul(key.id()));
    }
    Ok(())
}

/// Outbound `weather` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherMessage {
    temperature: i32,
    condition: String,
    icon: WeatherIcon,
}

impl WeatherMessage {
    pub fn new(report: &WeatherReport) -> Result<Self, MessageError> {
        check_cstring(MessageKey::Condition, &report.condition)?;
        Ok(Self {
            temperature: report.temperature,
            condition: report.condition.clone(),
            icon: report.icon,
        })
    }

    pub fn temperature(&self) -> i32 {
        self.temperature
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn icon(&self) -> WeatherIcon {
        self.icon
    }
}

/// Outbound `settings` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsMessage {
    temperature_unit: i32,
    time_format: i32,
    color_theme: i32,
    invert_colors: i32,
    show_weather: i32,
    show_battery: i32,
    show_date: i32,
    use_gps: i32,
    zip_code: String,
}

impl SettingsMessage {
    /// Translate a settings snapshot into the nine-key message.
    pub fn new(settings: &Settings) -> Result<Self, MessageError> {
        check_cstring(MessageKey::ZipCode, &settings.zip_code)?;
        Ok(Self {
            temperature_unit: i32::from(settings.temperature_unit == TemperatureUnit::Celsius),
            time_format: settings.time_format,
            color_theme: settings.color_theme.code(),
            invert_colors: i32::from(settings.invert_colors),
            show_weather: i32::from(settings.show_weather),
            show_battery: i32::from(settings.show_battery),
            show_date: i32::from(settings.show_date),
            use_gps: i32::from(settings.use_gps),
            zip_code: settings.zip_code.clone(),
        })
    }

    pub fn temperature_unit(&self) -> i32 {
        self.temperature_unit
    }

    pub fn time_format(&self) -> i32 {
        self.time_format
    }

    pub fn color_theme(&self) -> i32 {
        self.color_theme
    }

    pub fn invert_colors(&self) -> i32 {
        self.invert_colors
    }

    pub fn show_weather(&self) -> i32 {
        self.show_weather
    }

    pub fn show_battery(&self) -> i32 {
        self.show_battery
    }

    pub fn show_date(&self) -> i32 {
        self.show_date
    }

    pub fn use_gps(&self) -> i32 {
        self.use_gps
    }

    pub fn zip_code(&self) -> &str {
        &self.zip_code
    }

    fn int_fields(&self) -> [(MessageKey, i32); 8] {
        [
            (MessageKey::TemperatureUnit, self.temperature_unit),
            (MessageKey::TimeFormat, self.time_format),
            (MessageKey::ColorTheme, self.color_theme),
            (MessageKey::InvertColors, self.invert_colors),
            (MessageKey::ShowWeather, self.show_weather),
            (MessageKey::ShowBattery, self.show_battery),
            (MessageKey::ShowDate, self.show_date),
            (MessageKey::UseGps, self.use_gps),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Weather(WeatherMessage),
    Settings(SettingsMessage),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Weather(_) => "weather",
            Self::Settings(_) => "settings",
        }
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        match self {
            Self::Weather(w) => {
                dict.insert(MessageKey::Temperature.id(), TupleValue::Int(w.temperature));
                dict.insert(
                    MessageKey::Condition.id(),
                    TupleValue::CString(w.condition.clone()),
                );
                dict.insert(MessageKey::WeatherIcon.id(), TupleValue::Int(w.icon.code()));
            }
            Self::Settings(s) => {
                for (key, value) in s.int_fields() {
                    dict.insert(key.id(), TupleValue::Int(value));
                }
                dict.insert(MessageKey::ZipCode.id(), TupleValue::CString(s.zip_code.clone()));
            }
        }
        dict
    }

    /// Wire frame, rejected if it would not fit an inbox of `inbox_size` bytes
    pub fn encode(&self, inbox_size: usize) -> Result<Vec<u8>, MessageError> {
        self.to_dictionary().encode_within(inbox_size)
    }

    /// Name-keyed view of the message
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Self::Weather(w) => {
                map.insert(MessageKey::Temperature.name().into(), json!(w.temperature));
                map.insert(MessageKey::Condition.name().into(), json!(w.condition));
                map.insert(MessageKey::WeatherIcon.name().into(), json!(w.icon.code()));
            }
            Self::Settings(s) => {
                for (key, value) in s.int_fields() {
                    map.insert(key.name().into(), json!(value));
                }
                map.insert(MessageKey::ZipCode.name().into(), json!(s.zip_code));
            }
        }
        map
    }
}

/// Message received from the watch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    values: BTreeMap<MessageKey, TupleValue>,
}

impl InboundMessage {
    /// Keep the known keys of a decoded dictionary; unknown ids are dropped.
    pub fn from_dictionary(dict: &Dictionary) -> Self {
        let mut values = BTreeMap::new();
        for tuple in dict.tuples() {
            match MessageKey::from_id(tuple.key) {
                Some(key) => {
                    values.insert(key, tuple.value.clone());
                }
                None => tracing::debug!("Ignoring unknown message key {}", tuple.key),
            }
        }
        Self { values }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, MessageError> {
        Ok(Self::from_dictionary(&Dictionary::decode(frame)?))
    }

    /// Build from a name-keyed JSON payload. A key that is present counts
    /// even when its value is `null`.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        let mut values = BTreeMap::new();
        for (name, value) in payload {
            let Some(key) = MessageKey::from_name(name) else {
                tracing::debug!("Ignoring unknown payload key {}", name);
                continue;
            };
            let tuple = match value {
                Value::Bool(b) => TupleValue::Int(i32::from(*b)),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|i| i32::try_from(i).ok())
                    .map(TupleValue::Int)
                    .unwrap_or_else(|| TupleValue::CString(n.to_string())),
                Value::String(s) => TupleValue::CString(s.clone()),
                _ => TupleValue::Bytes(Vec::new()),
            };
            values.insert(key, tuple);
        }
        Self { values }
    }

    pub fn get(&self, key: MessageKey) -> Option<&TupleValue> {
        self.values.get(&key)
    }

    /// The watch asks for fresh weather by sending a `Temperature` key.
    pub fn is_weather_request(&self) -> bool {
        self.values.contains_key(&MessageKey::Temperature)
    }

    pub fn keys(&self) -> impl Iterator<Item = MessageKey> + '_ {
        self.values.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ColorTheme;

    fn report() -> WeatherReport {
        WeatherReport {
            temperature: 72,
            condition: "Partly cloudy".to_string(),
            icon: WeatherIcon::Cloudy,
        }
    }

    #[test]
    fn test_key_ids_follow_declaration_order() {
        for (i, key) in MessageKey::ALL.iter().enumerate() {
            assert_eq!(key.id(), MESSAGE_KEY_BASE + i as u32);
            assert_eq!(MessageKey::from_id(key.id()), Some(*key));
            assert_eq!(MessageKey::from_name(key.name()), Some(*key));
        }
        assert_eq!(MessageKey::UseGps.name(), "UseGPS");
        assert_eq!(MessageKey::from_id(42), None);
    }

    #[test]
    fn test_weather_payload_has_three_keys() {
        let msg = OutboundMessage::Weather(WeatherMessage::new(&report()).unwrap());
        let payload = msg.to_payload();
        assert_eq!(payload.len(), 3);
        assert_eq!(payload["Temperature"], json!(72));
        assert_eq!(payload["Condition"], json!("Partly cloudy"));
        assert_eq!(payload["WeatherIcon"], json!(1));
        assert_eq!(msg.kind(), "weather");
    }

    #[test]
    fn test_weather_dictionary_uses_int32_tuples() {
        let msg = OutboundMessage::Weather(WeatherMessage::new(&report()).unwrap());
        let dict = Dictionary::decode(&msg.encode(256).unwrap()).unwrap();
        assert_eq!(dict.get(MessageKey::Temperature.id()), Some(&TupleValue::Int(72)));
        assert_eq!(dict.get(MessageKey::WeatherIcon.id()), Some(&TupleValue::Int(1)));
        assert_eq!(
            dict.get(MessageKey::Condition.id()).and_then(TupleValue::as_str),
            Some("Partly cloudy")
        );
    }

    #[test]
    fn test_weather_message_rejects_nul() {
        let mut bad = report();
        bad.condition = "Sun\0ny".to_string();
        assert_eq!(
            WeatherMessage::new(&bad),
            Err(MessageError::InteriorNul(MessageKey::Condition.id()))
        );
    }

    #[test]
    fn test_settings_payload_has_nine_keys() {
        let settings = Settings {
            temperature_unit: TemperatureUnit::Celsius,
            color_theme: ColorTheme::Green,
            zip_code: "90210".into(),
            ..Settings::default()
        };
        let msg = OutboundMessage::Settings(SettingsMessage::new(&settings).unwrap());
        let payload = msg.to_payload();

        assert_eq!(payload.len(), 9);
        assert_eq!(payload["TemperatureUnit"], json!(1));
        assert_eq!(payload["ColorTheme"], json!(3));
        assert_eq!(payload["UseGPS"], json!(1));
        assert_eq!(payload["ZipCode"], json!("90210"));
        assert_eq!(msg.to_dictionary().len(), 9);
    }

    #[test]
    fn test_settings_frame_fits_default_inbox() {
        let msg = OutboundMessage::Settings(SettingsMessage::new(&Settings::default()).unwrap());
        let frame = msg.encode(256).unwrap();
        assert!(frame.len() <= 256);
    }

    #[test]
    fn test_inbound_refresh_request_from_frame() {
        // uint8 Temperature = 1, as sent by the watch's tick handler
        let frame = [1, 0x10, 0x27, 0, 0, 2, 1, 0, 1];
        let msg = InboundMessage::decode(&frame).unwrap();
        assert!(msg.is_weather_request());
    }

    #[test]
    fn test_inbound_from_payload() {
        let payload = json!({"Temperature": null, "Bogus": 3});
        let msg = InboundMessage::from_payload(payload.as_object().unwrap());
        assert!(msg.is_weather_request());
        assert_eq!(msg.keys().count(), 1);

        let payload = json!({"ShowDate": true});
        let msg = InboundMessage::from_payload(payload.as_object().unwrap());
        assert!(!msg.is_weather_request());
        assert_eq!(msg.get(MessageKey::ShowDate), Some(&TupleValue::Int(1)));
    }
}
