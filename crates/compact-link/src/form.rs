//! Declaration of the settings page the form engine renders.
//!
//! Defaults are taken from [`Settings::default`] so a blob missing a field
//! and an untouched form agree.

use serde::Serialize;

use crate::message::MessageKey;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormItem {
    Heading {
        #[serde(rename = "defaultValue")]
        default_value: String,
    },
    Section {
        items: Vec<FormItem>,
    },
    Toggle {
        #[serde(rename = "messageKey")]
        message_key: &'static str,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "defaultValue")]
        default_value: bool,
    },
    Radiogroup {
        #[serde(rename = "messageKey")]
        message_key: &'static str,
        label: String,
        #[serde(rename = "defaultValue")]
        default_value: String,
        options: Vec<RadioOption>,
    },
    Color {
        #[serde(rename = "messageKey")]
        message_key: &'static str,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "defaultValue")]
        default_value: String,
        sunlight: bool,
        #[serde(rename = "allowGray")]
        allow_gray: bool,
        capabilities: Vec<String>,
    },
    Input {
        #[serde(rename = "messageKey")]
        message_key: &'static str,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "defaultValue")]
        default_value: String,
        attributes: InputAttributes,
    },
    Submit {
        #[serde(rename = "defaultValue")]
        default_value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadioOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputAttributes {
    pub placeholder: String,
}

fn heading(text: &str) -> FormItem {
    FormItem::Heading {
        default_value: text.to_string(),
    }
}

fn toggle(key: MessageKey, label: &str, description: &str, default_value: bool) -> FormItem {
    FormItem::Toggle {
        message_key: key.name(),
        label: label.to_string(),
        description: Some(description.to_string()),
        default_value,
    }
}

fn option(label: &str, value: i32) -> RadioOption {
    RadioOption {
        label: label.to_string(),
        value: value.to_string(),
    }
}

/// The complete settings page.
pub fn settings_form() -> Vec<FormItem> {
    let d = Settings::default();

    vec![
        heading("Compact Info Settings"),
        FormItem::Section {
            items: vec![
                heading("Display"),
                toggle(
                    MessageKey::InvertColors,
                    "Invert Colors",
                    "Black background, white text",
                    d.invert_colors,
                ),
                FormItem::Radiogroup {
                    message_key: MessageKey::TimeFormat.name(),
                    label: "Time Format".to_string(),
                    default_value: d.time_format.to_string(),
                    options: vec![
                        option("Words (e.g., SEVEN FIFTY SIX)", 0),
                        option("12-Hour (e.g., 7:56 PM)", 1),
                        option("24-Hour (e.g., 19:56)", 2),
                    ],
                },
                FormItem::Color {
                    message_key: MessageKey::ColorTheme.name(),
                    label: "Color Theme".to_string(),
                    description: Some("Only applies to Compact Info design".to_string()),
                    default_value: d.color_theme.swatch().to_string(),
                    sunlight: false,
                    allow_gray: false,
                    capabilities: vec!["COLOR".to_string()],
                },
            ],
        },
        FormItem::Section {
            items: vec![
                heading("Sections"),
                toggle(MessageKey::ShowDate, "Show Date", "Display current date", d.show_date),
                toggle(
                    MessageKey::ShowWeather,
                    "Show Weather",
                    "Display weather information",
                    d.show_weather,
                ),
                toggle(
                    MessageKey::ShowBattery,
                    "Show Battery",
                    "Display battery status",
                    d.show_battery,
                ),
            ],
        },
        FormItem::Section {
            items: vec![
                heading("Weather"),
                toggle(
                    MessageKey::TemperatureUnit,
                    "Use Celsius",
                    "Temperature in Celsius instead of Fahrenheit",
                    d.temperature_unit == compact_weather::TemperatureUnit::Celsius,
                ),
                toggle(
                    MessageKey::UseGps,
                    "Auto Location (GPS)",
                    "Use phone's GPS for weather location",
                    d.use_gps,
                ),
                FormItem::Input {
                    message_key: MessageKey::ZipCode.name(),
                    label: "ZIP Code / City".to_string(),
                    description: Some(
                        "Enter ZIP code or city name (used when GPS is off)".to_string(),
                    ),
                    default_value: d.zip_code.clone(),
                    attributes: InputAttributes {
                        placeholder: "e.g., 90210 or London".to_string(),
                    },
                },
            ],
        },
        FormItem::Submit {
            default_value: "Save Settings".to_string(),
        },
    ]
}
