//! Link between the companion and the watch face
//!
//! Settings snapshots and their translation, the settings page declaration,
//! the AppMessage dictionary codec, typed inbound/outbound messages, the
//! device channel seam and settings persistence.

pub mod channel;
pub mod dict;
pub mod form;
pub mod message;
pub mod settings;
pub mod store;
pub mod translate;

pub use channel::{DeliveryError, DeviceChannel, MemoryChannel};
pub use dict::{Dictionary, MessageError, Tuple, TupleType, TupleValue};
pub use form::{settings_form, FormItem};
pub use message::{
    InboundMessage, MessageKey, OutboundMessage, SettingsMessage, WeatherMessage,
    MESSAGE_KEY_BASE,
};
pub use settings::{ColorTheme, Settings, SettingsError};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use translate::{translate_settings, TranslateError};
