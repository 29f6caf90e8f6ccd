//! Saved settings page values to the outbound `settings` message.

use thiserror::Error;

use crate::dict::MessageError;
use crate::message::SettingsMessage;
use crate::settings::{Settings, SettingsError};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Parse a serialized settings object and translate it.
pub fn translate_settings(raw: &str) -> Result<(Settings, SettingsMessage), TranslateError> {
    let settings = Settings::from_json(raw)?;
    let message = SettingsMessage::new(&settings)?;
    Ok((settings, message))
}
