//! Failure of a single refresh or settings cycle.

use compact_core::{AppError, DeviceError, NetworkError, ReqwestErrorExt};
use compact_link::{DeliveryError, MessageError, SettingsError, TranslateError};
use compact_weather::{ResolveError, WeatherError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Settings store error: {0:#}")]
    Store(anyhow::Error),
}

impl From<TranslateError> for CycleError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::Settings(e) => Self::Settings(e),
            TranslateError::Message(e) => Self::Message(e),
        }
    }
}

impl CycleError {
    /// Aborts that follow from the user's configuration rather than a fault
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}

fn message_to_device(err: MessageError) -> DeviceError {
    match err {
        MessageError::TooLarge { size, limit } => DeviceError::MessageTooLarge { size, limit },
        other => DeviceError::InvalidMessage(other.to_string()),
    }
}

impl From<CycleError> for AppError {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::Resolve(e) => {
                compact_core::WeatherError::LocationUnavailable(e.to_string()).into()
            }
            CycleError::Weather(e) => match e {
                WeatherError::Network(e) => e.into_network_error().into(),
                WeatherError::Status { status, message } => {
                    NetworkError::ServerError { status, message }.into()
                }
                WeatherError::Parse(msg) => NetworkError::InvalidResponse(msg).into(),
                WeatherError::LocationNotFound(q) => {
                    compact_core::WeatherError::LocationNotFound(q).into()
                }
                WeatherError::InvalidApiKey => compact_core::WeatherError::InvalidApiKey.into(),
                WeatherError::Api { code, message } => {
                    compact_core::WeatherError::ApiError(format!("{}: {}", code, message)).into()
                }
            },
            CycleError::Settings(e) => compact_core::ConfigError::ParseError(e.to_string()).into(),
            CycleError::Message(e) => message_to_device(e).into(),
            CycleError::Delivery(e) => match e {
                DeliveryError::Message(m) => message_to_device(m).into(),
                other => DeviceError::DeliveryFailed(other.to_string()).into(),
            },
            CycleError::Store(e) => AppError::Other(e),
        }
    }
}
