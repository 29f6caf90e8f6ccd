//! Centralized error types for the Compact Info companion.
//!
//! Crate-level errors (weather, link) are folded into [`AppError`] at the
//! companion boundary so every failed cycle is logged with one category and
//! one short, human-readable message.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Device link error: {0}")]
    Device(#[from] DeviceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Short description suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Device(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed.",
            AppError::Other(_) => "An unexpected error occurred.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => "Unable to connect. Check the phone's connection.",
            NetworkError::Timeout => "The weather request timed out.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is having issues."
            }
            NetworkError::ServerError { .. } => "The weather request failed.",
            NetworkError::InvalidResponse(_) => "Received an unexpected weather response.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::ParseError(_) => "Configuration file is malformed.",
        }
    }
}

/// Weather resolution errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("No usable location: {0}")]
    LocationUnavailable(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Weather API error: {0}")]
    ApiError(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationUnavailable(_) => {
                "No location available. Enable GPS or enter a ZIP code or city."
            }
            WeatherError::LocationNotFound(_) => "Location not found. Check the ZIP code or city.",
            WeatherError::ApiError(_) => "Weather service error.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check the configuration.",
        }
    }
}

/// Errors talking to the watch.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Message delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Message of {size} bytes exceeds the {limit} byte inbox")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl DeviceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DeviceError::DeliveryFailed(_) => "Could not reach the watch.",
            DeviceError::MessageTooLarge { .. } => "Message too large for the watch.",
            DeviceError::InvalidMessage(_) => "Could not build the watch message.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
