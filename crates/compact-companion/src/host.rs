//! Stdio host: newline-delimited JSON events in, JSON lines out.
//!
//! Input lines look like `{"type":"ready"}`,
//! `{"type":"appmessage","payload":{"Temperature":1}}` (or `"frame":"<hex>"`),
//! `{"type":"webviewclosed","response":"{...}"}` and
//! `{"type":"showconfiguration"}`. Every outbound message is written as one
//! line carrying its kind, the named payload and the encoded frame in hex.

use std::time::Duration;

use anyhow::{Context, Result};
use compact_core::{Config, LocationConfig};
use compact_link::dict::{from_hex, to_hex};
use compact_link::{
    settings_form, DeliveryError, DeviceChannel, FileSettingsStore, InboundMessage, MessageError,
    OutboundMessage,
};
use compact_weather::{
    CachedGeolocator, FixedGeolocator, GeolocationOptions, Geolocator, Location, LocationError,
    UnavailableGeolocator, WeatherApiProvider,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::app::{Companion, CompanionEvent};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Invalid event line: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    #[error("Invalid hex frame")]
    InvalidFrame,

    #[error("Undecodable frame: {0}")]
    Message(#[from] MessageError),
}

/// One line read from the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostEvent {
    Ready,
    AppMessage {
        #[serde(default)]
        payload: Option<Map<String, Value>>,
        #[serde(default)]
        frame: Option<String>,
    },
    WebviewClosed {
        #[serde(default)]
        response: Option<String>,
    },
    ShowConfiguration,
}

impl HostEvent {
    pub fn parse(line: &str) -> Result<Self, HostError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Companion event for this line; `None` for requests the host answers
    /// itself.
    pub fn into_companion_event(self) -> Result<Option<CompanionEvent>, HostError> {
        let event = match self {
            Self::Ready => CompanionEvent::Ready,
            Self::AppMessage { frame: Some(hex), .. } => {
                let frame = from_hex(&hex).ok_or(HostError::InvalidFrame)?;
                CompanionEvent::AppMessage(InboundMessage::decode(&frame)?)
            }
            Self::AppMessage { payload, .. } => CompanionEvent::AppMessage(
                InboundMessage::from_payload(&payload.unwrap_or_default()),
            ),
            Self::WebviewClosed { response } => CompanionEvent::WebviewClosed(response),
            Self::ShowConfiguration => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Device channel writing each message as a JSON line. A completed write
/// counts as the watch's acknowledgement.
pub struct JsonLinesChannel<W> {
    writer: Mutex<W>,
    inbox_size: usize,
}

impl<W> JsonLinesChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, inbox_size: usize) -> Self {
        Self {
            writer: Mutex::new(writer),
            inbox_size,
        }
    }

    pub fn inbox_size(&self) -> usize {
        self.inbox_size
    }

    /// Answer a configuration request with the settings form.
    pub async fn write_configuration(&self) -> std::io::Result<()> {
        self.write_line(&json!({
            "type": "configuration",
            "form": settings_form(),
        }))
        .await
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_line(&self, value: &Value) -> std::io::Result<()> {
        let mut line = value.to_string();
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }
}

impl<W> DeviceChannel for JsonLinesChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let frame = message.encode(self.inbox_size)?;
        tracing::debug!("Sending {} message ({} bytes)", message.kind(), frame.len());

        self.write_line(&json!({
            "type": "appmessage",
            "kind": message.kind(),
            "payload": message.to_payload(),
            "frame": to_hex(&frame),
        }))
        .await?;
        Ok(())
    }
}

/// Geolocation available to the host process.
#[derive(Debug, Clone, Copy)]
pub enum HostGeolocator {
    Fixed(FixedGeolocator),
    Unavailable(UnavailableGeolocator),
}

impl HostGeolocator {
    pub fn from_config(config: &LocationConfig) -> Self {
        match config.fixed_coordinates() {
            Some((latitude, longitude)) => Self::Fixed(FixedGeolocator::new(latitude, longitude)),
            None => Self::Unavailable(UnavailableGeolocator),
        }
    }
}

impl Geolocator for HostGeolocator {
    async fn current_position(
        &self,
        options: &GeolocationOptions,
    ) -> Result<Location, LocationError> {
        match self {
            Self::Fixed(g) => g.current_position(options).await,
            Self::Unavailable(g) => g.current_position(options).await,
        }
    }
}

pub type HostCompanion<W> = Companion<
    CachedGeolocator<HostGeolocator>,
    WeatherApiProvider,
    JsonLinesChannel<W>,
    FileSettingsStore,
>;

/// Build the companion the host binary runs, writing messages to `writer`.
pub fn build_companion<W>(config: &Config, writer: W) -> Result<HostCompanion<W>>
where
    W: AsyncWrite + Unpin + Send,
{
    let api_key = config.weather.effective_api_key().unwrap_or_else(|| {
        tracing::warn!("No weather API key configured; requests will be rejected");
        String::new()
    });
    let provider = WeatherApiProvider::new(&config.weather.api_url, &api_key)
        .context("Failed to create weather provider")?;

    let geolocator = HostGeolocator::from_config(&config.location);
    if matches!(geolocator, HostGeolocator::Unavailable(_)) {
        tracing::info!("No coordinates configured, GPS lookups fall back to the manual location");
    }

    let options = GeolocationOptions {
        timeout: Duration::from_secs(config.location.timeout_secs),
        maximum_age: Duration::from_secs(config.location.maximum_age_secs),
    };

    let store = FileSettingsStore::new(config.settings_path());
    tracing::debug!("Settings stored at {}", store.path().display());

    Ok(Companion::new(
        CachedGeolocator::new(geolocator),
        provider,
        JsonLinesChannel::new(writer, config.device.inbox_size),
        store,
    )
    .with_options(options))
}
