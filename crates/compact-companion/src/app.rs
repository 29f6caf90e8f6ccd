//! Companion state and the three refresh triggers.

use std::borrow::Cow;
use std::sync::Arc;

use compact_core::AppError;
use compact_link::{
    translate_settings, DeviceChannel, InboundMessage, OutboundMessage, SettingsMessage,
    SettingsStore, WeatherMessage,
};
use compact_weather::{
    resolve_location, GeolocationOptions, Geolocator, LocationPlan, WeatherReport, WeatherSource,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::CycleError;

/// Something the host reports to the companion.
#[derive(Debug, Clone)]
pub enum CompanionEvent {
    /// The companion finished loading
    Ready,
    /// A message arrived from the watch
    AppMessage(InboundMessage),
    /// The settings page closed, with the serialized settings if it was saved
    WebviewClosed(Option<String>),
}

/// Main companion state: the capabilities one cycle needs.
pub struct Companion<G, W, C, S> {
    geolocator: G,
    weather: W,
    channel: C,
    store: S,
    options: GeolocationOptions,
}

impl<G, W, C, S> Companion<G, W, C, S>
where
    G: Geolocator,
    W: WeatherSource,
    C: DeviceChannel,
    S: SettingsStore,
{
    pub fn new(geolocator: G, weather: W, channel: C, store: S) -> Self {
        Self {
            geolocator,
            weather,
            channel,
            store,
            options: GeolocationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GeolocationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn geolocator(&self) -> &G {
        &self.geolocator
    }

    pub fn weather(&self) -> &W {
        &self.weather
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &GeolocationOptions {
        &self.options
    }

    /// One weather cycle: read the settings snapshot, resolve a location,
    /// fetch current conditions and send the report to the watch.
    pub async fn refresh_weather(&self) -> Result<WeatherReport, CycleError> {
        let settings = self.store.snapshot();
        let plan = LocationPlan::new(settings.use_gps, &settings.zip_code);
        let query = resolve_location(&self.geolocator, plan, &self.options).await?;

        let conditions = self.weather.fetch_current(&query).await?;
        let report = WeatherReport::from_conditions(&conditions, settings.temperature_unit);
        let place = conditions
            .place
            .clone()
            .unwrap_or_else(|| query.to_string());
        tracing::info!(
            "Weather for {}: {}{} {} (icon {})",
            place,
            report.temperature,
            settings.temperature_unit.symbol(),
            report.condition,
            report.icon.code()
        );

        let message = OutboundMessage::Weather(WeatherMessage::new(&report)?);
        self.channel.send(&message).await?;
        tracing::info!("Weather info sent to watch");

        Ok(report)
    }

    /// Persist and forward a saved settings blob. Returns `None` when the
    /// page closed without saving.
    pub async fn apply_settings(
        &self,
        response: Option<&str>,
    ) -> Result<Option<SettingsMessage>, CycleError> {
        let Some(raw) = response.map(decode_response).filter(|r| !r.trim().is_empty()) else {
            tracing::debug!("Settings page closed without changes");
            return Ok(None);
        };

        // A blob that fails to translate is never persisted
        let (settings, message) = translate_settings(&raw)?;
        self.store.save_raw(&raw).map_err(CycleError::Store)?;
        tracing::info!(
            "Settings saved (gps: {}, manual location: {:?})",
            settings.use_gps,
            settings.zip_code
        );

        self.channel
            .send(&OutboundMessage::Settings(message.clone()))
            .await?;
        tracing::info!("Settings sent to watch");

        Ok(Some(message))
    }

    /// Run the action for one event to completion, logging any failure.
    pub async fn handle(&self, event: CompanionEvent) {
        match event {
            CompanionEvent::Ready => {
                tracing::info!("Companion ready");
                self.refresh_logged().await;
            }
            CompanionEvent::AppMessage(message) => {
                tracing::debug!(
                    "AppMessage received with keys {:?}",
                    message.keys().map(|k| k.name()).collect::<Vec<_>>()
                );
                if message.is_weather_request() {
                    self.refresh_logged().await;
                }
            }
            CompanionEvent::WebviewClosed(response) => {
                match self.apply_settings(response.as_deref()).await {
                    Ok(Some(_)) => self.refresh_logged().await,
                    Ok(None) => {}
                    Err(e) => log_failure("Settings update", e),
                }
            }
        }
    }

    async fn refresh_logged(&self) {
        if let Err(e) = self.refresh_weather().await {
            log_failure("Weather update", e);
        }
    }
}

impl<G, W, C, S> Companion<G, W, C, S>
where
    G: Geolocator + 'static,
    W: WeatherSource + 'static,
    C: DeviceChannel + 'static,
    S: SettingsStore + 'static,
{
    /// Handle events until the sender side closes. Every event runs as its
    /// own task; outstanding tasks are awaited before returning.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<CompanionEvent>) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let companion = Arc::clone(&self);
                        tasks.spawn(async move { companion.handle(event).await });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Companion task failed: {}", e);
                    }
                }
            }
        }

        tracing::debug!("Event stream closed, waiting for {} task(s)", tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Companion task failed: {}", e);
            }
        }
    }
}

/// The settings page may hand back its response URI-encoded.
fn decode_response(raw: &str) -> Cow<'_, str> {
    if raw.trim_start().starts_with('{') {
        return Cow::Borrowed(raw);
    }
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(raw),
    }
}

fn log_failure(what: &str, err: CycleError) {
    let expected = err.is_expected();
    let detail = err.to_string();
    let app: AppError = err.into();
    if expected {
        tracing::info!("{} skipped: {}", what, detail);
    } else {
        tracing::warn!("{} failed: {} ({})", what, detail, app.user_message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_link::{MemoryChannel, MemorySettingsStore, MessageKey, TupleValue};
    use compact_weather::{
        CurrentConditions, FixedGeolocator, LocationQuery, UnavailableGeolocator, WeatherError,
        WeatherIcon,
    };
    use std::sync::Mutex;

    /// Weather source returning canned conditions and recording queries
    #[derive(Default)]
    struct Recorder {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl WeatherSource for Recorder {
        async fn fetch_current(
            &self,
            query: &LocationQuery,
        ) -> Result<CurrentConditions, WeatherError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(WeatherError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(CurrentConditions {
                temp_c: 21.4,
                temp_f: 70.5,
                condition_text: "Light rain shower".into(),
                place: Some("Beverly Hills".into()),
            })
        }
    }

    fn queries<G: Geolocator, C: DeviceChannel, S: SettingsStore>(
        companion: &Companion<G, Recorder, C, S>,
    ) -> Vec<String> {
        companion.weather().queries.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_refresh_with_gps_fix() {
        let companion = Companion::new(
            FixedGeolocator::new(40.7, -74.0),
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        let report = companion.refresh_weather().await.unwrap();
        assert_eq!(report.temperature, 71);
        assert_eq!(report.icon, WeatherIcon::Rain);
        assert_eq!(queries(&companion), vec!["40.7,-74"]);
        assert_eq!(companion.channel().sent_of_kind("weather").len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_uses_celsius_from_settings() {
        let companion = Companion::new(
            UnavailableGeolocator,
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::with_raw(r#"{"TemperatureUnit":true,"ZipCode":"90210"}"#),
        );

        let report = companion.refresh_weather().await.unwrap();
        assert_eq!(report.temperature, 21);
        assert_eq!(queries(&companion), vec!["90210"]);
    }

    #[tokio::test]
    async fn test_refresh_without_location_fetches_nothing() {
        let companion = Companion::new(
            UnavailableGeolocator,
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        let err = companion.refresh_weather().await.unwrap_err();
        assert!(err.is_expected());
        assert!(queries(&companion).is_empty());
        assert!(companion.channel().sent().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_sends_nothing() {
        let companion = Companion::new(
            FixedGeolocator::new(1.0, 2.0),
            Recorder {
                fail: true,
                ..Recorder::default()
            },
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        let err = companion.refresh_weather().await.unwrap_err();
        assert!(matches!(err, CycleError::Weather(_)));
        assert!(companion.channel().sent().is_empty());
    }

    #[tokio::test]
    async fn test_apply_settings_ignores_empty_response() {
        let companion = Companion::new(
            UnavailableGeolocator,
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        assert!(companion.apply_settings(None).await.unwrap().is_none());
        assert!(companion.apply_settings(Some("")).await.unwrap().is_none());
        assert!(companion.channel().sent().is_empty());
        assert!(companion.store().load_raw().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_settings_accepts_uri_encoded_response() {
        let companion = Companion::new(
            UnavailableGeolocator,
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        let encoded = "%7B%22ColorTheme%22%3A%220xFF0000%22%7D";
        let message = companion.apply_settings(Some(encoded)).await.unwrap().unwrap();
        assert_eq!(message.color_theme(), 2);
        assert_eq!(
            companion.store().load_raw().unwrap().as_deref(),
            Some(r#"{"ColorTheme":"0xFF0000"}"#)
        );
    }

    #[tokio::test]
    async fn test_malformed_settings_keep_previous_blob() {
        let companion = Companion::new(
            UnavailableGeolocator,
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::with_raw(r#"{"ZipCode":"London"}"#),
        );

        let err = companion.apply_settings(Some("{broken")).await.unwrap_err();
        assert!(matches!(err, CycleError::Settings(_)));
        assert_eq!(companion.store().snapshot().zip_code, "London");
    }

    #[tokio::test]
    async fn test_weather_request_triggers_refresh() {
        let companion = Companion::new(
            FixedGeolocator::new(1.0, 2.0),
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );

        let mut payload = serde_json::Map::new();
        payload.insert("ShowDate".into(), serde_json::json!(1));
        companion
            .handle(CompanionEvent::AppMessage(InboundMessage::from_payload(&payload)))
            .await;
        assert!(queries(&companion).is_empty());

        payload.insert("Temperature".into(), serde_json::json!(1));
        let message = InboundMessage::from_payload(&payload);
        assert_eq!(message.get(MessageKey::Temperature), Some(&TupleValue::Int(1)));
        companion.handle(CompanionEvent::AppMessage(message)).await;
        assert_eq!(queries(&companion).len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_settings_skip_refresh() {
        let companion = Companion::new(
            FixedGeolocator::new(1.0, 2.0),
            Recorder::default(),
            MemoryChannel::new(),
            MemorySettingsStore::new(),
        );
        companion.channel().set_reject(Some("busy"));

        companion
            .handle(CompanionEvent::WebviewClosed(Some("{}".into())))
            .await;
        assert!(queries(&companion).is_empty());
        // Persisted even though delivery failed
        assert_eq!(companion.store().load_raw().unwrap().as_deref(), Some("{}"));
    }
}
