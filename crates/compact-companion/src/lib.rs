//! Compact Info phone companion
//!
//! Wires location resolution, the weather provider, settings persistence and
//! the watch channel into the refresh cycles triggered by the host.

pub mod app;
pub mod error;
pub mod host;

pub use app::{Companion, CompanionEvent};
pub use error::CycleError;
pub use host::{
    build_companion, HostCompanion, HostError, HostEvent, HostGeolocator, JsonLinesChannel,
};
