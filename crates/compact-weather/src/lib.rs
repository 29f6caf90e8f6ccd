//! Weather resolution for the Compact Info companion
//!
//! Resolves a location (GPS fix or manual ZIP/city), fetches current
//! conditions from WeatherAPI.com and condenses them into the three-field
//! report the watch displays.

pub mod classifier;
pub mod location;
pub mod provider;
pub mod types;

pub use classifier::{classify_condition, DEFAULT_ICON, ICON_RULES};
pub use location::{
    resolve_location, CachedGeolocator, FixedGeolocator, GeolocationOptions, Geolocator,
    LocationPlan, LocationQuery, ResolveError, UnavailableGeolocator,
};
pub use provider::{WeatherApiProvider, WeatherSource, DEFAULT_API_URL};
pub use types::*;
