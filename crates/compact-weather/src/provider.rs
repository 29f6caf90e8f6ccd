//! WeatherAPI.com current-conditions client.

use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::location::LocationQuery;
use crate::types::{CurrentConditions, WeatherError};

pub const DEFAULT_API_URL: &str = "http://api.weatherapi.com/v1/current.json";

/// Anything that can report current conditions for a location query.
pub trait WeatherSource: Send + Sync {
    fn fetch_current(
        &self,
        query: &LocationQuery,
    ) -> impl Future<Output = Result<CurrentConditions, WeatherError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: Option<ApiLocation>,
    current: ApiCurrent,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    name: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    temp_c: f64,
    temp_f: f64,
    condition: ApiCondition,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    message: String,
}

/// No location matched the `q` parameter
const CODE_NO_LOCATION: i64 = 1006;
/// Key missing, invalid, over quota or disabled
const KEY_ERROR_CODES: [i64; 4] = [1002, 2006, 2007, 2008];

/// HTTP client for the current-conditions endpoint.
///
/// No request timeout is configured and failed requests are not retried.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

impl WeatherApiProvider {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, WeatherError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request_url(&self, query: &LocationQuery) -> String {
        format!(
            "{}?key={}&q={}",
            self.api_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&query.as_query_string()),
        )
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<CurrentConditions, WeatherError> {
        let status = response.status();

        // Only a plain 200 carries a usable report
        if status == reqwest::StatusCode::OK {
            let body: CurrentResponse = response
                .json()
                .await
                .map_err(|e| WeatherError::parse(format!("JSON parse error: {}", e)))?;

            let place = body.location.and_then(|l| match (l.name, l.region) {
                (Some(name), Some(region)) if !region.is_empty() => {
                    Some(format!("{}, {}", name, region))
                }
                (name, _) => name,
            });

            return Ok(CurrentConditions {
                temp_c: body.current.temp_c,
                temp_f: body.current.temp_f,
                condition_text: body.current.condition.text,
                place,
            });
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(ErrorResponse { error }) if error.code == CODE_NO_LOCATION => {
                Err(WeatherError::LocationNotFound(error.message))
            }
            Ok(ErrorResponse { error }) if KEY_ERROR_CODES.contains(&error.code) => {
                Err(WeatherError::InvalidApiKey)
            }
            Ok(ErrorResponse { error }) => Err(WeatherError::Api {
                code: error.code,
                message: error.message,
            }),
            Err(_) => Err(WeatherError::Status {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

impl WeatherSource for WeatherApiProvider {
    #[instrument(skip(self, query), fields(query = %query), level = "info")]
    async fn fetch_current(&self, query: &LocationQuery) -> Result<CurrentConditions, WeatherError> {
        tracing::info!("Fetching weather for: {}", query);

        let response = self.client.get(self.request_url(query)).send().await?;
        let conditions = self.handle_response(response).await?;

        tracing::debug!(
            "Weather response: {} C / {} F, {:?} ({})",
            conditions.temp_c,
            conditions.temp_f,
            conditions.condition_text,
            conditions.place.as_deref().unwrap_or("unknown place"),
        );
        Ok(conditions)
    }
}
