//! Current weather from the Open-Meteo forecast API

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::server::{ToolError, ToolOutcome, ToolServer};
use crate::types::{Tool, ToolCall};

/// Server name used for routing
pub const WEATHER_SERVER_NAME: &str = "weather";

/// Public Open-Meteo endpoint
pub const DEFAULT_WEATHER_API_BASE: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";

/// Tool server for current weather conditions
pub struct WeatherServer {
    client: reqwest::Client,
    api_base: String,
}

impl WeatherServer {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
        })
    }

    /// Server against the public endpoint with a 15 second timeout
    pub fn with_defaults() -> Result<Self, ToolError> {
        Self::new(DEFAULT_WEATHER_API_BASE, Duration::from_secs(15))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/forecast", self.api_base.trim_end_matches('/'))
    }

    /// Fetch current conditions. Upstream failures are reported as
    /// `{"error": ...}` values rather than errors.
    pub async fn get_weather(&self, latitude: f64, longitude: f64, location: &str) -> Value {
        debug!(latitude, longitude, location, "Fetching weather");

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("temperature_unit", "celsius".to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Weather request failed");
                return json!({ "error": format!("Failed to fetch weather: {}", e) });
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Weather API returned an error status");
            return json!({ "error": format!("API error: {}", status.as_u16()) });
        }

        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => return json!({ "error": format!("Failed to fetch weather: {}", e) }),
        };

        let current = data.get("current").cloned().unwrap_or_else(|| json!({}));
        json!({
            "location": location,
            "temperature": format!("{}°C", reading(&current, "temperature_2m")),
            "humidity": format!("{}%", reading(&current, "relative_humidity_2m")),
            "wind_speed": format!("{} km/h", reading(&current, "wind_speed_10m")),
            "coordinates": { "lat": latitude, "lon": longitude },
        })
    }
}

fn reading(current: &Value, key: &str) -> String {
    match current.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "unknown".to_string(),
    }
}

#[async_trait]
impl ToolServer for WeatherServer {
    fn name(&self) -> &str {
        WEATHER_SERVER_NAME
    }

    fn description(&self) -> &str {
        "Get current weather information"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![Tool::new("get_weather", "Get current weather for a location using Open-Meteo API").with_schema(
            json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number", "description": "Latitude coordinate" },
                    "longitude": { "type": "number", "description": "Longitude coordinate" },
                    "location_name": {
                        "type": "string",
                        "description": "Human-readable location name (optional)"
                    }
                },
                "required": ["latitude", "longitude", "location_name"]
            }),
        )]
    }

    async fn call_tool(&self, call: &ToolCall) -> ToolOutcome {
        if call.name != "get_weather" {
            return Err(ToolError::UnknownTool(call.name.clone()));
        }

        let latitude = call
            .get_arg_f64("latitude")
            .ok_or_else(|| ToolError::bad_argument("latitude", "a number"))?;
        let longitude = call
            .get_arg_f64("longitude")
            .ok_or_else(|| ToolError::bad_argument("longitude", "a number"))?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ToolError::InvalidArguments(format!("latitude {} is out of range", latitude)));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolError::InvalidArguments(format!("longitude {} is out of range", longitude)));
        }
        let location = call.get_arg_str("location_name").unwrap_or("Unknown");

        Ok(self.get_weather(latitude, longitude, location).await)
    }
}
