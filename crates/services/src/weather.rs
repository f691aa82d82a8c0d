//! Weather relay — current conditions lookup with a static fallback.
//!
//! Never fails the caller: a missing credential or a rejected upstream call
//! substitutes the demo report, annotated so clients can tell it apart from
//! live data.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hudgate_config::WeatherConfig;

/// The report shape the HUD frontend renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature: f64,
    pub condition: String,
    pub icon: String,
    pub location: String,
    pub humidity: u32,
    pub wind_speed: f64,
    /// True when this is fallback data rather than a live reading.
    pub demo: bool,
    /// The upstream error that forced the fallback, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WeatherReport {
    /// The static fallback report.
    fn demo(error: Option<String>) -> Self {
        Self {
            temperature: 22.0,
            condition: "partly cloudy".into(),
            icon: "02d".into(),
            location: "Unknown Location".into(),
            humidity: 65,
            wind_speed: 3.2,
            demo: true,
            error,
        }
    }
}

// --- Upstream wire types (OpenWeatherMap current-weather shape) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    main: ApiMain,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    #[serde(default)]
    wind: ApiWind,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    #[serde(default)]
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiWind {
    #[serde(default)]
    speed: f64,
}

fn report_from_api(api: ApiResponse) -> WeatherReport {
    let condition = api.weather.first();
    WeatherReport {
        temperature: api.main.temp,
        condition: condition.map(|c| c.description.clone()).unwrap_or_default(),
        icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        location: if api.name.is_empty() {
            "Unknown Location".into()
        } else {
            api.name
        },
        humidity: api.main.humidity,
        wind_speed: api.wind.speed,
        demo: false,
        error: None,
    }
}

/// Relays current-weather lookups to an OpenWeatherMap-style API.
pub struct WeatherService {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherService {
    pub fn new(config: &WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
            client,
        }
    }

    /// Look up current conditions at a coordinate. Infallible: any failure
    /// degrades to the demo report.
    pub async fn current(&self, latitude: f64, longitude: f64) -> WeatherReport {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No weather API key configured; serving demo data");
            return WeatherReport::demo(None);
        };

        let result = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Weather lookup failed; serving demo data");
                return WeatherReport::demo(Some(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Weather upstream rejected request; serving demo data");
            return WeatherReport::demo(Some(format!("Weather API error: {}", status.as_u16())));
        }

        match response.json::<ApiResponse>().await {
            Ok(api) => report_from_api(api),
            Err(e) => {
                warn!(error = %e, "Unparseable weather response; serving demo data");
                WeatherReport::demo(Some(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_serves_demo_report() {
        let service = WeatherService::new(&WeatherConfig::default());
        let report = service.current(37.77, -122.41).await;

        assert!(report.demo);
        assert!(report.error.is_none());
        assert_eq!(report.temperature, 22.0);
        assert_eq!(report.condition, "partly cloudy");
        assert_eq!(report.location, "Unknown Location");
    }

    #[test]
    fn api_response_maps_to_report() {
        let json = r#"{
            "main": {"temp": 17.4, "humidity": 72},
            "weather": [{"description": "light rain", "icon": "10d"}],
            "wind": {"speed": 5.1},
            "name": "San Francisco"
        }"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();
        let report = report_from_api(api);

        assert!(!report.demo);
        assert_eq!(report.temperature, 17.4);
        assert_eq!(report.condition, "light rain");
        assert_eq!(report.icon, "10d");
        assert_eq!(report.location, "San Francisco");
        assert_eq!(report.humidity, 72);
        assert_eq!(report.wind_speed, 5.1);
    }

    #[test]
    fn missing_optional_fields_fill_defaults() {
        let json = r#"{"main": {"temp": 3.0}}"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();
        let report = report_from_api(api);

        assert_eq!(report.temperature, 3.0);
        assert_eq!(report.location, "Unknown Location");
        assert!(report.condition.is_empty());
        assert_eq!(report.wind_speed, 0.0);
    }

    #[test]
    fn demo_report_serializes_without_null_error() {
        let report = WeatherReport::demo(None);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""demo":true"#));
        assert!(!json.contains("error"));
    }
}
