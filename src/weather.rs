//! Dashboard weather feed.
//!
//! The dashboard shows current conditions next to the policy listing. This
//! feed polls a configured JSON endpoint and caches the latest snapshot;
//! a fetch failure leaves the previous snapshot in place.

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub rainfall: f64,
    pub fetched_at: i64,
}

#[derive(Debug, Deserialize)]
struct WeatherPayload {
    temperature: f64,
    humidity: f64,
    #[serde(alias = "windSpeed")]
    wind_speed: f64,
    rainfall: f64,
}

pub struct WeatherFeed {
    client: Client,
    url: String,
    latest: RwLock<Option<WeatherSnapshot>>,
}

impl WeatherFeed {
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            latest: RwLock::new(None),
        })
    }

    pub async fn fetch(&self) -> Result<WeatherSnapshot> {
        let payload: WeatherPayload = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("weather request failed")?
            .json()
            .await
            .context("failed to parse weather response")?;

        let snapshot = WeatherSnapshot {
            temperature: payload.temperature,
            humidity: payload.humidity,
            wind_speed: payload.wind_speed,
            rainfall: payload.rainfall,
            fetched_at: Utc::now().timestamp(),
        };

        *self.latest.write() = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub fn latest(&self) -> Option<WeatherSnapshot> {
        self.latest.read().clone()
    }
}

/// Background polling loop for the weather snapshot
pub async fn spawn_weather_poller(feed: Arc<WeatherFeed>, poll_interval: Duration) {
    loop {
        match feed.fetch().await {
            Ok(snapshot) => {
                debug!(
                    temperature = snapshot.temperature,
                    rainfall = snapshot.rainfall,
                    "weather snapshot updated"
                );
            }
            Err(e) => {
                warn!(error = %e, "weather fetch failed, keeping previous snapshot");
            }
        }
        sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accepts_camel_case_wind_speed() {
        let json = r#"{"temperature":24.0,"humidity":65.0,"windSpeed":12.0,"rainfall":2.0}"#;
        let payload: WeatherPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.wind_speed, 12.0);
    }

    #[test]
    fn feed_starts_with_no_snapshot() {
        let feed = WeatherFeed::new("http://localhost/weather".to_string()).unwrap();
        assert!(feed.latest().is_none());
    }
}
