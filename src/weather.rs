use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{instrument, warn};
use url::Url;

/// Fixed degraded message shown when the weather lookup fails for any
/// reason. Weather problems must never surface as errors to the user.
pub const WEATHER_FALLBACK: &str =
    "오늘 청주 날씨 정보를 불러오지 못했어요. 외출 전에 날씨를 한 번 확인해 주세요!";

#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub temp_c: String,
    pub condition: String,
}

/// Abstracts the weather lookup so tests can run without the network.
#[async_trait]
pub trait WeatherClientTrait: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherReport>;
}

// wttr.in `format=j1` response, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct WttrResponse {
    current_condition: Vec<WttrCondition>,
}

#[derive(Debug, Deserialize)]
struct WttrCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc")]
    weather_desc: Vec<WttrValue>,
    // Korean condition text, present when lang=ko is requested.
    lang_ko: Option<Vec<WttrValue>>,
}

#[derive(Debug, Deserialize)]
struct WttrValue {
    value: String,
}

/// Weather client backed by wttr.in's JSON endpoint.
pub struct WttrWeatherClient {
    client: reqwest::Client,
    base_url: Url,
}

impl WttrWeatherClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build weather HTTP client")?;
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid weather URL '{}'", base_url))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl WeatherClientTrait for WttrWeatherClient {
    #[instrument(skip(self), err)]
    async fn current(&self, location: &str) -> Result<WeatherReport> {
        let mut url = self
            .base_url
            .join(location)
            .context("Failed to build weather request URL")?;
        url.query_pairs_mut()
            .append_pair("format", "j1")
            .append_pair("lang", "ko");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()
            .context("Weather service returned an error status")?;

        let body: WttrResponse = response
            .json()
            .await
            .context("Failed to parse weather response")?;

        let current = body
            .current_condition
            .first()
            .context("Weather response has no current condition")?;
        let condition = current
            .lang_ko
            .as_ref()
            .and_then(|values| values.first())
            .or_else(|| current.weather_desc.first())
            .map(|v| v.value.clone())
            .context("Weather response has no condition text")?;

        Ok(WeatherReport {
            temp_c: current.temp_c.clone(),
            condition,
        })
    }
}

/// Render the weather block that opens every response. Any lookup
/// failure becomes the fixed fallback message.
pub async fn weather_block(
    client: &dyn WeatherClientTrait,
    location: &str,
    timezone: Tz,
) -> String {
    let today = chrono::Utc::now().with_timezone(&timezone).format("%Y-%m-%d");
    match client.current(location).await {
        Ok(report) => format!(
            "🌤 오늘({}) 청주 날씨는 '{}', 기온은 {}°C 입니다. 즐거운 여행 되세요!",
            today, report.condition, report.temp_c
        ),
        Err(e) => {
            warn!("Weather lookup failed: {}", e);
            WEATHER_FALLBACK.to_string()
        }
    }
}

/// Fake weather client for tests: either a canned report or a failure.
pub struct FakeWeatherClient {
    report: Option<WeatherReport>,
}

impl FakeWeatherClient {
    pub fn with_report(temp_c: &str, condition: &str) -> Self {
        Self {
            report: Some(WeatherReport {
                temp_c: temp_c.to_string(),
                condition: condition.to_string(),
            }),
        }
    }

    pub fn failing() -> Self {
        Self { report: None }
    }
}

#[async_trait]
impl WeatherClientTrait for FakeWeatherClient {
    async fn current(&self, _location: &str) -> Result<WeatherReport> {
        self.report
            .clone()
            .ok_or_else(|| anyhow::anyhow!("fake weather failure"))
    }
}
