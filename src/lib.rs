use crate::cafes::PlaceholderSet;
use crate::catalog::Catalog;
use crate::openai::{real::maybe_create_openai_client, OpenAIClientTrait};
use crate::weather::{WeatherClientTrait, WttrWeatherClient};
use anyhow::Result;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub mod app;
pub mod cafes;
pub mod catalog;
pub mod cli;
pub mod guide;
pub mod openai;
pub mod prompts;
pub mod session;
pub mod time_util;
pub mod weather;

pub mod test_utils;

// ServiceStats struct for both main app and testing
#[derive(Debug)]
pub struct ServiceStats {
    pub processed_count: AtomicU64,
    pub error_count: AtomicU64,
    pub total_processing_time_ms: AtomicU64,
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            processed_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_processing_time_ms: AtomicU64::new(0),
        }
    }
}

// Define the AppState struct for both main app and testing
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub openai_client: Option<Arc<dyn OpenAIClientTrait>>,
    pub weather_client: Arc<dyn WeatherClientTrait>,
    pub chat_model: String,
    pub weather_location: String,
    pub placeholder_reviews: PlaceholderSet,
    pub sessions: Arc<session::Store>,
    pub stats: ServiceStats,
    pub timezone: chrono_tz::Tz,
}

impl AppState {
    pub fn new_for_testing() -> Self {
        Self::new_for_testing_with_clients(None, None)
    }

    pub fn new_for_testing_with_openai_client(
        openai_client: Option<Arc<dyn OpenAIClientTrait>>,
    ) -> Self {
        Self::new_for_testing_with_clients(openai_client, None)
    }

    // Create a new AppState for testing with a small in-memory catalog
    // and fake collaborators; no network, no files.
    pub fn new_for_testing_with_clients(
        openai_client: Option<Arc<dyn OpenAIClientTrait>>,
        weather_client: Option<Arc<dyn WeatherClientTrait>>,
    ) -> Self {
        let catalog = Catalog::from_rows(test_utils::sample_catalog_rows());

        Self {
            catalog: Arc::new(catalog),
            openai_client,
            weather_client: weather_client.unwrap_or_else(|| {
                Arc::new(weather::FakeWeatherClient::with_report("24", "맑음"))
            }),
            chat_model: "gpt-3.5-turbo".to_string(),
            weather_location: "Cheongju".to_string(),
            placeholder_reviews: PlaceholderSet::default(),
            sessions: Arc::new(session::Store::new(Duration::from_secs(
                3600,
            ))),
            stats: ServiceStats::new(),
            timezone: chrono_tz::Asia::Seoul,
        }
    }
}

// Create a config struct to hold AppState configuration
pub struct AppConfig {
    pub catalog: Catalog,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub chat_model: String,
    pub weather_url: String,
    pub weather_location: String,
    pub no_review_tokens: Vec<String>,
    pub session_ttl_secs: u64,
    pub timezone_str: Option<String>,
}

// Function to create AppState from parameters
pub fn create_app_state(config: AppConfig) -> Result<Arc<AppState>> {
    let timezone =
        time_util::get_local_timezone(config.timezone_str.as_deref());

    let openai_client = match maybe_create_openai_client(
        config.openai_api_key,
        config.openai_api_base,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Failed to create OpenAI client: {}", e);
            None
        }
    };

    let weather_client: Arc<dyn WeatherClientTrait> =
        Arc::new(WttrWeatherClient::new(&config.weather_url)?);

    let placeholder_reviews = if config.no_review_tokens.is_empty() {
        PlaceholderSet::default()
    } else {
        PlaceholderSet::new(config.no_review_tokens)
    };

    Ok(Arc::new(AppState {
        catalog: Arc::new(config.catalog),
        openai_client,
        weather_client,
        chat_model: config.chat_model,
        weather_location: config.weather_location,
        placeholder_reviews,
        sessions: Arc::new(session::Store::new(Duration::from_secs(
            config.session_ttl_secs,
        ))),
        stats: ServiceStats::new(),
        timezone,
    }))
}
