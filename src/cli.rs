use clap::Parser;
use std::path::PathBuf;

/// Common command-line arguments that can be shared between different apps
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the site-to-café catalog CSV (CP949 or UTF-8)
    #[arg(long, env = "CATALOG_PATH", default_value = "data/cj_data_final.csv")]
    pub catalog: PathBuf,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    pub openai_api_base: Option<String>,

    /// Chat model used for site descriptions
    #[arg(long, default_value = "gpt-3.5-turbo")]
    pub chat_model: String,

    /// Base URL of the wttr.in-compatible weather service
    #[arg(long, env = "WEATHER_URL", default_value = "https://wttr.in/")]
    pub weather_url: String,

    /// Location query sent to the weather service
    #[arg(long, default_value = "Cheongju")]
    pub weather_location: String,

    /// Literal review value meaning "no review exists"; repeatable.
    /// Defaults to the known placeholder tokens when not given.
    #[arg(long = "no-review-token")]
    pub no_review_tokens: Vec<String>,

    /// Seconds of inactivity before a chat session is dropped
    #[arg(long, default_value_t = 3600)]
    pub session_ttl_secs: u64,

    /// Timezone
    #[arg(long, env = "TIMEZONE")]
    pub timezone: Option<String>,
}
