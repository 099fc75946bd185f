use clap::Parser;
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "scan-gateway")]
#[command(about = "Batch image field extraction gateway for vision models")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // OpenAI-compatible API base url (chat/completions is appended)
    #[arg(long, env = "API_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub api_base_url: String,

    // Bearer token for the extraction backend
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    // Vision model used for extraction
    #[arg(short, long, env = "MODEL", default_value = "gpt-4.1-mini")]
    pub model: String,

    // Completion token cap per image
    #[arg(long, default_value_t = 4096)]
    pub max_tokens: u32,

    // Rate limit max batches per window, per client
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Per-image extraction timeout in seconds, 0 disables it
    #[arg(long, default_value_t = 60)]
    pub extraction_timeout: u64,

    // Max request body size for uploads
    #[arg(long, default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn extraction_timeout(&self) -> Option<Duration> {
        (self.extraction_timeout > 0).then(|| Duration::from_secs(self.extraction_timeout))
    }
}
