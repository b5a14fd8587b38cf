//! Server configuration

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_REGISTRY_URL: &str = "https://clinicaltrials.gov/api/v2";
const MAX_PAGE_SIZE: u32 = 100;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Optional shared secret required in `X-API-Key` for `/api/*`
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// LLM credential; stages that call the model fail without it
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub registry_base_url: String,
    pub registry_page_size: u32,
    /// Emit the age-range clause in registry queries
    pub age_filter: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            api_key: non_empty_var("API_KEY"),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|rps| *rps > 0)
                .unwrap_or(50),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            registry_base_url: non_empty_var("TRIAL_REGISTRY_URL")
                .unwrap_or_else(|| DEFAULT_REGISTRY_URL.into()),
            registry_page_size: std::env::var("TRIAL_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .map(|size| size.clamp(1, MAX_PAGE_SIZE))
                .unwrap_or(20),
            age_filter: std::env::var("TRIAL_AGE_FILTER")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            api_key: None,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 50,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            registry_base_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_page_size: 20,
            age_filter: false,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
