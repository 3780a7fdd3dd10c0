use std::env;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Semaphore";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat-completions endpoint (Hugging Face router, OpenAI-compatible).
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Default model served through the router.
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "semaphore=info,tower_http=info".to_string()
}

/// Runtime settings, read once from the environment at startup.
///
/// No credential configured means the gateway runs in fallback demo mode —
/// that is a supported deployment, not a misconfiguration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub sample_data_dir: PathBuf,
    /// Bearer token for the remote endpoint. `None` selects fallback mode.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub cost_per_1k_input_tokens: f64,
    pub cost_per_1k_output_tokens: f64,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub retrieval_enabled: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            database_path: env_path("SEMAPHORE_DATABASE_PATH")
                .unwrap_or_else(|| PathBuf::from("data/semaphore.db")),
            bind_addr: env_or("SEMAPHORE_BIND_ADDR", "127.0.0.1:8080"),
            sample_data_dir: env_path("SEMAPHORE_SAMPLE_DATA_DIR")
                .unwrap_or_else(|| PathBuf::from("sample_data")),
            api_key: non_empty(env::var("HF_API_KEY").ok()),
            model: env_or("HF_MODEL", DEFAULT_MODEL),
            base_url: env_or("HF_BASE_URL", DEFAULT_BASE_URL),
            cost_per_1k_input_tokens: env_parse("SEMAPHORE_COST_PER_1K_INPUT", 0.0001),
            cost_per_1k_output_tokens: env_parse("SEMAPHORE_COST_PER_1K_OUTPUT", 0.0002),
            llm_timeout_secs: env_parse("SEMAPHORE_LLM_TIMEOUT_SECS", 60),
            llm_max_retries: env_parse("SEMAPHORE_LLM_MAX_RETRIES", 3),
            retrieval_enabled: env_parse("SEMAPHORE_RETRIEVAL_ENABLED", true),
        }
    }

    /// True when no credential is configured and signals come from the
    /// deterministic fallback generator.
    pub fn demo_mode(&self) -> bool {
        self.api_key.is_none()
    }

    /// Settings for tests: no credential, zero-cost rates, local paths.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            bind_addr: "127.0.0.1:0".into(),
            sample_data_dir: PathBuf::from("sample_data"),
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            cost_per_1k_input_tokens: 0.0001,
            cost_per_1k_output_tokens: 0.0002,
            llm_timeout_secs: 5,
            llm_max_retries: 3,
            retrieval_enabled: true,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_semaphore() {
        assert_eq!(APP_NAME, "Semaphore");
    }

    #[test]
    fn test_settings_run_in_demo_mode() {
        let settings = Settings::for_tests();
        assert!(settings.demo_mode());
        assert!(settings.retrieval_enabled);
    }

    #[test]
    fn empty_api_key_means_no_credential() {
        assert_eq!(non_empty(Some("".into())), None);
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(Some("hf_abc".into())), Some("hf_abc".into()));
    }

    #[test]
    fn default_base_url_is_router() {
        assert!(DEFAULT_BASE_URL.starts_with("https://"));
        assert!(DEFAULT_BASE_URL.ends_with("/v1"));
    }
}
