use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Hard cap on a single inbound WS text frame (base64 audio chunks included).
pub const MAX_WS_PAYLOAD_BYTES: usize = 512 * 1024;

/// Top-level config (`interview.toml` + `INTERVIEW_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub interview: InterviewDefaults,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            interview: InterviewDefaults::default(),
            providers: ProvidersConfig::default(),
            stores: StoresConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// CORS allow-list (origins). Empty means "no cross-origin access".
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Defaults driving the turn pipeline and interview structure (spec §6 Defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDefaults {
    #[serde(default = "default_max_questions")]
    pub max_questions: u32,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
    #[serde(default = "default_window_size")]
    pub sliding_window_size: usize,
    #[serde(default = "default_hot_tier_ttl_buffer_secs")]
    pub hot_tier_ttl_buffer_secs: i64,
    #[serde(default = "default_stt_keepalive_period_secs")]
    pub stt_keepalive_period_secs: u64,
    #[serde(default = "default_stt_finalise_wait_secs")]
    pub stt_finalise_wait_secs: u64,
    #[serde(default = "default_receive_timeout_secs")]
    pub receive_timeout_secs: u64,
    #[serde(default = "default_idle_break_secs")]
    pub idle_break_secs: u64,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for InterviewDefaults {
    fn default() -> Self {
        Self {
            max_questions: default_max_questions(),
            duration_minutes: default_duration_minutes(),
            sliding_window_size: default_window_size(),
            hot_tier_ttl_buffer_secs: default_hot_tier_ttl_buffer_secs(),
            stt_keepalive_period_secs: default_stt_keepalive_period_secs(),
            stt_finalise_wait_secs: default_stt_finalise_wait_secs(),
            receive_timeout_secs: default_receive_timeout_secs(),
            idle_break_secs: default_idle_break_secs(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

/// Pools of provider credentials, one comma-separated list per provider kind.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    /// STT provider API keys.
    #[serde(default)]
    pub stt_keys: Vec<String>,
    /// TTS provider API keys.
    #[serde(default)]
    pub tts_keys: Vec<String>,
    /// Per-vendor LLM API keys, keyed by vendor id (e.g. "vendor-x", "vendor-y").
    #[serde(default)]
    pub llm_vendors: Vec<LlmVendorConfig>,
    /// Task → "vendor:model" routing table (spec §4.B).
    #[serde(default = "default_routing")]
    pub routing: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmVendorConfig {
    pub id: String,
    pub base_url: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoresConfig {
    /// Ephemeral (hot) key-value store connection string. Out of scope per
    /// spec §1 — only the interface in `interview-session::hot` is owned here.
    #[serde(default)]
    pub ephemeral_store_url: Option<String>,
    /// Durable (cold) document store project id.
    #[serde(default)]
    pub durable_store_project_id: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_questions() -> u32 {
    15
}
fn default_duration_minutes() -> i64 {
    30
}
fn default_window_size() -> usize {
    5
}
fn default_hot_tier_ttl_buffer_secs() -> i64 {
    30 * 60
}
fn default_stt_keepalive_period_secs() -> u64 {
    2
}
fn default_stt_finalise_wait_secs() -> u64 {
    1
}
fn default_receive_timeout_secs() -> u64 {
    120
}
fn default_idle_break_secs() -> u64 {
    180
}
fn default_ping_interval_secs() -> u64 {
    20
}
fn default_routing() -> std::collections::HashMap<String, String> {
    let mut m = std::collections::HashMap::new();
    m.insert("question_generation".to_string(), "vendor-x:small".to_string());
    m.insert("answer_evaluation".to_string(), "vendor-y:medium".to_string());
    m.insert("report_generation".to_string(), "vendor-y:large".to_string());
    m.insert("conversational_framing".to_string(), "vendor-x:small".to_string());
    m
}

impl EngineConfig {
    /// Load config from a TOML file with `INTERVIEW_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, `INTERVIEW_CONFIG` env var,
    /// `./interview.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(|| "interview.toml".to_string());

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("INTERVIEW_").split("__"))
            .extract()
            .map_err(|e| crate::error::InterviewError::Config(e.to_string()))
    }
}
