use crate::sql2es::paths::Sql2EsPaths;
use crate::sql2es::pipeline::ConvertConfig;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ES_VERSION: &str = "7.x";
pub const DEFAULT_ES_ENDPOINT: &str = "localhost:9200";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_HISTORY_MAX_ITEMS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub version: String,
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_ES_VERSION.to_string(),
            endpoint: DEFAULT_ES_ENDPOINT.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_HISTORY_MAX_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sql2EsConfig {
    pub llm: LlmConfig,
    pub elasticsearch: ElasticsearchConfig,
    pub history: HistoryConfig,
}

impl Sql2EsConfig {
    pub fn convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            api_key: self.llm.api_key.clone(),
            api_endpoint: self.llm.api_endpoint.clone(),
            model: self.llm.model.clone(),
            es_version: self.elasticsearch.version.clone(),
            es_endpoint: self.elasticsearch.endpoint.clone(),
            es_username: self.elasticsearch.username.clone(),
            es_password: self.elasticsearch.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSql2EsConfig {
    llm: Option<LlmConfig>,
    elasticsearch: Option<ElasticsearchConfig>,
    history: Option<HistoryConfig>,
}

fn env_or_u64(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: u64) -> u64 {
    match lookup(var) {
        Some(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        None => fallback,
    }
}

fn env_or_usize(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: usize) -> usize {
    match lookup(var) {
        Some(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        None => fallback,
    }
}

fn env_or_string(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

/// Credentials are used byte for byte; only an empty value counts as unset.
fn env_or_secret(lookup: &impl Fn(&str) -> Option<String>, var: &str, fallback: &str) -> String {
    match lookup(var) {
        Some(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &Sql2EsConfig) -> Result<()> {
    if cfg.llm.api_endpoint.trim().is_empty() {
        return Err(anyhow!("invalid api endpoint: cannot be empty"));
    }
    if cfg.llm.model.trim().is_empty() {
        return Err(anyhow!("invalid model: cannot be empty"));
    }
    if cfg.llm.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.elasticsearch.version.trim().is_empty() {
        return Err(anyhow!("invalid elasticsearch version: cannot be empty"));
    }
    if cfg.history.max_items == 0 {
        return Err(anyhow!("invalid history max items: must be >= 1"));
    }
    Ok(())
}

fn merge_file_config(base: &mut Sql2EsConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialSql2EsConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse sql2es config {}: {err}", path.display()))?;
    if let Some(llm) = parsed.llm {
        base.llm = llm;
    }
    if let Some(elasticsearch) = parsed.elasticsearch {
        base.elasticsearch = elasticsearch;
    }
    if let Some(history) = parsed.history {
        base.history = history;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut Sql2EsConfig) {
    apply_overrides(cfg, &|var: &str| env::var(var).ok());
}

fn apply_overrides(cfg: &mut Sql2EsConfig, lookup: &impl Fn(&str) -> Option<String>) {
    cfg.llm.api_key = env_or_secret(lookup, "SQL2ES_API_KEY", &cfg.llm.api_key);
    cfg.llm.api_endpoint = env_or_string(lookup, "SQL2ES_API_ENDPOINT", &cfg.llm.api_endpoint);
    cfg.llm.model = env_or_string(lookup, "SQL2ES_MODEL", &cfg.llm.model);
    cfg.llm.request_timeout_secs = env_or_u64(
        lookup,
        "SQL2ES_REQUEST_TIMEOUT_SECS",
        cfg.llm.request_timeout_secs,
    );
    cfg.elasticsearch.version =
        env_or_string(lookup, "SQL2ES_ES_VERSION", &cfg.elasticsearch.version);
    cfg.elasticsearch.endpoint =
        env_or_string(lookup, "SQL2ES_ES_ENDPOINT", &cfg.elasticsearch.endpoint);
    cfg.elasticsearch.username =
        env_or_secret(lookup, "SQL2ES_ES_USERNAME", &cfg.elasticsearch.username);
    cfg.elasticsearch.password =
        env_or_secret(lookup, "SQL2ES_ES_PASSWORD", &cfg.elasticsearch.password);
    cfg.history.max_items =
        env_or_usize(lookup, "SQL2ES_HISTORY_MAX_ITEMS", cfg.history.max_items);
}

pub fn load_config(paths: &Sql2EsPaths) -> Result<Sql2EsConfig> {
    let mut cfg = Sql2EsConfig::default();
    merge_file_config(&mut cfg, &paths.config_file)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}
