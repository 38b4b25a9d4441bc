use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::sql2es::config::load_config;
use crate::sql2es::history::HistoryStore;
use crate::sql2es::paths::resolve_paths;
use crate::sql2es::util::mask_secret;

include!(concat!(env!("OUT_DIR"), "/env_keys.rs"));

const BUILD_ID: &str = env!("BUILD_UUID");

fn unknown_env_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unknown: Vec<String> = keys
        .into_iter()
        .filter(|key| key.starts_with("SQL2ES_"))
        .filter(|key| !RECOGNISED_ENV_KEYS.contains(&key.as_str()))
        .collect();
    unknown.sort();
    unknown
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={BUILD_ID}"));
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("config_file={}", paths.config_file.display()));
    report.detail(format!("history_file={}", paths.history_file.display()));
    if let Some(messages) = &paths.messages_file {
        report.detail(format!("messages_file={}", messages.display()));
    }

    if !paths.config_file.exists() {
        report.detail("config_file.present=false (defaults + env only)");
    }

    let cfg = match load_config(&paths) {
        Ok(cfg) => cfg,
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
            return Ok(report);
        }
    };

    report.detail(format!("llm.api_endpoint={}", cfg.llm.api_endpoint));
    report.detail(format!("llm.model={}", cfg.llm.model));
    report.detail(format!("llm.api_key={}", mask_secret(&cfg.llm.api_key)));
    report.detail(format!(
        "llm.request_timeout_secs={}",
        cfg.llm.request_timeout_secs
    ));
    report.detail(format!("elasticsearch.version={}", cfg.elasticsearch.version));
    report.detail(format!(
        "elasticsearch.endpoint={}",
        cfg.elasticsearch.endpoint
    ));
    let basic_auth = !cfg.elasticsearch.username.is_empty() && !cfg.elasticsearch.password.is_empty();
    report.detail(format!("elasticsearch.basic_auth={basic_auth}"));

    let store = HistoryStore::open_file(&paths.history_file, cfg.history.max_items);
    report.detail(format!(
        "history.records={}/{}",
        store.count(),
        store.max_items()
    ));

    if cfg.llm.api_key.trim().is_empty() {
        report.issue("api key not configured; set SQL2ES_API_KEY or llm.api_key in config.toml");
    }
    for key in unknown_env_keys(env::vars().map(|(key, _)| key)) {
        report.issue(format!("unrecognised environment variable {key}"));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_keys_cover_settings_read_at_runtime() {
        for key in [
            "SQL2ES_HOME",
            "SQL2ES_CONFIG_PATH",
            "SQL2ES_HISTORY_FILE",
            "SQL2ES_MESSAGES_PATH",
            "SQL2ES_LOG",
            "SQL2ES_API_KEY",
            "SQL2ES_ES_PASSWORD",
            "SQL2ES_HISTORY_MAX_ITEMS",
        ] {
            assert!(RECOGNISED_ENV_KEYS.contains(&key), "{key}");
        }
    }

    #[test]
    fn recognised_keys_skip_log_prefixes_and_test_literals() {
        assert!(!RECOGNISED_ENV_KEYS.contains(&"SQL2ES_WARN"));
        assert!(!RECOGNISED_ENV_KEYS.contains(&"SQL2ES_APIKEY"));
    }

    #[test]
    fn unknown_env_keys_flags_only_unrecognised_sql2es_vars() {
        let got = unknown_env_keys(vec![
            "PATH".to_string(),
            "SQL2ES_API_KEY".to_string(),
            "SQL2ES_APIKEY".to_string(),
        ]);
        assert_eq!(got, vec!["SQL2ES_APIKEY".to_string()]);
    }
}
