use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

const DOTENV_FILE: &str = ".env";

#[derive(Debug, Clone)]
pub struct Sql2EsPaths {
    pub home: PathBuf,
    pub config_file: PathBuf,
    pub history_file: PathBuf,
    pub messages_file: Option<PathBuf>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

/// `SQL2ES_HOME` wins; otherwise `~/.sql2es`.
fn sql2es_home(override_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    override_home.or_else(|| home_dir.map(|home| home.join(".sql2es")))
}

fn dotenv_fallback(home: &Path) -> PathBuf {
    home.join(DOTENV_FILE)
}

/// Load `.env` from the working directory, falling back to the one in the
/// sql2es home. Existing process variables are never overwritten.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    let Some(home) = sql2es_home(env_path("SQL2ES_HOME"), dirs::home_dir()) else {
        return;
    };
    let path = dotenv_fallback(&home);
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

pub fn resolve_paths() -> Result<Sql2EsPaths> {
    let home = sql2es_home(env_path("SQL2ES_HOME"), dirs::home_dir())
        .ok_or_else(|| anyhow::anyhow!("HOME directory could not be resolved"))?;

    let config_file = env_or_default_path("SQL2ES_CONFIG_PATH", home.join("config.toml"));
    let history_file = env_or_default_path(
        "SQL2ES_HISTORY_FILE",
        home.join("history").join("conversion_history.json"),
    );
    let messages_file = env_path("SQL2ES_MESSAGES_PATH");

    Ok(Sql2EsPaths {
        home,
        config_file,
        history_file,
        messages_file,
    })
}
