pub mod convert;
pub mod history;
pub mod status;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::sql2es::l10n::{Catalog, DefaultCatalog, FileCatalog};
use crate::sql2es::paths::Sql2EsPaths;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            output: None,
            data: None,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn set_output(&mut self, text: impl Into<String>) {
        self.output = Some(text.into());
    }

    pub fn set_data<T: Serialize>(&mut self, data: &T) -> Result<()> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(())
    }
}

pub fn load_catalog(paths: &Sql2EsPaths) -> Result<Box<dyn Catalog>> {
    match &paths.messages_file {
        Some(path) => Ok(Box::new(FileCatalog::load(path)?)),
        None => Ok(Box::new(DefaultCatalog)),
    }
}

/// SQL comes from the positional argument, then `--file`, then stdin.
pub fn read_sql_input(sql: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(sql) = sql {
        return Ok(sql.to_string());
    }
    if let Some(path) = file {
        return fs::read_to_string(path)
            .with_context(|| format!("failed to read SQL from {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read SQL from stdin")?;
    Ok(buf)
}
