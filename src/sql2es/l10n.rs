use crate::error::{ConvertError, StorageError};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    EmptySql,
    NoApiKey,
    ApiRequestFailed,
    ApiTimeout,
    ApiUnreachable,
    NoModelResults,
    InvalidModelResponse,
    MalformedDirective,
    StorageFailed,
    ConversionFailed,
    NoHistoryRecords,
    HistoryCleared,
    HistoryRecordMissing,
}

impl MessageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptySql => "error.emptySQL",
            Self::NoApiKey => "error.noAPIKey",
            Self::ApiRequestFailed => "error.apiRequestFailed",
            Self::ApiTimeout => "error.apiTimeout",
            Self::ApiUnreachable => "error.apiUnreachable",
            Self::NoModelResults => "error.noAIResults",
            Self::InvalidModelResponse => "error.invalidAIResponse",
            Self::MalformedDirective => "error.malformedDirective",
            Self::StorageFailed => "error.storageFailed",
            Self::ConversionFailed => "error.conversionFailed",
            Self::NoHistoryRecords => "error.noHistoryRecords",
            Self::HistoryCleared => "history.cleared.message",
            Self::HistoryRecordMissing => "history.record.missing",
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            Self::EmptySql => "SQL query is empty",
            Self::NoApiKey => "API key is not configured: {0}",
            Self::ApiRequestFailed => "AI model API request failed with status {0}: {1}",
            Self::ApiTimeout => "AI model API request timed out after {0}s",
            Self::ApiUnreachable => "AI model API could not be reached: {0}",
            Self::NoModelResults => "AI model returned no results",
            Self::InvalidModelResponse => "AI model response could not be decoded: {0}",
            Self::MalformedDirective => {
                "AI model output does not start with an HTTP method and path: {0}"
            }
            Self::StorageFailed => "Conversion history could not be saved: {0}",
            Self::ConversionFailed => "Conversion failed: {0}",
            Self::NoHistoryRecords => "No conversion history records",
            Self::HistoryCleared => "Conversion history cleared",
            Self::HistoryRecordMissing => "No history record with id {0}",
        }
    }
}

pub trait Catalog {
    fn template(&self, key: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

const ALL_KEYS: [MessageKey; 13] = [
    MessageKey::EmptySql,
    MessageKey::NoApiKey,
    MessageKey::ApiRequestFailed,
    MessageKey::ApiTimeout,
    MessageKey::ApiUnreachable,
    MessageKey::NoModelResults,
    MessageKey::InvalidModelResponse,
    MessageKey::MalformedDirective,
    MessageKey::StorageFailed,
    MessageKey::ConversionFailed,
    MessageKey::NoHistoryRecords,
    MessageKey::HistoryCleared,
    MessageKey::HistoryRecordMissing,
];

impl Catalog for DefaultCatalog {
    fn template(&self, key: &str) -> Option<&str> {
        ALL_KEYS
            .iter()
            .find(|candidate| candidate.as_str() == key)
            .map(|candidate| candidate.default_template())
    }
}

/// Templates loaded from a TOML file of `"key" = "template"` pairs, falling
/// back to the built-in English text for keys the file does not define.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    overrides: BTreeMap<String, String>,
}

impl FileCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let overrides: BTreeMap<String, String> = toml::from_str(&raw)
            .with_context(|| format!("failed to parse message catalog {}", path.display()))?;
        Ok(Self { overrides })
    }
}

impl Catalog for FileCatalog {
    fn template(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .map(String::as_str)
            .or_else(|| DefaultCatalog.template(key))
    }
}

/// Fills `{0}`, `{1}`, ... in one pass; unknown keys render as the key itself.
pub fn render(catalog: &dyn Catalog, key: MessageKey, args: &[String]) -> String {
    let template = catalog.template(key.as_str()).unwrap_or(key.as_str());
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after
            .find('}')
            .and_then(|close| Some((close, after[..close].parse::<usize>().ok()?)))
            .and_then(|(close, idx)| Some((close, args.get(idx)?)));
        match placeholder {
            Some((close, arg)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn convert_error_message(catalog: &dyn Catalog, err: &ConvertError) -> String {
    let (key, args) = match err {
        ConvertError::EmptyInput => (MessageKey::EmptySql, Vec::new()),
        ConvertError::Configuration(detail) => (MessageKey::NoApiKey, vec![detail.clone()]),
        ConvertError::RemoteCall {
            status,
            status_text,
            ..
        } => (
            MessageKey::ApiRequestFailed,
            vec![status.to_string(), status_text.clone()],
        ),
        ConvertError::RemoteTimeout { secs } => (MessageKey::ApiTimeout, vec![secs.to_string()]),
        ConvertError::Transport(detail) => (MessageKey::ApiUnreachable, vec![detail.clone()]),
        ConvertError::EmptyModelResponse => (MessageKey::NoModelResults, Vec::new()),
        ConvertError::InvalidResponse(detail) => {
            (MessageKey::InvalidModelResponse, vec![detail.clone()])
        }
        ConvertError::MalformedDirective(line) => {
            (MessageKey::MalformedDirective, vec![line.clone()])
        }
    };
    render(
        catalog,
        MessageKey::ConversionFailed,
        &[render(catalog, key, &args)],
    )
}

pub fn storage_error_message(catalog: &dyn Catalog, err: &StorageError) -> String {
    render(catalog, MessageKey::StorageFailed, &[err.to_string()])
}
