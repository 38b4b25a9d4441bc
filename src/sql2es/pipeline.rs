use crate::error::ConvertError;
use crate::sql2es::client::{CompletionRequest, ModelClient};
use crate::sql2es::curl::build_curl_command;
use crate::sql2es::response::{FormattedBody, parse_model_output};
use crate::sql2es::warn;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Everything a single conversion needs; loaded by the host, read-only here.
#[derive(Debug, Clone, Default)]
pub struct ConvertConfig {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
    pub es_version: String,
    pub es_endpoint: String,
    pub es_username: String,
    pub es_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionKind {
    Dsl,
    Curl,
}

impl ConversionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionKind::Dsl => "dsl",
            ConversionKind::Curl => "curl",
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ConversionKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dsl" => Ok(ConversionKind::Dsl),
            "curl" => Ok(ConversionKind::Curl),
            other => Err(format!("unknown conversion type `{other}`; use `dsl` or `curl`")),
        }
    }
}

/// Serialized with the same field names as a stored history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DslQuery {
    pub api_path: String,
    #[serde(rename = "esQuery")]
    pub query_dsl: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConversionResult {
    Dsl(DslQuery),
    Curl { command: String },
}

impl ConversionResult {
    pub fn kind(&self) -> ConversionKind {
        match self {
            ConversionResult::Dsl(_) => ConversionKind::Dsl,
            ConversionResult::Curl { .. } => ConversionKind::Curl,
        }
    }

    /// Text form handed back to the user: directive and body, or the command.
    pub fn render(&self) -> String {
        match self {
            ConversionResult::Dsl(query) if query.query_dsl.is_empty() => query.api_path.clone(),
            ConversionResult::Dsl(query) => format!("{}\n{}", query.api_path, query.query_dsl),
            ConversionResult::Curl { command } => command.clone(),
        }
    }
}

pub fn build_prompt(sql: &str, es_version: &str) -> String {
    format!(
        "Convert the following SQL query to Elasticsearch {es_version} query DSL. Return the HTTP method and path on the first line, followed by the JSON DSL on the remaining lines. Do not include any explanation, prose, or markdown:\n\n{sql}"
    )
}

pub fn convert_to_query(
    client: &dyn ModelClient,
    sql: &str,
    config: &ConvertConfig,
) -> Result<DslQuery, ConvertError> {
    if sql.trim().is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    if config.api_key.trim().is_empty() {
        return Err(ConvertError::Configuration(
            "API key is not configured; set SQL2ES_API_KEY or llm.api_key".to_string(),
        ));
    }

    let request = CompletionRequest {
        endpoint: config.api_endpoint.clone(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        prompt: build_prompt(sql, &config.es_version),
    };
    let raw = client.complete(&request)?;
    let parsed = parse_model_output(&raw)?;

    if let FormattedBody::Raw(text) = &parsed.body
        && !text.is_empty()
    {
        warn::emit(
            "W101_RAW_BODY",
            "format",
            "passthrough",
            &parsed.api_path,
            "body is not valid JSON",
        );
    }
    info!(
        "converted sql to {} (body_formatted={})",
        parsed.api_path,
        parsed.body.is_formatted()
    );

    Ok(DslQuery {
        api_path: parsed.api_path,
        query_dsl: parsed.body.into_string(),
    })
}

pub fn convert_to_curl(
    client: &dyn ModelClient,
    sql: &str,
    config: &ConvertConfig,
) -> Result<String, ConvertError> {
    let query = convert_to_query(client, sql, config)?;
    build_curl_command(&query.api_path, &query.query_dsl, config)
}

/// A model client bound to one configuration.
pub struct Converter<C> {
    client: C,
    config: ConvertConfig,
}

impl<C: ModelClient> Converter<C> {
    pub fn new(client: C, config: ConvertConfig) -> Self {
        Self { client, config }
    }

    pub fn convert(&self, sql: &str, kind: ConversionKind) -> Result<ConversionResult, ConvertError> {
        match kind {
            ConversionKind::Dsl => {
                convert_to_query(&self.client, sql, &self.config).map(ConversionResult::Dsl)
            }
            ConversionKind::Curl => convert_to_curl(&self.client, sql, &self.config)
                .map(|command| ConversionResult::Curl { command }),
        }
    }
}
