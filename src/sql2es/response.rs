use crate::error::ConvertError;
use serde_json::Value;

const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "PATCH", "OPTIONS"];

/// Outcome of best-effort JSON formatting of the query body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedBody {
    /// The body parsed as JSON and was re-serialized with two-space indentation.
    Formatted(String),
    /// The body did not parse; the original text is kept verbatim.
    Raw(String),
}

impl FormattedBody {
    pub fn as_str(&self) -> &str {
        match self {
            FormattedBody::Formatted(text) | FormattedBody::Raw(text) => text,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            FormattedBody::Formatted(text) | FormattedBody::Raw(text) => text,
        }
    }

    pub fn is_formatted(&self) -> bool {
        matches!(self, FormattedBody::Formatted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub api_path: String,
    pub body: FormattedBody,
}

pub fn format_json(candidate: &str) -> FormattedBody {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => FormattedBody::Formatted(pretty),
            Err(_) => FormattedBody::Raw(candidate.to_string()),
        },
        Err(_) => FormattedBody::Raw(candidate.to_string()),
    }
}

/// Split a `METHOD PATH` directive at the first whitespace.
pub fn split_directive(api_path: &str) -> Option<(&str, &str)> {
    let (method, path) = api_path.trim().split_once(char::is_whitespace)?;
    let path = path.trim();
    if method.is_empty() || path.is_empty() {
        return None;
    }
    Some((method, path))
}

fn is_directive(line: &str) -> bool {
    let Some((method, _)) = split_directive(line) else {
        return false;
    };
    HTTP_METHODS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(method))
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Split raw model output into the directive line and the formatted body.
///
/// Markdown fence lines are dropped before the split; the first remaining
/// non-empty line is the directive and everything after it is the body.
pub fn parse_model_output(raw: &str) -> Result<ParsedResponse, ConvertError> {
    let mut lines = raw.lines().filter(|line| !is_fence_line(line));
    let directive = loop {
        match lines.next() {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line.trim(),
            None => return Err(ConvertError::EmptyModelResponse),
        }
    };
    if !is_directive(directive) {
        return Err(ConvertError::MalformedDirective(directive.to_string()));
    }

    let candidate = lines.collect::<Vec<_>>().join("\n");
    Ok(ParsedResponse {
        api_path: directive.to_string(),
        body: format_json(candidate.trim()),
    })
}
