use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, load_catalog, read_sql_input};
use crate::error::ConvertError;
use crate::sql2es::client::ChatCompletionClient;
use crate::sql2es::config::load_config;
use crate::sql2es::history::HistoryStore;
use crate::sql2es::l10n::{convert_error_message, storage_error_message};
use crate::sql2es::paths::resolve_paths;
use crate::sql2es::pipeline::{ConversionKind, Converter};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub kind: ConversionKind,
    pub sql: Option<String>,
    pub file: Option<PathBuf>,
    pub save_history: bool,
}

fn report_convert_error(report: &mut CommandReport, message: String, err: &ConvertError) {
    report.issue(format!("{}: {message}", err.code().as_str()));
    if let ConvertError::RemoteCall { body, .. } = err
        && !body.is_empty()
    {
        report.detail(format!("remote_body={body}"));
    }
}

pub fn run(opts: &ConvertOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let catalog = load_catalog(&paths)?;
    let mut report = CommandReport::new(match opts.kind {
        ConversionKind::Dsl => "convert",
        ConversionKind::Curl => "curl",
    });

    let sql = read_sql_input(opts.sql.as_deref(), opts.file.as_deref())?;

    let client = match ChatCompletionClient::new(cfg.llm.request_timeout_secs) {
        Ok(client) => client,
        Err(err) => {
            let message = convert_error_message(catalog.as_ref(), &err);
            report_convert_error(&mut report, message, &err);
            return Ok(report);
        }
    };
    let converter = Converter::new(client, cfg.convert_config());

    let result = match converter.convert(&sql, opts.kind) {
        Ok(result) => result,
        Err(err) => {
            let message = convert_error_message(catalog.as_ref(), &err);
            report_convert_error(&mut report, message, &err);
            return Ok(report);
        }
    };
    report.set_output(result.render());
    report.set_data(&result)?;
    report.detail(format!("type={}", result.kind()));
    report.detail(format!("model={}", cfg.llm.model));

    if !opts.save_history {
        report.detail("history=skipped");
        return Ok(report);
    }

    let store = HistoryStore::open_file(&paths.history_file, cfg.history.max_items);
    match store.append(&sql, &result) {
        Ok(Some(record)) => report.detail(format!("history_id={}", record.id)),
        Ok(None) => report.detail("history=skipped"),
        Err(err) => report.issue(format!(
            "{}: {}",
            err.code().as_str(),
            storage_error_message(catalog.as_ref(), &err)
        )),
    }

    Ok(report)
}
