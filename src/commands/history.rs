use anyhow::{Context, Result};

use crate::commands::{CommandReport, load_catalog};
use crate::sql2es::config::load_config;
use crate::sql2es::history::{HistoryPatch, HistoryQuery, HistoryRecord, HistoryStore};
use crate::sql2es::l10n::{Catalog, MessageKey, render, storage_error_message};
use crate::sql2es::paths::resolve_paths;
use crate::sql2es::store::FileBackend;
use crate::sql2es::util::{format_epoch_millis, truncate_with_ellipsis};

const LIST_SQL_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub enum HistoryAction {
    List(HistoryQuery),
    Show { id: String },
    Edit { id: String, patch: HistoryPatch },
    Delete { id: String },
    Clear,
    Count,
}

impl HistoryAction {
    fn label(&self) -> &'static str {
        match self {
            HistoryAction::List(_) => "history-list",
            HistoryAction::Show { .. } => "history-show",
            HistoryAction::Edit { .. } => "history-edit",
            HistoryAction::Delete { .. } => "history-delete",
            HistoryAction::Clear => "history-clear",
            HistoryAction::Count => "history-count",
        }
    }
}

/// Combine a JSON patch with individual field flags; flags win.
pub fn build_patch(
    json: Option<&str>,
    es_query: Option<String>,
    api_path: Option<String>,
    curl_command: Option<String>,
) -> Result<HistoryPatch> {
    let mut patch = match json {
        Some(raw) => HistoryPatch::from_json(raw).context("invalid --patch JSON")?,
        None => HistoryPatch::default(),
    };
    if es_query.is_some() {
        patch.es_query = es_query;
    }
    if api_path.is_some() {
        patch.api_path = api_path;
    }
    if curl_command.is_some() {
        patch.curl_command = curl_command;
    }
    Ok(patch)
}

fn list_line(record: &HistoryRecord) -> String {
    format!(
        "{}  {}  {:<4}  {}",
        record.id,
        format_epoch_millis(record.timestamp),
        record.kind,
        truncate_with_ellipsis(&record.sql_query, LIST_SQL_PREVIEW_CHARS)
    )
}

fn show_text(record: &HistoryRecord) -> String {
    format!(
        "id: {}\ncreated: {}\ntype: {}\n\nsql:\n{}\n\nresult:\n{}",
        record.id,
        format_epoch_millis(record.timestamp),
        record.kind,
        record.sql_query,
        record.result_text()
    )
}

fn missing(report: &mut CommandReport, catalog: &dyn Catalog, id: &str) {
    report.issue(render(
        catalog,
        MessageKey::HistoryRecordMissing,
        &[id.to_string()],
    ));
}

pub fn run(action: &HistoryAction) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let catalog = load_catalog(&paths)?;
    let catalog = catalog.as_ref();
    let store: HistoryStore<FileBackend> =
        HistoryStore::open_file(&paths.history_file, cfg.history.max_items);
    let mut report = CommandReport::new(action.label());
    report.detail(format!("history_file={}", paths.history_file.display()));

    match action {
        HistoryAction::List(query) => {
            let page = store.query(query);
            report.detail(format!(
                "total={} offset={} shown={}",
                page.total,
                page.offset,
                page.records.len()
            ));
            if page.records.is_empty() {
                report.set_output(render(catalog, MessageKey::NoHistoryRecords, &[]));
            } else {
                let lines: Vec<String> = page.records.iter().map(list_line).collect();
                report.set_output(lines.join("\n"));
            }
            report.set_data(&page)?;
        }
        HistoryAction::Show { id } => match store.get(id) {
            Some(record) => {
                report.set_output(show_text(&record));
                report.set_data(&record)?;
            }
            None => missing(&mut report, catalog, id),
        },
        HistoryAction::Edit { id, patch } => {
            if patch.is_empty() {
                report.issue("nothing to update; pass --es-query, --api-path, --curl-command or --patch");
                return Ok(report);
            }
            let Some(current) = store.get(id) else {
                missing(&mut report, catalog, id);
                return Ok(report);
            };
            let ignored = patch.ignored_fields(current.kind);
            if ignored.len() == patch.field_names().len() {
                report.issue(format!(
                    "{} does not apply to {} records; nothing updated",
                    ignored.join(", "),
                    current.kind
                ));
                return Ok(report);
            }
            match store.update(id, patch) {
                Ok(true) => {
                    report.detail(format!("updated={id}"));
                    if !ignored.is_empty() {
                        report.detail(format!(
                            "ignored={} (not used by {} records)",
                            ignored.join(","),
                            current.kind
                        ));
                    }
                    if let Some(record) = store.get(id) {
                        report.set_output(show_text(&record));
                        report.set_data(&record)?;
                    }
                }
                Ok(false) => missing(&mut report, catalog, id),
                Err(err) => report.issue(format!(
                    "{}: {}",
                    err.code().as_str(),
                    storage_error_message(catalog, &err)
                )),
            }
        }
        HistoryAction::Delete { id } => match store.delete(id) {
            Ok(true) => report.set_output(format!("deleted {id}")),
            Ok(false) => missing(&mut report, catalog, id),
            Err(err) => report.issue(format!(
                "{}: {}",
                err.code().as_str(),
                storage_error_message(catalog, &err)
            )),
        },
        HistoryAction::Clear => match store.clear() {
            Ok(()) => report.set_output(render(catalog, MessageKey::HistoryCleared, &[])),
            Err(err) => report.issue(format!(
                "{}: {}",
                err.code().as_str(),
                storage_error_message(catalog, &err)
            )),
        },
        HistoryAction::Count => {
            let count = store.count();
            report.set_output(count.to_string());
            report.detail(format!("max_items={}", store.max_items()));
            report.set_data(&count)?;
        }
    }

    Ok(report)
}
