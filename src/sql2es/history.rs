use crate::error::StorageError;
use crate::sql2es::pipeline::{ConversionKind, ConversionResult};
use crate::sql2es::response::format_json;
use crate::sql2es::store::{FileBackend, HistoryBackend};
use crate::sql2es::util::now_epoch_millis;
use crate::sql2es::warn;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Reverse;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

const RECORD_ID_HEX_CHARS: usize = 20;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub timestamp: u64,
    pub sql_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub es_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl_command: Option<String>,
    #[serde(rename = "type")]
    pub kind: ConversionKind,
}

impl HistoryRecord {
    /// The converted output as it was handed to the user.
    pub fn result_text(&self) -> String {
        match self.kind {
            ConversionKind::Dsl => {
                let api_path = self.api_path.as_deref().unwrap_or_default();
                match self.es_query.as_deref() {
                    Some(body) if !body.is_empty() => format!("{api_path}\n{body}"),
                    _ => api_path.to_string(),
                }
            }
            ConversionKind::Curl => self.curl_command.clone().unwrap_or_default(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [
            Some(self.sql_query.as_str()),
            self.es_query.as_deref(),
            self.api_path.as_deref(),
            self.curl_command.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Editable fields of a record. Identity, creation time, source SQL and type
/// have no slot here, so an edit can never touch them; unknown keys in a JSON
/// patch are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPatch {
    pub es_query: Option<String>,
    pub api_path: Option<String>,
    pub curl_command: Option<String>,
}

impl HistoryPatch {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.es_query.is_none() && self.api_path.is_none() && self.curl_command.is_none()
    }

    /// JSON names of the fields this patch sets.
    pub fn field_names(&self) -> Vec<&'static str> {
        [
            (self.es_query.is_some(), "esQuery"),
            (self.api_path.is_some(), "apiPath"),
            (self.curl_command.is_some(), "curlCommand"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    /// Fields this patch sets that a record of `kind` does not carry.
    pub fn ignored_fields(&self, kind: ConversionKind) -> Vec<&'static str> {
        self.field_names()
            .into_iter()
            .filter(|name| match kind {
                ConversionKind::Dsl => *name == "curlCommand",
                ConversionKind::Curl => *name != "curlCommand",
            })
            .collect()
    }

    fn apply(&self, record: &mut HistoryRecord) -> bool {
        let before = record.clone();
        match record.kind {
            ConversionKind::Dsl => {
                if let Some(es_query) = &self.es_query {
                    record.es_query = Some(format_json(es_query.trim()).into_string());
                }
                if let Some(api_path) = &self.api_path {
                    record.api_path = Some(api_path.trim().to_string());
                }
            }
            ConversionKind::Curl => {
                if let Some(curl_command) = &self.curl_command {
                    record.curl_command = Some(curl_command.clone());
                }
            }
        }
        for field in self.ignored_fields(record.kind) {
            debug!("ignoring {field} edit on {} record {}", record.kind, record.id);
        }
        *record != before
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub search: Option<String>,
    pub kind: Option<ConversionKind>,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub records: Vec<HistoryRecord>,
    pub total: usize,
    pub offset: usize,
}

fn generate_id(sql_query: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hasher.update(sql_query.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()
        .chars()
        .take(RECORD_ID_HEX_CHARS)
        .collect()
}

/// Newest first; the stable sort keeps stored order for equal timestamps,
/// and appends are stored in front, so ties list the latest append first.
fn sort_newest_first(records: &mut [HistoryRecord]) {
    records.sort_by_key(|record| Reverse(record.timestamp));
}

/// Capacity-bounded, ordered conversion history over a swappable backend.
pub struct HistoryStore<B: HistoryBackend> {
    backend: B,
    max_items: usize,
    clock: fn() -> anyhow::Result<u64>,
    write_guard: Mutex<()>,
}

impl HistoryStore<FileBackend> {
    pub fn open_file(path: &Path, max_items: usize) -> Self {
        Self::new(FileBackend::new(path), max_items)
    }
}

impl<B: HistoryBackend> HistoryStore<B> {
    pub fn new(backend: B, max_items: usize) -> Self {
        Self {
            backend,
            max_items: max_items.max(1),
            clock: now_epoch_millis,
            write_guard: Mutex::new(()),
        }
    }

    /// Replace the epoch-millisecond clock used to stamp appended records.
    pub fn with_clock(mut self, clock: fn() -> anyhow::Result<u64>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Run one read-modify-write. The closure reports whether it changed the
    /// collection; unchanged collections are not rewritten.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<HistoryRecord>) -> Result<(T, bool), StorageError>,
    ) -> Result<T, StorageError> {
        let _local = self
            .write_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _file = self.backend.lock_exclusive()?;

        let mut records = self.backend.load_for_update()?;
        sort_newest_first(&mut records);
        let (out, changed) = f(&mut records)?;
        if changed {
            self.backend.replace(&records)?;
        }
        Ok(out)
    }

    pub fn append(
        &self,
        sql_query: &str,
        result: &ConversionResult,
    ) -> Result<Option<HistoryRecord>, StorageError> {
        let sql_query = sql_query.trim();
        if sql_query.is_empty() {
            debug!("skipping history append for blank sql");
            return Ok(None);
        }

        let timestamp = (self.clock)().map_err(|err| StorageError::Clock(err.to_string()))?;
        let mut record = HistoryRecord {
            id: generate_id(sql_query),
            timestamp,
            sql_query: sql_query.to_string(),
            es_query: None,
            api_path: None,
            curl_command: None,
            kind: result.kind(),
        };
        match result {
            ConversionResult::Dsl(query) => {
                record.es_query = Some(format_json(&query.query_dsl).into_string());
                record.api_path = Some(query.api_path.clone());
            }
            ConversionResult::Curl { command } => {
                record.curl_command = Some(command.clone());
            }
        }

        let max_items = self.max_items;
        let saved = record.clone();
        self.mutate(move |records| {
            records.insert(0, record);
            sort_newest_first(records);
            if records.len() > max_items {
                let evicted = records.len() - max_items;
                records.truncate(max_items);
                info!("history cap {max_items} reached; evicted {evicted} oldest record(s)");
            }
            Ok(((), true))
        })?;
        debug!("appended history record {} ({})", saved.id, saved.kind);
        Ok(Some(saved))
    }

    /// All records, newest first. An unreadable backend lists as empty.
    pub fn list(&self) -> Vec<HistoryRecord> {
        let mut records = match self.backend.load() {
            Ok(records) => records,
            Err(err) => {
                warn::emit(
                    "W202_HISTORY_UNREADABLE",
                    "history",
                    "list-empty",
                    "history",
                    &err.to_string(),
                );
                Vec::new()
            }
        };
        sort_newest_first(&mut records);
        records
    }

    pub fn query(&self, query: &HistoryQuery) -> HistoryPage {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let matching: Vec<HistoryRecord> = self
            .list()
            .into_iter()
            .filter(|record| query.kind.is_none_or(|kind| record.kind == kind))
            .filter(|record| needle.as_deref().is_none_or(|n| record.matches(n)))
            .collect();
        let total = matching.len();
        let records = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        HistoryPage {
            records,
            total,
            offset: query.offset,
        }
    }

    pub fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.list().into_iter().find(|record| record.id == id)
    }

    /// Merge `patch` into the record with `id`. Returns whether it exists.
    pub fn update(&self, id: &str, patch: &HistoryPatch) -> Result<bool, StorageError> {
        self.mutate(|records| {
            let Some(record) = records.iter_mut().find(|record| record.id == id) else {
                debug!("history update skipped; unknown id {id}");
                return Ok((false, false));
            };
            let changed = patch.apply(record);
            Ok((true, changed))
        })
    }

    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.mutate(|records| {
            let before = records.len();
            records.retain(|record| record.id != id);
            let removed = records.len() != before;
            Ok((removed, removed))
        })
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.mutate(|records| {
            records.clear();
            Ok(((), true))
        })
    }

    pub fn count(&self) -> usize {
        self.list().len()
    }
}
