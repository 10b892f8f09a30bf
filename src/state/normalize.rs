//! Shape checking and normalization of timer records read from the store
//!
//! Everything read from the shared blob is untrusted: it may be missing, written
//! by an older plugin version, or simply malformed. Nothing in here fails; bad
//! records are rejected individually and the caller always gets a usable list.

use std::collections::HashSet;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::timer::{Timer, DEFAULT_DURATION_MS, MAX_DURATION_MS, MAX_TIMESTAMP_MS, UNKNOWN_OWNER};

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    DurationNotNumeric,
    DurationNotPositive,
    DurationOutOfRange,
    OutOfRange { field: &'static str },
    WrongType { field: &'static str },
}

/// A record that passed the shape check; `id` is absent until backfilled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub id: Option<String>,
    pub timer: Timer,
}

/// Outcome of checking one external record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    Parsed(ParsedRecord),
    Rejected(Rejection),
}

impl Validated {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Validated::Parsed(_))
    }
}

/// Check a single record's shape
pub fn validate_record(value: &Value) -> Validated {
    let Some(object) = value.as_object() else {
        return Validated::Rejected(Rejection::NotAnObject);
    };

    match parse_object(object) {
        Ok(record) => Validated::Parsed(record),
        Err(rejection) => Validated::Rejected(rejection),
    }
}

fn parse_object(object: &Map<String, Value>) -> Result<ParsedRecord, Rejection> {
    let duration_ms = match present(object, "durationMs") {
        None => DEFAULT_DURATION_MS,
        Some(value) => number_ms(value).ok_or(Rejection::DurationNotNumeric)?,
    };
    if duration_ms <= 0 {
        return Err(Rejection::DurationNotPositive);
    }
    if duration_ms > MAX_DURATION_MS {
        return Err(Rejection::DurationOutOfRange);
    }

    let id = opt_string(object, "id")?.filter(|id| !id.is_empty());

    let timer = Timer {
        id: String::new(),
        name: opt_string(object, "name")?,
        duration_ms,
        start_at: opt_ms(object, "startAt")?,
        paused_at: opt_ms(object, "pausedAt")?,
        offset_ms: opt_ms(object, "offsetMs")?.unwrap_or(0).max(0),
        owner_id: opt_string(object, "ownerId")?,
        owner_name: opt_string(object, "ownerName")?,
        external_link_id: opt_string(object, "externalLinkId")?,
    };

    Ok(ParsedRecord { id, timer })
}

/// A field counts as present unless missing or `null`
fn present<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|value| !value.is_null())
}

/// JSON numbers may be floats when written by a JavaScript host
pub(crate) fn number_ms(value: &Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return Some(ms);
    }
    value
        .as_f64()
        .filter(|ms| ms.is_finite())
        .map(|ms| ms.trunc() as i64)
}

fn opt_ms(object: &Map<String, Value>, field: &'static str) -> Result<Option<i64>, Rejection> {
    match present(object, field) {
        None => Ok(None),
        Some(value) => {
            let ms = number_ms(value).ok_or(Rejection::WrongType { field })?;
            if !(-MAX_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&ms) {
                return Err(Rejection::OutOfRange { field });
            }
            Ok(Some(ms))
        }
    }
}

fn opt_string(object: &Map<String, Value>, field: &'static str) -> Result<Option<String>, Rejection> {
    match present(object, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Rejection::WrongType { field }),
    }
}

/// Normalize the room-wide list. An empty room is a legitimate empty list.
///
/// Accepts either an array of records or a single legacy record.
pub fn normalize_list(value: Option<&Value>) -> Vec<Timer> {
    let records: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(object @ Value::Object(_)) => vec![object],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            debug!("Ignoring stored timers of unexpected shape: {}", other);
            Vec::new()
        }
    };

    let parsed: Vec<ParsedRecord> = records
        .into_iter()
        .filter_map(|record| match validate_record(record) {
            Validated::Parsed(parsed) => Some(parsed),
            Validated::Rejected(rejection) => {
                debug!("Rejected stored timer record ({:?}): {}", rejection, record);
                None
            }
        })
        .collect();

    assign_ids(parsed)
}

/// Normalize a single-slot value; never empty, falls back to a default timer
pub fn normalize_slot(value: Option<&Value>) -> Timer {
    normalize_list(value)
        .into_iter()
        .next()
        .unwrap_or_else(default_timer)
}

/// Idle one-hour timer used when a slot holds nothing usable
pub fn default_timer() -> Timer {
    let mut timer = Timer {
        id: String::new(),
        name: None,
        duration_ms: DEFAULT_DURATION_MS,
        start_at: None,
        paused_at: None,
        offset_ms: 0,
        owner_id: None,
        owner_name: None,
        external_link_id: None,
    };
    timer.id = backfill_id(&timer, 0, 0);
    timer
}

/// Make sure every owner label is non-empty
pub fn fill_owner_labels(timers: &mut [Timer]) {
    for timer in timers.iter_mut() {
        if timer.owner_name.as_deref().map_or(true, str::is_empty) {
            timer.owner_name = Some(UNKNOWN_OWNER.to_string());
        }
    }
}

/// Keep existing ids (first occurrence wins), backfill the rest
fn assign_ids(records: Vec<ParsedRecord>) -> Vec<Timer> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(records.len());
    for record in &records {
        let keeps_id = match &record.id {
            Some(id) => taken.insert(id.clone()),
            None => false,
        };
        keep.push(keeps_id);
    }

    records
        .into_iter()
        .zip(keep)
        .enumerate()
        .map(|(index, (record, keeps_id))| {
            let mut timer = record.timer;
            timer.id = match record.id {
                Some(id) if keeps_id => id,
                _ => {
                    let mut attempt = 0;
                    loop {
                        let candidate = backfill_id(&timer, index, attempt);
                        if taken.insert(candidate.clone()) {
                            break candidate;
                        }
                        attempt += 1;
                    }
                }
            };
            timer
        })
        .collect()
}

/// Stable id derived from record content and position
fn backfill_id(timer: &Timer, index: usize, attempt: u32) -> String {
    let content = serde_json::to_string(timer).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    hasher.update(attempt.to_le_bytes());
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    format!("bf-{}", hex::encode(&digest[..12]))
}
