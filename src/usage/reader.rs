//! JSONL file reading and parsing

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use glob::glob;
use log::{debug, warn};

use crate::usage::models::{SessionEvent, UsageRecord};

/// Model name Claude Code writes for synthetic, non-billable turns
const SYNTHETIC_MODEL: &str = "<synthetic>";

/// Error type for reader operations
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scan every JSONL file under the projects directory and return the
/// deduplicated, timestamp-ordered record sequence.
///
/// A missing or unreadable directory means "no usage yet", not an error.
/// Duplicate request ids keep the first occurrence in file-enumeration
/// order; that order is not defined across files, and a duplicate id with
/// differing content is resolved by whichever file is visited first.
pub fn scan_usage_records(projects_dir: &Path) -> Vec<UsageRecord> {
    if !projects_dir.is_dir() {
        debug!(
            "projects directory {:?} not found, treating as empty",
            projects_dir
        );
        return Vec::new();
    }

    let pattern = projects_dir.join("**").join("*.jsonl");
    let paths = match glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("invalid scan pattern {:?}: {}", pattern, e);
            return Vec::new();
        }
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut records: Vec<UsageRecord> = Vec::new();

    for path in paths.filter_map(Result::ok) {
        if let Err(e) = read_jsonl_file(&path, &mut seen, &mut records) {
            warn!("failed to read session file {:?}: {}", path, e);
        }
    }

    records.sort_by_key(|r| r.timestamp);
    records
}

/// Append usage records from one JSONL file, skipping lines that do not
/// parse and request ids already seen
fn read_jsonl_file(
    path: &Path,
    seen: &mut HashSet<String>,
    records: &mut Vec<UsageRecord>,
) -> Result<(), ReaderError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                debug!("failed to read line {} in {:?}: {}", line_num, path, e);
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: SessionEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                debug!(
                    "failed to parse JSON at line {} in {:?}: {}",
                    line_num, path, e
                );
                continue;
            }
        };

        if let Some(record) = process_event(event) {
            if seen.insert(record.request_id.clone()) {
                records.push(record);
            }
        }
    }

    Ok(())
}

/// Turn one event into a usage record, or `None` when it is not a billable
/// assistant turn or lacks a required field
fn process_event(event: SessionEvent) -> Option<UsageRecord> {
    if event.event_type.as_deref() != Some("assistant") {
        return None;
    }

    let request_id = event.request_id?;
    let timestamp = parse_timestamp(event.timestamp.as_deref()?)?;
    let message = event.message?;
    let model = message.model?;
    if model == SYNTHETIC_MODEL {
        return None;
    }
    let usage = message.usage?;

    Some(UsageRecord {
        timestamp,
        model,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        cache_creation_tokens: usage.cache_creation_tokens,
        cache_read_tokens: usage.cache_read_tokens,
        request_id,
    })
}

/// Parse an ISO-8601 timestamp; fractional seconds are optional
fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
