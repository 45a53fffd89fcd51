//! Version identifiers and snapshot file naming.
//!
//! A version id is the UTC timestamp of the write, rendered fixed-width as
//! `yyyyMMddHHmmssSSS`, so lexicographic order equals chronological order.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const VERSION_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const USER_FRIENDLY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static VERSION_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{17}$").expect("version id pattern is a valid regex"));

static VERSION_FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^workspace-(\d{17})\.json$").expect("version file pattern is a valid regex")
});

/// An immutable historical snapshot of a workspace branch.
///
/// `version_id` is `None` for the latest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceVersion {
    pub version_id: Option<String>,
    pub last_modified_date: DateTime<Utc>,
}

impl WorkspaceVersion {
    pub fn new(version_id: impl Into<String>, last_modified_date: DateTime<Utc>) -> Self {
        Self {
            version_id: Some(version_id.into()),
            last_modified_date,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.version_id.is_none()
    }
}

/// Renders a timestamp as a fixed-width version id.
pub fn format_version_id(date: &DateTime<Utc>) -> String {
    date.format(VERSION_FORMAT).to_string()
}

/// Parses a fixed-width version id back into a timestamp.
pub fn parse_version_id(version_id: &str) -> Option<DateTime<Utc>> {
    if !is_version_id(version_id) {
        return None;
    }

    NaiveDateTime::parse_from_str(version_id, VERSION_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Returns true for 17-digit version ids.
pub fn is_version_id(value: &str) -> bool {
    VERSION_ID_PATTERN.is_match(value)
}

/// Snapshot file name for a version id.
pub fn version_filename(version_id: &str) -> String {
    format!("workspace-{}.json", version_id)
}

/// Extracts the version id from a snapshot file name.
pub fn version_id_from_filename(filename: &str) -> Option<&str> {
    VERSION_FILENAME_PATTERN
        .captures(filename)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Renders a 17-digit version as `2026-01-09 16:24:27`; other strings pass through.
pub fn user_friendly_version(version: &str) -> String {
    match parse_version_id(version) {
        Some(date) => date.format(USER_FRIENDLY_FORMAT).to_string(),
        None => version.to_string(),
    }
}
