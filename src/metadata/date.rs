//! "Date taken" resolution and the batched date lookup table.

use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::warn;

use super::record::MetadataRecord;
use crate::media::{basename_key, identity_key};

/// Candidate tags in order of preference. Changing this order changes
/// which date is shown for files that carry more than one of them.
pub const DATE_CANDIDATE_TAGS: [&str; 6] = [
    "EXIF:DateTimeOriginal",
    "QuickTime:CreateDate",
    "QuickTime:MediaCreateDate",
    "XMP:DateCreated",
    "IPTC:DateCreated",
    "File:FileModifyDate",
];

/// ExifTool's native date-time layout, used in both directions
pub const NATIVE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout shown to the user
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The date picked for a file and the tag it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateResolution {
    Found { value: String, tag: &'static str },
    NotFound,
}

impl DateResolution {
    pub fn value(&self) -> Option<&str> {
        match self {
            DateResolution::Found { value, .. } => Some(value),
            DateResolution::NotFound => None,
        }
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            DateResolution::Found { tag, .. } => Some(*tag),
            DateResolution::NotFound => None,
        }
    }
}

/// First candidate tag present in the record wins
pub fn extract_date(record: &MetadataRecord) -> DateResolution {
    DATE_CANDIDATE_TAGS
        .iter()
        .find_map(|&tag| {
            record.get(tag).map(|value| DateResolution::Found {
                value: value.to_string(),
                tag,
            })
        })
        .unwrap_or(DateResolution::NotFound)
}

/// `2023:05:10 14:30:00` → `2023-05-10 14:30:00`.
///
/// Only the first two colons are replaced; anything after the date portion
/// (time, timezone offset) is left as ExifTool printed it.
pub fn to_display(native: &str) -> String {
    native.replacen(':', "-", 2)
}

/// Parse either the native or the display layout.
///
/// Trailing sub-seconds or timezone offsets (`+02:00`, `Z`) are ignored,
/// only the first 19 characters are considered.
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let head = text.get(..19)?;
    NaiveDateTime::parse_from_str(head, NATIVE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(head, DISPLAY_FORMAT))
        .ok()
}

/// Format a date-time for writing back through ExifTool
pub fn to_native(date_time: &NaiveDateTime) -> String {
    date_time.format(NATIVE_FORMAT).to_string()
}

/// Result of one batched date lookup over a single folder.
///
/// Entries are keyed by `identity_key`. A secondary index by lower-cased
/// file name catches files ExifTool reported under another path form
/// (symlink-resolved, relative, differently cased).
#[derive(Debug, Clone, Default)]
pub struct DateBatch {
    by_path: HashMap<String, DateResolution>,
    by_name: HashMap<String, DateResolution>,
}

impl DateBatch {
    /// Build the lookup table from the records of one batch.
    ///
    /// Precondition: the batch covers a single folder. If records span
    /// several parent directories the file-name fallback is disabled,
    /// since two folders can hold files with the same name.
    pub fn from_records(records: &[MetadataRecord]) -> Self {
        let mut by_path = HashMap::with_capacity(records.len());
        for record in records {
            by_path.insert(identity_key(&record.source), extract_date(record));
        }

        let folders: HashSet<String> = records
            .iter()
            .filter_map(|r| r.source.parent())
            .map(identity_key)
            .collect();

        let by_name = if folders.len() > 1 {
            warn!(
                "⚠️  Date batch spans {} folders, file-name matching disabled",
                folders.len()
            );
            HashMap::new()
        } else {
            Self::index_by_name(records)
        };

        Self { by_path, by_name }
    }

    /// File names reported more than once are ambiguous and left out
    fn index_by_name(records: &[MetadataRecord]) -> HashMap<String, DateResolution> {
        let mut by_name = HashMap::with_capacity(records.len());
        let mut ambiguous = HashSet::new();

        for record in records {
            let Some(name) = basename_key(&record.source) else {
                continue;
            };
            if by_name.insert(name.clone(), extract_date(record)).is_some() {
                ambiguous.insert(name);
            }
        }

        for name in ambiguous {
            by_name.remove(&name);
        }
        by_name
    }

    /// Resolve the date for a catalog path.
    ///
    /// 1. exact identity key (absolute, normalized, lower-cased)
    /// 2. lower-cased file name
    ///
    /// None means the tool reported nothing usable for this file.
    pub fn lookup(&self, path: &Path) -> Option<&DateResolution> {
        self.by_path
            .get(&identity_key(path))
            .or_else(|| basename_key(path).and_then(|name| self.by_name.get(&name)))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
