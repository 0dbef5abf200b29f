use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Namespaces searched, in order, when a short tag name is looked up
pub const NAMESPACE_PRIORITY: [&str; 7] = [
    "EXIF",
    "QuickTime",
    "XMP",
    "IPTC",
    "Composite",
    "MakerNotes",
    "File",
];

/// All tags ExifTool reported for one file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataRecord {
    /// The path ExifTool says these tags came from (`SourceFile`)
    pub source: PathBuf,
    /// Namespaced tag name (e.g. "EXIF:Model") to its printed value
    pub tags: BTreeMap<String, String>,
}

impl MetadataRecord {
    /// Build a record from one object of `exiftool -j -G` output.
    /// Returns None when the object carries no `SourceFile`.
    pub fn from_json(object: Map<String, Value>) -> Option<Self> {
        let mut source = None;
        let mut tags = BTreeMap::new();

        for (key, value) in object {
            if key == "SourceFile" {
                source = value.as_str().map(PathBuf::from);
                continue;
            }
            if let Some(text) = value_to_string(&value) {
                tags.insert(key, text);
            }
        }

        Some(Self {
            source: source?,
            tags,
        })
    }

    /// Exact lookup by full namespaced name
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    /// Look up a short tag name such as "Model".
    ///
    /// An exact key wins, then `<namespace>:<tag>` in `NAMESPACE_PRIORITY`
    /// order, then any other namespace in key order. First match wins.
    pub fn find(&self, short: &str) -> Option<&str> {
        if let Some(value) = self.get(short) {
            return Some(value);
        }

        for namespace in NAMESPACE_PRIORITY {
            if let Some(value) = self.get(&format!("{namespace}:{short}")) {
                return Some(value);
            }
        }

        let suffix = format!(":{short}");
        self.tags
            .iter()
            .find(|(key, _)| key.ends_with(&suffix))
            .map(|(_, value)| value.as_str())
    }
}

/// Render a JSON value the way ExifTool printed it
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MetadataRecord {
        match value {
            Value::Object(map) => MetadataRecord::from_json(map).unwrap(),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_from_json_stringifies_values() {
        let rec = record(json!({
            "SourceFile": "/data/IMG_1.JPG",
            "EXIF:ISO": 200,
            "EXIF:FNumber": 2.8,
            "XMP:Subject": ["beach", "sunset"],
            "EXIF:Artist": null,
        }));
        assert_eq!(rec.source, PathBuf::from("/data/IMG_1.JPG"));
        assert_eq!(rec.get("EXIF:ISO"), Some("200"));
        assert_eq!(rec.get("EXIF:FNumber"), Some("2.8"));
        assert_eq!(rec.get("XMP:Subject"), Some("beach, sunset"));
        assert_eq!(rec.get("EXIF:Artist"), None);
    }

    #[test]
    fn test_missing_source_file_is_rejected() {
        let map = json!({ "EXIF:Model": "X100" });
        let Value::Object(map) = map else { unreachable!() };
        assert!(MetadataRecord::from_json(map).is_none());
    }

    #[test]
    fn test_find_prefers_namespace_order_over_key_order() {
        // "Composite" sorts before "EXIF" but EXIF has priority
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "Composite:ImageSize": "1x1",
            "EXIF:ImageWidth": 4000,
            "Composite:ImageWidth": 10,
            "File:ImageWidth": 20,
        }));
        assert_eq!(rec.find("ImageWidth"), Some("4000"));
    }

    #[test]
    fn test_find_falls_back_to_unknown_namespaces() {
        let rec = record(json!({
            "SourceFile": "a.jpg",
            "Sony:LensID": "FE 35mm",
            "Model": "bare",
        }));
        assert_eq!(rec.find("LensID"), Some("FE 35mm"));
        assert_eq!(rec.find("Model"), Some("bare"));
        assert_eq!(rec.find("GPSPosition"), None);
    }

    #[test]
    fn test_find_does_not_match_partial_names() {
        let rec = record(json!({ "SourceFile": "a.jpg", "EXIF:LensModel": "50mm" }));
        assert_eq!(rec.find("Model"), None);
    }
}
