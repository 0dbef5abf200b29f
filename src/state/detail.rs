use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::date::{extract_date, parse_date_time, to_native, DISPLAY_FORMAT};
use crate::metadata::{DateResolution, MetadataRecord};

/// Fields shown in the detail panel: (short tag, label)
pub const DETAIL_FIELDS: [(&str, &str); 12] = [
    ("Make", "Camera Make"),
    ("Model", "Camera Model"),
    ("LensID", "Lens"),
    ("LensModel", "Lens Model"),
    ("ISO", "ISO"),
    ("FNumber", "Aperture"),
    ("ExposureTime", "Shutter Speed"),
    ("FocalLength", "Focal Length"),
    ("ImageWidth", "Width"),
    ("ImageHeight", "Height"),
    ("GPSPosition", "GPS"),
    ("MIMEType", "Type"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetailError {
    #[error("no file is selected")]
    NothingSelected,

    #[error("metadata is still loading")]
    NotReady,

    #[error("a save is already in progress")]
    Busy,

    #[error("{0:?} is not a valid date, use YYYY-MM-DD HH:MM:SS")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailStatus {
    Loading,
    /// Tags were read
    Loaded,
    /// ExifTool returned nothing; the date can still be set
    Unavailable,
}

/// Metadata and date editor for the selected file
#[derive(Debug, Clone)]
pub struct DetailView {
    path: PathBuf,
    name: String,
    status: DetailStatus,
    /// (label, value) rows, filename first
    fields: Vec<(&'static str, String)>,
    resolution: DateResolution,
    /// Date being edited, in display form
    editor: String,
    saving: bool,
}

impl DetailView {
    /// Placeholder shown while the single metadata read is in flight
    pub fn loading(path: &Path) -> Self {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            fields: vec![("Filename", name.clone())],
            path: path.to_path_buf(),
            name,
            status: DetailStatus::Loading,
            resolution: DateResolution::NotFound,
            editor: String::new(),
            saving: false,
        }
    }

    /// Fill the panel from a metadata read. `now` is used for the editor
    /// when the file carries no usable date.
    pub fn populate(&mut self, record: Option<&MetadataRecord>, now: NaiveDateTime) {
        self.fields = vec![("Filename", self.name.clone())];

        let Some(record) = record else {
            self.status = DetailStatus::Unavailable;
            self.resolution = DateResolution::NotFound;
            self.editor = now.format(DISPLAY_FORMAT).to_string();
            return;
        };

        for (short, label) in DETAIL_FIELDS {
            if let Some(value) = record.find(short).filter(|v| !v.is_empty()) {
                self.fields.push((label, value.to_string()));
            }
        }

        self.resolution = extract_date(record);
        let date_time = self
            .resolution
            .value()
            .and_then(parse_date_time)
            .unwrap_or(now);
        self.editor = date_time.format(DISPLAY_FORMAT).to_string();
        self.status = DetailStatus::Loaded;
    }

    /// Keep the user's text as typed; it is validated on save
    pub fn edit(&mut self, text: String) {
        self.editor = text;
    }

    /// Validate the edited date and mark a save as started.
    /// Returns the value to write, in ExifTool's native form.
    pub fn begin_save(&mut self) -> Result<String, DetailError> {
        if self.status == DetailStatus::Loading {
            return Err(DetailError::NotReady);
        }
        if self.saving {
            return Err(DetailError::Busy);
        }
        let parsed = parse_date_time(&self.editor)
            .ok_or_else(|| DetailError::InvalidDate(self.editor.clone()))?;

        self.saving = true;
        Ok(to_native(&parsed))
    }

    pub fn finish_save(&mut self) {
        self.saving = false;
    }

    /// "Source: EXIF:DateTimeOriginal" or "Source: Not Found"
    pub fn source_label(&self) -> String {
        match self.status {
            DetailStatus::Loading => "Source: -".to_string(),
            _ => format!("Source: {}", self.resolution.tag().unwrap_or("Not Found")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> DetailStatus {
        self.status
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Editing and saving are possible once the read has come back
    pub fn can_save(&self) -> bool {
        self.status != DetailStatus::Loading && !self.saving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn record(tags: &[(&str, &str)]) -> MetadataRecord {
        MetadataRecord {
            source: PathBuf::from("/data/IMG_1.JPG"),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_populate_shows_allow_listed_fields_in_order() {
        let mut view = DetailView::loading(Path::new("/data/IMG_1.JPG"));
        view.populate(
            Some(&record(&[
                ("EXIF:Model", "X100V"),
                ("EXIF:Make", "FUJIFILM"),
                ("EXIF:ISO", "160"),
                ("EXIF:Software", "ignored"),
                ("File:MIMEType", "image/jpeg"),
                ("EXIF:LensModel", ""),
            ])),
            now(),
        );

        let labels: Vec<_> = view.fields().iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, ["Filename", "Camera Make", "Camera Model", "ISO", "Type"]);
        assert_eq!(view.fields()[0].1, "IMG_1.JPG");
        assert_eq!(view.status(), DetailStatus::Loaded);
    }

    #[test]
    fn test_resolved_date_fills_editor() {
        let mut view = DetailView::loading(Path::new("/data/a.jpg"));
        view.populate(
            Some(&record(&[
                ("EXIF:DateTimeOriginal", "2023:05:10 14:30:00"),
                ("File:FileModifyDate", "2024:01:01 00:00:00+01:00"),
            ])),
            now(),
        );
        assert_eq!(view.editor(), "2023-05-10 14:30:00");
        assert_eq!(view.source_label(), "Source: EXIF:DateTimeOriginal");
    }

    #[test]
    fn test_missing_date_defaults_to_now() {
        let mut view = DetailView::loading(Path::new("/data/a.jpg"));
        view.populate(Some(&record(&[("EXIF:Model", "X")])), now());
        assert_eq!(view.editor(), "2026-01-02 03:04:05");
        assert_eq!(view.source_label(), "Source: Not Found");

        let mut unreadable = DetailView::loading(Path::new("/data/b.jpg"));
        unreadable.populate(None, now());
        assert_eq!(unreadable.status(), DetailStatus::Unavailable);
        assert_eq!(unreadable.editor(), "2026-01-02 03:04:05");
        assert!(unreadable.can_save());
    }

    #[test]
    fn test_unparseable_tool_date_defaults_to_now() {
        let mut view = DetailView::loading(Path::new("/data/a.mov"));
        view.populate(Some(&record(&[("QuickTime:CreateDate", "0000:00:00 00:00:00")])), now());
        assert_eq!(view.editor(), "2026-01-02 03:04:05");
        assert_eq!(view.source_label(), "Source: QuickTime:CreateDate");
    }

    #[test]
    fn test_save_converts_display_to_native() {
        let mut view = DetailView::loading(Path::new("/data/a.jpg"));
        assert_eq!(view.begin_save(), Err(DetailError::NotReady));

        view.populate(Some(&record(&[("EXIF:DateTimeOriginal", "2023:05:10 14:30:00")])), now());
        assert_eq!(view.begin_save().unwrap(), "2023:05:10 14:30:00");
        assert!(view.is_saving());
        assert_eq!(view.begin_save(), Err(DetailError::Busy));

        view.finish_save();
        view.edit("2024-12-24 18:00:00".into());
        assert_eq!(view.begin_save().unwrap(), "2024:12:24 18:00:00");
    }

    #[test]
    fn test_save_rejects_invalid_text() {
        let mut view = DetailView::loading(Path::new("/data/a.jpg"));
        view.populate(None, now());
        view.edit("2024-13-40 99:00:00".into());
        assert!(matches!(view.begin_save(), Err(DetailError::InvalidDate(_))));
        assert!(!view.is_saving());
    }
}
