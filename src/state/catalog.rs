use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::media::{identity_key, is_supported, is_video, Thumbnail, ThumbnailError};
use crate::metadata::date::to_display;
use crate::metadata::{DateBatch, DateResolution};
use crate::tasks::{Generation, Job};

/// Label shown while the date lookup is in flight
pub const LOADING_LABEL: &str = "Loading...";

/// Label shown when no candidate date tag was found
pub const NOT_FOUND_LABEL: &str = "-";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{} is not a folder", .0.display())]
    NotAFolder(PathBuf),

    #[error("failed to list {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Where an entry's preview stands
#[derive(Debug, Clone)]
pub enum ThumbnailState {
    /// Placeholder until the worker reports back
    Pending,
    Ready(Thumbnail),
    /// Decode failed; the placeholder stays
    Failed(ThumbnailError),
}

/// Where an entry's date stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateLabel {
    Loading,
    /// `value` is kept exactly as ExifTool printed it
    Resolved { value: String, tag: &'static str },
    NotFound,
}

impl DateLabel {
    fn from_resolution(resolution: &DateResolution) -> Self {
        match resolution {
            DateResolution::Found { value, tag } => DateLabel::Resolved {
                value: value.clone(),
                tag: *tag,
            },
            DateResolution::NotFound => DateLabel::NotFound,
        }
    }
}

impl fmt::Display for DateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateLabel::Loading => f.write_str(LOADING_LABEL),
            DateLabel::Resolved { value, .. } => f.write_str(&to_display(value)),
            DateLabel::NotFound => f.write_str(NOT_FOUND_LABEL),
        }
    }
}

/// One file of the loaded folder
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Full path as listed; the entry's identity
    pub path: PathBuf,
    /// File name only (e.g. "IMG_0001.JPG")
    pub name: String,
    pub thumbnail: ThumbnailState,
    pub date: DateLabel,
}

impl CatalogEntry {
    fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            path,
            name,
            thumbnail: ThumbnailState::Pending,
            date: DateLabel::Loading,
        }
    }
}

/// How far the background results for a populated folder have come
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing reported yet
    Pending,
    /// Some thumbnails or dates are in
    Partial,
    /// Every thumbnail reported (ready or failed) and every date resolved
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Enumerating,
    Populated(Progress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Enumerating,
    Populated,
}

/// Counts from reconciling one date batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatesSummary {
    pub resolved: usize,
    pub missing: usize,
}

/// The in-memory entries of the currently open folder.
///
/// Only the session mutates it, one background result at a time. Every
/// result is checked against the current generation and the current set of
/// paths, so anything from a superseded load is dropped.
#[derive(Debug)]
pub struct Catalog {
    generation: Generation,
    phase: Phase,
    folder: Option<PathBuf>,
    entries: Vec<CatalogEntry>,
    /// identity key → positions in `entries`; case twins share a key
    index: HashMap<String, Vec<usize>>,
    thumbnail_size: u32,
}

impl Catalog {
    pub fn new(thumbnail_size: u32) -> Self {
        Self {
            generation: Generation::default(),
            phase: Phase::Idle,
            folder: None,
            entries: Vec::new(),
            index: HashMap::new(),
            thumbnail_size,
        }
    }

    /// Replace the catalog with the supported files of `folder`.
    ///
    /// Returns the jobs to run: one thumbnail per entry, then one date
    /// batch covering all of them. An empty folder yields no jobs.
    pub fn load_folder(&mut self, folder: &Path) -> Result<Vec<Job>, CatalogError> {
        self.clear();
        self.phase = Phase::Enumerating;

        let files = match list_supported(folder) {
            Ok(files) => files,
            Err(e) => {
                self.phase = Phase::Idle;
                return Err(e);
            }
        };

        for path in files {
            let positions = self.index.entry(identity_key(&path)).or_default();
            if let Some(&first) = positions.first() {
                debug!(
                    "{} differs from {} only by case",
                    path.display(),
                    self.entries[first].path.display()
                );
            }
            positions.push(self.entries.len());
            self.entries.push(CatalogEntry::new(path));
        }

        self.folder = Some(folder.to_path_buf());
        self.phase = Phase::Populated;
        info!("📁 Loaded {} files from {}", self.entries.len(), folder.display());

        let mut jobs: Vec<Job> = self
            .entries
            .iter()
            .map(|entry| Job::Thumbnail {
                path: entry.path.clone(),
                size: self.thumbnail_size,
            })
            .collect();

        if !self.entries.is_empty() {
            jobs.push(Job::Dates {
                paths: self.entries.iter().map(|entry| entry.path.clone()).collect(),
            });
        }

        Ok(jobs)
    }

    /// Drop every entry; results still in flight become stale
    pub fn clear(&mut self) {
        self.generation = self.generation.next();
        self.phase = Phase::Idle;
        self.folder = None;
        self.entries.clear();
        self.index.clear();
    }

    /// Store a finished thumbnail. The path must match an entry exactly.
    /// Returns false when the result was stale and dropped.
    pub fn apply_thumbnail(
        &mut self,
        generation: Generation,
        path: &Path,
        result: Result<Thumbnail, ThumbnailError>,
    ) -> bool {
        if !self.is_current(generation) {
            debug!("Stale thumbnail dropped: {}", path.display());
            return false;
        }
        let Some(entry) = self.entry_mut(path) else {
            debug!("Thumbnail for unknown file dropped: {}", path.display());
            return false;
        };

        entry.thumbnail = match result {
            Ok(thumbnail) => ThumbnailState::Ready(thumbnail),
            Err(e) => {
                debug!("No thumbnail for {}: {}", entry.name, e);
                ThumbnailState::Failed(e)
            }
        };
        true
    }

    /// Resolve every still-loading entry from a batch.
    ///
    /// Entries the batch has nothing for are marked not found, so none is
    /// left loading. Entries already updated by a later read or a write
    /// keep their newer value. None when the batch was stale.
    pub fn apply_dates(&mut self, generation: Generation, batch: &DateBatch) -> Option<DatesSummary> {
        if !self.is_current(generation) {
            debug!("Stale date batch dropped ({} records)", batch.len());
            return None;
        }

        let mut summary = DatesSummary {
            resolved: 0,
            missing: 0,
        };

        for entry in self.entries.iter_mut() {
            if entry.date != DateLabel::Loading {
                continue;
            }
            entry.date = match batch.lookup(&entry.path) {
                Some(resolution) => DateLabel::from_resolution(resolution),
                None => DateLabel::NotFound,
            };
            match entry.date {
                DateLabel::Resolved { .. } => summary.resolved += 1,
                _ => summary.missing += 1,
            }
        }

        info!(
            "🗓️  Dates reconciled: {} found, {} missing",
            summary.resolved, summary.missing
        );
        Some(summary)
    }

    /// Replace one entry's date with a freshly read resolution
    pub fn refresh_date(
        &mut self,
        generation: Generation,
        path: &Path,
        resolution: &DateResolution,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        match self.entry_mut(path) {
            Some(entry) => {
                entry.date = DateLabel::from_resolution(resolution);
                true
            }
            None => false,
        }
    }

    /// Show a date that was just written to the file
    pub fn record_written(&mut self, generation: Generation, path: &Path, value: &str) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        let tag = written_tag(path);
        match self.entry_mut(path) {
            Some(entry) => {
                entry.date = DateLabel::Resolved {
                    value: value.to_string(),
                    tag,
                };
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> LoadState {
        match self.phase {
            Phase::Idle => LoadState::Idle,
            Phase::Enumerating => LoadState::Enumerating,
            Phase::Populated => {
                let total = self.entries.len();
                let thumbnails = self
                    .entries
                    .iter()
                    .filter(|e| !matches!(e.thumbnail, ThumbnailState::Pending))
                    .count();
                let dates = self
                    .entries
                    .iter()
                    .filter(|e| e.date != DateLabel::Loading)
                    .count();

                let progress = if thumbnails == total && dates == total {
                    Progress::Complete
                } else if thumbnails == 0 && dates == 0 {
                    Progress::Pending
                } else {
                    Progress::Partial
                };
                LoadState::Populated(progress)
            }
        }
    }

    /// All background work for the current folder has reported back
    pub fn is_settled(&self) -> bool {
        self.state() == LoadState::Populated(Progress::Complete)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entry whose path equals `path` exactly
    pub fn entry(&self, path: &Path) -> Option<&CatalogEntry> {
        self.position(path).map(|position| &self.entries[position])
    }

    fn entry_mut(&mut self, path: &Path) -> Option<&mut CatalogEntry> {
        self.position(path).map(|position| &mut self.entries[position])
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.index
            .get(&identity_key(path))?
            .iter()
            .copied()
            .find(|&position| self.entries[position].path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The candidate tag a successful write is read back from
fn written_tag(path: &Path) -> &'static str {
    if is_video(path) {
        "QuickTime:CreateDate"
    } else {
        "EXIF:DateTimeOriginal"
    }
}

/// Supported files directly inside `folder`, in directory listing order
fn list_supported(folder: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !folder.is_dir() {
        return Err(CatalogError::NotAFolder(folder.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(CatalogError::ReadDir {
                    path: folder.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => {
                warn!("⚠️  Skipping unreadable entry in {}: {}", folder.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRecord;
    use std::collections::BTreeMap;
    use std::fs;

    fn folder_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn batch(entries: &[(PathBuf, Option<&str>)]) -> DateBatch {
        let records: Vec<MetadataRecord> = entries
            .iter()
            .map(|(path, date)| {
                let mut tags = BTreeMap::new();
                if let Some(date) = date {
                    tags.insert("EXIF:DateTimeOriginal".to_string(), date.to_string());
                }
                MetadataRecord {
                    source: path.clone(),
                    tags,
                }
            })
            .collect();
        DateBatch::from_records(&records)
    }

    fn thumb() -> Thumbnail {
        Thumbnail::from_rgba(image::RgbaImage::new(2, 2))
    }

    fn upper(path: &Path) -> PathBuf {
        PathBuf::from(path.to_string_lossy().to_uppercase())
    }

    #[test]
    fn test_load_lists_supported_files_only() {
        let dir = folder_with(&["a.jpg", "b.JPEG", "c.png", "d.mp4", "e.MOV", "f.txt", "g.avi"]);
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        fs::write(dir.path().join("nested.jpg").join("inner.jpg"), b"").unwrap();

        let mut catalog = Catalog::new(200);
        let jobs = catalog.load_folder(dir.path()).unwrap();

        let mut names: Vec<_> = catalog.entries().iter().map(|e| e.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["a.jpg", "b.JPEG", "c.png", "d.mp4", "e.MOV"]);

        // One thumbnail per entry plus a single date batch, last
        assert_eq!(jobs.len(), 6);
        assert!(matches!(jobs.last(), Some(Job::Dates { paths }) if paths.len() == 5));
        assert!(jobs[..5]
            .iter()
            .all(|job| matches!(job, Job::Thumbnail { size: 200, .. })));

        assert!(catalog
            .entries()
            .iter()
            .all(|e| e.date == DateLabel::Loading && matches!(e.thumbnail, ThumbnailState::Pending)));
        assert_eq!(catalog.state(), LoadState::Populated(Progress::Pending));
    }

    #[test]
    fn test_empty_folder_spawns_nothing() {
        let dir = folder_with(&["readme.txt"]);
        let mut catalog = Catalog::new(200);
        let jobs = catalog.load_folder(dir.path()).unwrap();

        assert!(jobs.is_empty());
        assert!(catalog.is_empty());
        assert!(catalog.is_settled());
    }

    #[test]
    fn test_missing_folder_leaves_catalog_empty() {
        let dir = folder_with(&["a.jpg"]);
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();

        let err = catalog.load_folder(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, CatalogError::NotAFolder(_)));
        assert!(catalog.is_empty());
        assert_eq!(catalog.state(), LoadState::Idle);
        assert_eq!(catalog.folder(), None);
    }

    #[test]
    fn test_thumbnail_requires_exact_path() {
        let dir = folder_with(&["img_1.jpg"]);
        let path = dir.path().join("img_1.jpg");
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        assert!(!catalog.apply_thumbnail(generation, &upper(&path), Ok(thumb())));
        assert!(matches!(catalog.entry(&path).unwrap().thumbnail, ThumbnailState::Pending));

        assert!(catalog.apply_thumbnail(generation, &path, Ok(thumb())));
        assert!(matches!(catalog.entry(&path).unwrap().thumbnail, ThumbnailState::Ready(_)));
        assert_eq!(catalog.state(), LoadState::Populated(Progress::Partial));
    }

    #[test]
    fn test_batch_reconciles_differently_cased_paths() {
        let dir = folder_with(&["img_1.jpg", "img_2.jpg"]);
        let one = dir.path().join("img_1.jpg");
        let two = dir.path().join("img_2.jpg");
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        let summary = catalog
            .apply_dates(generation, &batch(&[(upper(&one), Some("2023:05:10 14:30:00"))]))
            .unwrap();
        assert_eq!(summary, DatesSummary { resolved: 1, missing: 1 });

        let first = catalog.entry(&one).unwrap();
        assert_eq!(first.date.to_string(), "2023-05-10 14:30:00");
        assert_eq!(
            first.date,
            DateLabel::Resolved {
                value: "2023:05:10 14:30:00".into(),
                tag: "EXIF:DateTimeOriginal"
            }
        );
        assert_eq!(catalog.entry(&two).unwrap().date.to_string(), NOT_FOUND_LABEL);
    }

    #[test]
    fn test_batch_falls_back_to_file_name() {
        let dir = folder_with(&["IMG_7.jpg"]);
        let path = dir.path().join("IMG_7.jpg");
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();

        let reported = PathBuf::from("/resolved/elsewhere/img_7.JPG");
        catalog
            .apply_dates(catalog.generation(), &batch(&[(reported, Some("2019:09:09 09:09:09"))]))
            .unwrap();
        assert_eq!(catalog.entry(&path).unwrap().date.to_string(), "2019-09-09 09:09:09");
    }

    #[test]
    fn test_settled_catalog_never_shows_loading() {
        let dir = folder_with(&["a.jpg", "b.png", "c.mov"]);
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        let paths: Vec<PathBuf> = catalog.entries().iter().map(|e| e.path.clone()).collect();
        catalog.apply_thumbnail(generation, &paths[0], Ok(thumb()));
        catalog.apply_thumbnail(
            generation,
            &paths[1],
            Err(ThumbnailError::NoFrame(paths[1].clone())),
        );
        catalog.apply_thumbnail(generation, &paths[2], Ok(thumb()));
        assert_eq!(catalog.state(), LoadState::Populated(Progress::Partial));

        // The tool failed entirely: an empty batch
        catalog.apply_dates(generation, &DateBatch::default()).unwrap();

        assert!(catalog.is_settled());
        assert!(catalog
            .entries()
            .iter()
            .all(|e| e.date.to_string() != LOADING_LABEL));
    }

    #[test]
    fn test_results_from_superseded_load_are_ignored() {
        let first = folder_with(&["IMG_1.jpg"]);
        let second = folder_with(&["IMG_1.jpg"]);
        let mut catalog = Catalog::new(200);

        catalog.load_folder(first.path()).unwrap();
        let old_generation = catalog.generation();
        let old_path = first.path().join("IMG_1.jpg");

        catalog.load_folder(second.path()).unwrap();
        let new_path = second.path().join("IMG_1.jpg");
        assert_ne!(catalog.generation(), old_generation);

        // Same file name, older generation: the name fallback must not fire
        let old_batch = batch(&[(old_path.clone(), Some("2001:01:01 00:00:00"))]);
        assert!(catalog.apply_dates(old_generation, &old_batch).is_none());
        assert!(!catalog.apply_thumbnail(old_generation, &old_path, Ok(thumb())));
        // Current generation but a path that is not in this catalog
        assert!(!catalog.apply_thumbnail(catalog.generation(), &old_path, Ok(thumb())));

        let entry = catalog.entry(&new_path).unwrap();
        assert_eq!(entry.date, DateLabel::Loading);
        assert!(matches!(entry.thumbnail, ThumbnailState::Pending));
    }

    #[test]
    fn test_written_date_survives_late_batch() {
        let dir = folder_with(&["a.jpg", "clip.mp4"]);
        let photo = dir.path().join("a.jpg");
        let clip = dir.path().join("clip.mp4");
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        assert!(catalog.record_written(generation, &photo, "2024:12:24 18:00:00"));
        assert!(catalog.record_written(generation, &clip, "2024:12:25 08:00:00"));
        catalog
            .apply_dates(generation, &batch(&[(photo.clone(), Some("1999:01:01 00:00:00"))]))
            .unwrap();

        assert_eq!(
            catalog.entry(&photo).unwrap().date,
            DateLabel::Resolved {
                value: "2024:12:24 18:00:00".into(),
                tag: "EXIF:DateTimeOriginal"
            }
        );
        assert!(matches!(
            catalog.entry(&clip).unwrap().date,
            DateLabel::Resolved { tag: "QuickTime:CreateDate", .. }
        ));
    }

    #[test]
    fn test_refresh_replaces_date() {
        let dir = folder_with(&["a.jpg"]);
        let path = dir.path().join("a.jpg");
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        assert!(catalog.refresh_date(generation, &path, &DateResolution::NotFound));
        assert_eq!(catalog.entry(&path).unwrap().date, DateLabel::NotFound);
        assert!(!catalog.refresh_date(generation.next(), &path, &DateResolution::NotFound));
    }

    #[test]
    fn test_clear_discards_everything() {
        let dir = folder_with(&["a.jpg"]);
        let mut catalog = Catalog::new(200);
        catalog.load_folder(dir.path()).unwrap();
        let generation = catalog.generation();

        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.state(), LoadState::Idle);
        assert!(!catalog.is_current(generation));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_case_twins_are_both_listed() {
        let dir = folder_with(&["IMG.jpg", "img.JPG"]);
        let mut catalog = Catalog::new(200);
        let jobs = catalog.load_folder(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let thumbnails: Vec<&PathBuf> = jobs
            .iter()
            .filter_map(|job| match job {
                Job::Thumbnail { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(thumbnails.len(), 2);
        assert_ne!(thumbnails[0], thumbnails[1]);

        // Each result lands on its own entry
        let generation = catalog.generation();
        let upper = dir.path().join("IMG.jpg");
        let lower = dir.path().join("img.JPG");
        assert!(catalog.apply_thumbnail(generation, &upper, Ok(thumb())));
        assert!(matches!(catalog.entry(&upper).unwrap().thumbnail, ThumbnailState::Ready(_)));
        assert!(matches!(catalog.entry(&lower).unwrap().thumbnail, ThumbnailState::Pending));

        // One record answers for both spellings
        let summary = catalog
            .apply_dates(generation, &batch(&[(upper.clone(), Some("2021:01:02 03:04:05"))]))
            .unwrap();
        assert_eq!(summary.resolved, 2);
        assert_eq!(catalog.entry(&lower).unwrap().date, catalog.entry(&upper).unwrap().date);

        assert!(catalog.record_written(generation, &lower, "2022:02:02 02:02:02"));
        assert_ne!(catalog.entry(&lower).unwrap().date, catalog.entry(&upper).unwrap().date);
    }
}
