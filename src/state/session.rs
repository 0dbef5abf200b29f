use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::catalog::{Catalog, CatalogError};
use super::detail::{DetailError, DetailView};
use crate::media::ThumbnailError;
use crate::metadata::date::extract_date;
use crate::metadata::MetadataError;
use crate::tasks::{Job, TaskEvent, TaskRunner};

/// Something the shell may want to tell the user about
#[derive(Debug, Clone)]
pub enum Notice {
    ThumbnailReady(PathBuf),
    ThumbnailFailed { path: PathBuf, error: ThumbnailError },
    DatesReconciled { resolved: usize, missing: usize },
    DetailLoaded(PathBuf),
    DateSaved { path: PathBuf, value: String },
    DateSaveFailed { path: PathBuf, error: MetadataError },
}

/// Owns the catalog and the detail view and is the only place background
/// results are applied. Jobs go out through the runner; their events come
/// back through `handle`, one at a time, in arrival order.
pub struct Session {
    catalog: Catalog,
    detail: Option<DetailView>,
    runner: TaskRunner,
}

impl Session {
    pub fn new(runner: TaskRunner, thumbnail_size: u32) -> Self {
        Self {
            catalog: Catalog::new(thumbnail_size),
            detail: None,
            runner,
        }
    }

    /// Load a folder and start its thumbnail and date jobs.
    /// Returns the number of entries.
    pub fn open_folder(&mut self, folder: &Path) -> Result<usize, CatalogError> {
        self.detail = None;
        let jobs = self.catalog.load_folder(folder)?;

        let generation = self.catalog.generation();
        debug!("Submitting {} jobs for {}", jobs.len(), folder.display());
        for job in jobs {
            self.runner.submit(generation, job);
        }

        Ok(self.catalog.len())
    }

    pub fn clear(&mut self) {
        self.detail = None;
        self.catalog.clear();
    }

    /// Show the detail panel for an entry and start reading its tags.
    /// Returns false if the path is not in the catalog.
    pub fn select(&mut self, path: &Path) -> bool {
        if self.catalog.entry(path).is_none() {
            return false;
        }
        self.detail = Some(DetailView::loading(path));
        self.inspect(path);
        true
    }

    pub fn edit_date(&mut self, text: String) {
        if let Some(detail) = self.detail.as_mut() {
            detail.edit(text);
        }
    }

    /// Validate the edited date and queue the write
    pub fn save_date(&mut self) -> Result<(), DetailError> {
        let detail = self.detail.as_mut().ok_or(DetailError::NothingSelected)?;
        let value = detail.begin_save()?;

        info!("💾 Writing {} to {}", value, detail.path().display());
        self.runner.submit(
            self.catalog.generation(),
            Job::WriteDate {
                path: detail.path().to_path_buf(),
                value,
            },
        );
        Ok(())
    }

    /// Apply one background result
    pub fn handle(&mut self, event: TaskEvent) -> Option<Notice> {
        match event {
            TaskEvent::Thumbnail {
                generation,
                path,
                result,
            } => {
                let failure = result.as_ref().err().cloned();
                if !self.catalog.apply_thumbnail(generation, &path, result) {
                    return None;
                }
                Some(match failure {
                    None => Notice::ThumbnailReady(path),
                    Some(error) => Notice::ThumbnailFailed { path, error },
                })
            }

            TaskEvent::Dates { generation, batch } => self
                .catalog
                .apply_dates(generation, &batch)
                .map(|summary| Notice::DatesReconciled {
                    resolved: summary.resolved,
                    missing: summary.missing,
                }),

            TaskEvent::Inspected {
                generation,
                path,
                record,
            } => {
                if !self.catalog.is_current(generation) {
                    debug!("Stale metadata read dropped: {}", path.display());
                    return None;
                }
                if let Some(record) = &record {
                    self.catalog
                        .refresh_date(generation, &path, &extract_date(record));
                }

                let detail = self.detail.as_mut().filter(|d| d.path() == path)?;
                detail.populate(record.as_ref(), Local::now().naive_local());
                Some(Notice::DetailLoaded(path))
            }

            TaskEvent::DateWritten {
                generation,
                path,
                value,
                result,
            } => {
                let selected = self.detail.as_mut().filter(|d| d.path() == path);
                let is_selected = selected.is_some();
                if let Some(detail) = selected {
                    detail.finish_save();
                }

                match result {
                    Ok(()) => {
                        info!("✅ Date of {} set to {}", path.display(), value);
                        self.catalog.record_written(generation, &path, &value);
                        if is_selected {
                            // Re-read so the panel shows what the tool actually stored
                            self.inspect(&path);
                        }
                        Some(Notice::DateSaved { path, value })
                    }
                    Err(error) => {
                        warn!("❌ Failed to update {}: {}", path.display(), error);
                        Some(Notice::DateSaveFailed { path, error })
                    }
                }
            }
        }
    }

    fn inspect(&self, path: &Path) {
        self.runner.submit(
            self.catalog.generation(),
            Job::Inspect {
                path: path.to_path_buf(),
            },
        );
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }
}
