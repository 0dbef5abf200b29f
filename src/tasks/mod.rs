/// Background work
///
/// Thumbnail decoding and ExifTool calls run here, never on the UI thread.
/// Each finished job is reported as a `TaskEvent` on a channel; the single
/// consumer (the session) applies them in arrival order.
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::media::{self, Thumbnail, ThumbnailError};
use crate::metadata::{DateBatch, ExifTool, MetadataError, MetadataRecord};

/// Identifies one folder load. Results carry the generation they were
/// requested under so late arrivals from an older load can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// A unit of background work
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Decode one file into a preview fitted in `size` x `size`
    Thumbnail { path: PathBuf, size: u32 },
    /// Resolve the date of every file of a folder in one tool call
    Dates { paths: Vec<PathBuf> },
    /// Read all tags of one file for the detail panel
    Inspect { path: PathBuf },
    /// Write a new date taken, `value` in `YYYY:MM:DD HH:MM:SS`
    WriteDate { path: PathBuf, value: String },
}

/// A finished job, tagged with where it belongs
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Thumbnail {
        generation: Generation,
        path: PathBuf,
        result: Result<Thumbnail, ThumbnailError>,
    },
    Dates {
        generation: Generation,
        batch: DateBatch,
    },
    Inspected {
        generation: Generation,
        path: PathBuf,
        record: Option<MetadataRecord>,
    },
    DateWritten {
        generation: Generation,
        path: PathBuf,
        value: String,
        result: Result<(), MetadataError>,
    },
}

impl Job {
    /// Run the job to completion on the calling thread
    pub fn run(self, gateway: &ExifTool, generation: Generation) -> TaskEvent {
        match self {
            Job::Thumbnail { path, size } => {
                let result = media::produce(&path, size);
                TaskEvent::Thumbnail {
                    generation,
                    path,
                    result,
                }
            }
            Job::Dates { paths } => TaskEvent::Dates {
                generation,
                batch: gateway.read_batch(&paths),
            },
            Job::Inspect { path } => {
                let record = gateway.read_one(&path);
                TaskEvent::Inspected {
                    generation,
                    path,
                    record,
                }
            }
            Job::WriteDate { path, value } => {
                let result = gateway.write_date(&path, &value);
                TaskEvent::DateWritten {
                    generation,
                    path,
                    value,
                    result,
                }
            }
        }
    }
}

/// Number of workers matching the host's available concurrency
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Bounded pool that runs jobs and reports `TaskEvent`s.
///
/// Owns its own tokio runtime so jobs can be submitted from any thread,
/// including one that is not inside an async context.
pub struct TaskRunner {
    runtime: Option<Runtime>,
    gateway: Arc<ExifTool>,
    events: mpsc::UnboundedSender<TaskEvent>,
    workers: usize,
}

impl TaskRunner {
    /// Create a runner sized to the host and the receiving end of its events
    pub fn new(gateway: ExifTool) -> io::Result<(Self, mpsc::UnboundedReceiver<TaskEvent>)> {
        Self::with_workers(gateway, default_workers())
    }

    pub fn with_workers(
        gateway: ExifTool,
        workers: usize,
    ) -> io::Result<(Self, mpsc::UnboundedReceiver<TaskEvent>)> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("media-worker")
            .build()?;

        let (events, receiver) = mpsc::unbounded_channel();
        info!("🧵 Background pool with {} workers", workers);

        let runner = TaskRunner {
            runtime: Some(runtime),
            gateway: Arc::new(gateway),
            events,
            workers,
        };
        Ok((runner, receiver))
    }

    /// Queue a job. Its result arrives later on the event channel; if the
    /// receiver is gone by then the result is dropped.
    pub fn submit(&self, generation: Generation, job: Job) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();

        runtime.spawn_blocking(move || {
            let event = job.run(&gateway, generation);
            if events.send(event).is_err() {
                debug!("Result dropped, receiver closed");
            }
        });
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        // A hung ExifTool or ffmpeg must not block shutdown
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
