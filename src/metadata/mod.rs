//! ExifTool gateway
//!
//! This module handles:
//! - Finding the ExifTool executable
//! - Reading all tags of one file (record.rs)
//! - Reading the "date taken" of a whole folder in one invocation (date.rs)
//! - Writing a corrected date back in place
//!
//! Read failures never surface as errors: a missing tool, a non-zero exit
//! or unparseable output all come back as "no metadata".

pub mod date;
pub mod record;

use serde_json::{Map, Value};
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

pub use date::{DateBatch, DateResolution};
pub use record::MetadataRecord;

use crate::media::is_video;

/// Environment variable that pins the ExifTool executable
pub const EXIFTOOL_ENV: &str = "EXIFTOOL_PATH";

/// Name looked up on `PATH`; `which` adds `PATHEXT` suffixes on Windows
const EXECUTABLE_NAME: &str = "exiftool";

/// Places a bundled copy is looked for, relative to the working
/// directory and to the application's own directory
const LOCAL_CANDIDATES: [&str; 5] = [
    "exiftool",
    "exiftool.exe",
    "libs/exiftool.exe",
    "src/libs/exiftool.exe",
    "src/core/exiftool.exe",
];

/// Tags that are set alongside AllDates for videos, so container and
/// stream metadata agree
const VIDEO_DATE_TAGS: [&str; 2] = ["QuickTime:CreateDate", "QuickTime:MediaCreateDate"];

#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("exiftool exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("malformed exiftool output: {0}")]
    Malformed(#[source] Arc<serde_json::Error>),

    #[error("exiftool could not be found")]
    NotFound,

    #[error("invalid date {0:?}, expected YYYY:MM:DD HH:MM:SS")]
    InvalidDate(String),
}

/// Handle on the ExifTool command line program.
///
/// Every call spawns a fresh process; concurrent calls are fine.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    /// Arguments placed before ours, e.g. the script for `perl exiftool`
    prefix: Vec<OsString>,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    /// Run ExifTool through another program, e.g. `perl /opt/exiftool/exiftool`
    pub fn from_command<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            prefix: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Find an installed ExifTool.
    ///
    /// Search order: `EXIFTOOL_PATH`, the configured path, `PATH`, then a
    /// bundled copy next to the working directory or the executable. Only
    /// files that can actually be executed are accepted.
    pub fn locate(configured: Option<&Path>) -> Option<Self> {
        let cwd = env::current_dir().unwrap_or_default();
        let mut roots = vec![cwd.clone()];
        if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            roots.push(dir);
        }

        let explicit: Vec<PathBuf> = env::var_os(EXIFTOOL_ENV)
            .map(PathBuf::from)
            .into_iter()
            .chain(configured.map(Path::to_path_buf))
            .collect();

        let found = find_executable(&explicit, env::var_os("PATH"), &roots, &cwd)?;
        debug!("Using ExifTool at {}", found.display());
        Some(Self::new(found))
    }

    /// Check the tool answers `-ver`, returning it with its version
    pub fn verified(self) -> Result<(Self, String), MetadataError> {
        let version = self.version()?;
        Ok((self, version))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `exiftool -ver`, for the startup log
    pub fn version(&self) -> Result<String, MetadataError> {
        let stdout = self.run([OsString::from("-ver")], None)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Read every tag of one file. None on any failure.
    pub fn read_one(&self, path: &Path) -> Option<MetadataRecord> {
        let args = [
            OsString::from("-j"),
            OsString::from("-G"),
            path_arg(path),
        ];

        match self.run(args, None).and_then(|stdout| parse_records(&stdout)) {
            Ok(records) => records.into_iter().next(),
            Err(e) => {
                warn!("⚠️  Error reading metadata for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Resolve the date of every file in one invocation.
    ///
    /// Paths are handed over as an argument file on stdin so a large
    /// folder never hits the command line length limit. An empty table is
    /// returned on any failure.
    pub fn read_batch(&self, paths: &[PathBuf]) -> DateBatch {
        if paths.is_empty() {
            return DateBatch::default();
        }

        // The argument file is read as UTF-8; a name that is not would be
        // mangled into a path that does not exist and fail the whole batch
        let mut arg_file = String::new();
        for path in paths {
            match path_arg(path).to_str() {
                Some(arg) => {
                    arg_file.push_str(arg);
                    arg_file.push('\n');
                }
                None => warn!("⚠️  Skipping non-UTF-8 path in date batch: {}", path.display()),
            }
        }
        if arg_file.is_empty() {
            return DateBatch::default();
        }

        let args = ["-j", "-G", "-charset", "filename=utf8", "-@", "-"].map(OsString::from);

        match self.run(args, Some(arg_file)).and_then(|stdout| parse_records(&stdout)) {
            Ok(records) => {
                debug!("Batch metadata: {} records for {} files", records.len(), paths.len());
                DateBatch::from_records(&records)
            }
            Err(e) => {
                warn!("⚠️  Error in batch metadata ({} files): {}", paths.len(), e);
                DateBatch::default()
            }
        }
    }

    /// Set the date taken, overwriting the file in place.
    ///
    /// `value` must be `YYYY:MM:DD HH:MM:SS`. Writes AllDates, and for videos
    /// the two QuickTime creation tags as well.
    pub fn write_date(&self, path: &Path, value: &str) -> Result<(), MetadataError> {
        let parsed = date::parse_date_time(value)
            .ok_or_else(|| MetadataError::InvalidDate(value.to_string()))?;
        let value = date::to_native(&parsed);

        let mut args = vec![
            OsString::from(format!("-AllDates={value}")),
            OsString::from("-overwrite_original"),
        ];
        if is_video(path) {
            for tag in VIDEO_DATE_TAGS {
                args.push(OsString::from(format!("-{tag}={value}")));
            }
        }
        args.push(path_arg(path));

        self.run(args, None).map(|stdout| {
            debug!(
                "Wrote {} to {}: {}",
                value,
                path.display(),
                String::from_utf8_lossy(&stdout).trim()
            );
        })
    }

    /// Spawn the tool, optionally feeding `input` on stdin, and return
    /// stdout if it exited successfully
    fn run<I>(&self, args: I, input: Option<String>) -> Result<Vec<u8>, MetadataError>
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let spawn_err = |e: io::Error| MetadataError::Spawn {
            program: self.program.clone(),
            source: Arc::new(e),
        };

        let mut child = Command::new(&self.program)
            .args(&self.prefix)
            .args(args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Write on another thread: ExifTool may fill stdout before it has
        // read the whole argument file
        let writer = match (input, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => Some(thread::spawn(move || {
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    debug!("ExifTool stdin closed early: {}", e);
                }
            })),
            _ => None,
        };

        let output = child.wait_with_output().map_err(spawn_err)?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        if !output.status.success() {
            return Err(MetadataError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Parse `exiftool -j` output: a JSON array with one object per file
fn parse_records(stdout: &[u8]) -> Result<Vec<MetadataRecord>, MetadataError> {
    let objects: Vec<Map<String, Value>> = serde_json::from_slice(stdout)
        .map_err(|e| MetadataError::Malformed(Arc::new(e)))?;
    Ok(objects.into_iter().filter_map(MetadataRecord::from_json).collect())
}

/// A relative path starting with '-' would be read as an option
fn path_arg(path: &Path) -> OsString {
    if path.is_relative() && path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_os_string()
    }
}

/// First executable ExifTool: explicit paths, then `PATH`, then the
/// bundled locations under each root
fn find_executable(
    explicit: &[PathBuf],
    path_var: Option<OsString>,
    roots: &[PathBuf],
    cwd: &Path,
) -> Option<PathBuf> {
    let executable = |candidate: &Path| which::which_in(candidate, None::<&OsStr>, cwd).ok();

    if let Some(found) = explicit.iter().find_map(|candidate| {
        let found = executable(candidate);
        if found.is_none() {
            warn!("⚠️  {} is not an executable ExifTool", candidate.display());
        }
        found
    }) {
        return Some(found);
    }

    if let Ok(found) = which::which_in(EXECUTABLE_NAME, path_var, cwd) {
        return Some(found);
    }

    roots
        .iter()
        .flat_map(|root| LOCAL_CANDIDATES.iter().map(move |local| root.join(local)))
        .find_map(|candidate| executable(&candidate))
}
