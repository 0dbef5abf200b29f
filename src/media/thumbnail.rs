use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::{is_video, video};

/// Default edge length of the square box thumbnails are fitted into
pub const THUMBNAIL_SIZE: u32 = 200;

/// A decoded preview, always RGBA8 so the UI can upload it as-is
#[derive(Clone, PartialEq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes
    pub pixels: Bytes,
}

impl Thumbnail {
    /// Wrap an RGBA image without copying its pixel buffer
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: Bytes::from(image.into_raw()),
        }
    }
}

// Pixel data is too large to be useful in logs
impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Why a thumbnail could not be produced
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Arc<image::ImageError>,
    },

    #[error("no video frame could be read from {}", .0.display())]
    NoFrame(PathBuf),

    #[error("ffmpeg failed on {}: {reason}", path.display())]
    Ffmpeg { path: PathBuf, reason: String },

    #[error("unsupported frame pixel format: {0}")]
    UnsupportedPixelFormat(String),
}

/// Produce a thumbnail that fits within a `size` x `size` box.
///
/// Videos go through ffmpeg (first frame), everything else through the
/// `image` decoders. Blocking: call it from a worker, never the UI thread.
pub fn produce(path: &Path, size: u32) -> Result<Thumbnail, ThumbnailError> {
    if is_video(path) {
        video::first_frame_thumbnail(path, size)
    } else {
        still_thumbnail(path, size)
    }
}

/// Decode a still image, honour its EXIF orientation, then shrink it
fn still_thumbnail(path: &Path, size: u32) -> Result<Thumbnail, ThumbnailError> {
    let decode_err = |e: image::ImageError| ThumbnailError::Decode {
        path: path.to_path_buf(),
        source: Arc::new(e),
    };

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ThumbnailError::Open {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;

    let mut decoder = reader.into_decoder().map_err(decode_err)?;

    // Orientation must be applied before scaling so portrait shots
    // get fitted by their real width and height
    let orientation = decoder.orientation().map_err(decode_err)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    img.apply_orientation(orientation);

    // Only ever shrink, small images keep their native size
    if img.width() > size || img.height() > size {
        img = img.resize(size, size, FilterType::Lanczos3);
    }

    Ok(Thumbnail::from_rgba(img.to_rgba8()))
}
