/// Video thumbnails from the first decodable frame
///
/// ffmpeg is driven through ffmpeg-sidecar and asked for raw video on
/// stdout, so no intermediate files are written.
use ffmpeg_sidecar::command::FfmpegCommand;
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use std::path::Path;

use super::thumbnail::{Thumbnail, ThumbnailError};

/// Decode the first frame of a video and fit it within `size` x `size`
pub fn first_frame_thumbnail(path: &Path, size: u32) -> Result<Thumbnail, ThumbnailError> {
    let ffmpeg_err = |reason: String| ThumbnailError::Ffmpeg {
        path: path.to_path_buf(),
        reason,
    };

    let mut child = FfmpegCommand::new()
        .hide_banner()
        .input(path)
        .frames(1)
        .rawvideo()
        .spawn()
        .map_err(|e| ffmpeg_err(e.to_string()))?;

    let frame = child
        .iter()
        .map_err(|e| ffmpeg_err(e.to_string()))?
        .filter_frames()
        .next();

    // The process has usually exited after one frame, but don't leave it
    // running if the container kept producing output
    let _ = child.kill();
    let _ = child.wait();

    let frame = frame.ok_or_else(|| ThumbnailError::NoFrame(path.to_path_buf()))?;
    let rgba = frame_to_rgba(frame.width, frame.height, &frame.pix_fmt, &frame.data)?;

    // Videos are always scaled to fit, up or down
    let scaled = DynamicImage::ImageRgba8(rgba).resize(size, size, FilterType::Triangle);
    Ok(Thumbnail::from_rgba(scaled.to_rgba8()))
}

/// Convert a packed 24-bit frame into RGBA, reordering channels as needed
fn frame_to_rgba(
    width: u32,
    height: u32,
    pix_fmt: &str,
    data: &[u8],
) -> Result<RgbaImage, ThumbnailError> {
    let (r, g, b) = match pix_fmt {
        "rgb24" => (0, 1, 2),
        "bgr24" => (2, 1, 0),
        other => return Err(ThumbnailError::UnsupportedPixelFormat(other.to_string())),
    };

    let expected = width as usize * height as usize * 3;
    if width == 0 || height == 0 || data.len() < expected {
        return Err(ThumbnailError::UnsupportedPixelFormat(format!(
            "{pix_fmt} frame {width}x{height} with {} bytes",
            data.len()
        )));
    }

    let mut pixels = Vec::with_capacity(expected / 3 * 4);
    for px in data[..expected].chunks_exact(3) {
        pixels.extend_from_slice(&[px[r], px[g], px[b], 255]);
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| ThumbnailError::UnsupportedPixelFormat(pix_fmt.to_string()))
}
