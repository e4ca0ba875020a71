/// File input boundary
///
/// Reads a batch of picked files, silently skips anything that is not an
/// image, and prepares the bytes that will be sent for captioning. Large
/// photos are downscaled so the caption request stays small.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use log::{debug, warn};
use tokio::task;

use crate::error::Result;

/// Longest side of the image sent to the caption service
const CAPTION_MAX_SIDE: u32 = 1024;

/// An accepted upload, ready to become a memory
#[derive(Debug, Clone)]
pub struct IncomingImage {
    pub path: PathBuf,
    /// Caption payload (downscaled JPEG, or the original bytes)
    pub bytes: Arc<Vec<u8>>,
    pub mime: String,
}

/// Load a batch of files in the background. Non-images and unreadable
/// files are dropped; each accepted file yields exactly one image.
pub async fn load_batch(paths: Vec<PathBuf>) -> Vec<IncomingImage> {
    let requested = paths.len();
    let loaded = task::spawn_blocking(move || {
        paths
            .iter()
            .filter_map(|path| match read_image(path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    None
                }
            })
            .collect::<Vec<_>>()
    })
    .await;

    match loaded {
        Ok(images) => {
            debug!("accepted {} of {} picked files", images.len(), requested);
            images
        }
        Err(e) => {
            warn!("File loading task failed: {}", e);
            Vec::new()
        }
    }
}

/// Read one file. `Ok(None)` means it is not an image.
pub fn read_image(path: &Path) -> Result<Option<IncomingImage>> {
    let bytes = std::fs::read(path)?;
    let Some(format) = sniff_format(&bytes) else {
        debug!("skipping non-image {}", path.display());
        return Ok(None);
    };

    let (bytes, mime) = match downscale_for_caption(&bytes) {
        Ok(Some(smaller)) => (smaller, ImageFormat::Jpeg.to_mime_type()),
        Ok(None) => (bytes, format.to_mime_type()),
        Err(e) => {
            debug!("sending {} unscaled: {}", path.display(), e);
            (bytes, format.to_mime_type())
        }
    };

    Ok(Some(IncomingImage {
        path: path.to_path_buf(),
        bytes: Arc::new(bytes),
        mime: mime.to_string(),
    }))
}

/// Detect an image by content, not by extension
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Re-encode as JPEG if the image is larger than the caption limit.
/// `Ok(None)` means the original is already small enough.
fn downscale_for_caption(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let img = image::load_from_memory(bytes)?;
    if img.width().max(img.height()) <= CAPTION_MAX_SIDE {
        return Ok(None);
    }

    let resized = img.resize(CAPTION_MAX_SIDE, CAPTION_MAX_SIDE, FilterType::Triangle);
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(resized.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(Some(out.into_inner()))
}
