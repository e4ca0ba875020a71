/// Load-time seeding from a folder of photos.
///
/// Seeded memories are spread evenly over the sphere with the golden-angle
/// spiral, so the starting globe has no clumps. Their captions come from the
/// file names; only uploads go through the caption service.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::Utc;
use log::info;
use rand::Rng;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::projection;
use crate::state::data::Memory;

/// Image extensions picked up from the seed folder and the upload dialog
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Build the seeded set from every image file under `dir`
pub fn seed_from_dir(dir: &Path) -> Result<Vec<Memory>> {
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("seed folder {} does not exist", dir.display()),
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    paths.sort();

    let count = paths.len();
    let mut rng = rand::thread_rng();
    let memories: Vec<Memory> = paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let (theta, phi) = projection::fibonacci_coords(i, count);
            Memory {
                id: uuid::Uuid::new_v4().to_string(),
                url: path.to_string_lossy().to_string(),
                description: caption_from_file_name(path),
                timestamp: modified_millis(path).unwrap_or_else(|| Utc::now().timestamp_millis()),
                theta,
                phi,
                scale: rng.gen_range(0.85..1.15),
                rotation: rng.gen_range(-8.0..8.0),
                drift_speed: rng.gen_range(0.5..1.5),
                is_analyzing: false,
            }
        })
        .collect();

    info!("🌱 Seeded {} memories from {}", memories.len(), dir.display());
    Ok(memories)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// "summer_at-the-lake" -> "summer at the lake"
fn caption_from_file_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn modified_millis(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_millis()).ok()
}
