//! PNG rendition of a packed frame.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use eink_frame::{PackedFrame, Palette};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode `frame` as a 4-bit indexed PNG with the palette's official colors.
///
/// 4-bit PNG rows are byte aligned with the leftmost pixel in the high
/// nibble, the same layout as the wire format, so the frame bytes are written
/// unchanged. Padding nibbles of odd-width rows are ignored by decoders.
pub fn encode_preview(frame: &PackedFrame, palette: &Palette) -> Result<Vec<u8>, PreviewError> {
    let plte = palette.to_rgb_table();

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, frame.width(), frame.height());
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Four);
        encoder.set_compression(png::Compression::Fast);
        encoder.set_filter(png::FilterType::NoFilter);
        encoder.set_palette(plte);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(frame.as_bytes())?;
    }
    Ok(buf.into_inner())
}

/// Write the preview into `dir` as `{name}.png`, creating `dir` if needed.
pub async fn save_preview(dir: &Path, name: &str, png: &[u8]) -> Result<PathBuf, PreviewError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{name}.png"));
    tokio::fs::write(&path, png).await?;
    tracing::debug!(path = %path.display(), bytes = png.len(), "Preview written");
    Ok(path)
}

/// Delete all but the `keep` newest previews in `dir`. `current` is always
/// kept and counts towards `keep`. Returns how many files were removed.
pub async fn prune_previews(dir: &Path, keep: usize, current: &Path) -> Result<usize, PreviewError> {
    let mut previews = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path == current || !matches!(path.extension(), Some(ext) if ext == "png") {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        previews.push((modified, path));
    }

    // newest first
    previews.sort_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for (_, path) in previews.into_iter().skip(keep.saturating_sub(1)) {
        tokio::fs::remove_file(&path).await?;
        removed += 1;
    }
    if removed > 0 {
        tracing::debug!(dir = %dir.display(), removed, "Old previews pruned");
    }
    Ok(removed)
}
