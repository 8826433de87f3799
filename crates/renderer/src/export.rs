use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use crate::types::{PixelBuffer, SurfaceSize};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot export an empty {0} surface")]
    Empty(SurfaceSize),
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Clamps `buffer` to 8-bit RGBA and writes it as a PNG at `path`,
/// creating parent directories as needed.
pub fn write_png(buffer: &PixelBuffer, path: &Path) -> Result<(), ExportError> {
    let size = buffer.size();
    let image = RgbaImage::from_raw(size.width, size.height, buffer.to_rgba8())
        .filter(|_| !size.is_empty())
        .ok_or(ExportError::Empty(size))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ExportError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), size = %size, "wrote png");
    Ok(())
}

/// Path of the `index`th frame of a numbered sequence inside `dir`.
pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame-{index:05}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ShaderBinding;
    use tempfile::TempDir;

    #[test]
    fn writes_a_readable_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/solid.png");
        let mut binding =
            ShaderBinding::new("half4 main(float2 p) { return half4(1, 0, 1, 1); }", 3, 2).unwrap();
        write_png(&binding.on_frame(0.0), &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert!(decoded.pixels().all(|pixel| pixel.0 == [255, 0, 255, 255]));
    }

    #[test]
    fn refuses_empty_surfaces() {
        let dir = TempDir::new().unwrap();
        let mut binding =
            ShaderBinding::new("half4 main(float2 p) { return half4(1.0); }", 0, 4).unwrap();
        let err = write_png(&binding.on_frame(0.0), &dir.path().join("empty.png")).unwrap_err();
        assert!(matches!(err, ExportError::Empty(size) if size == SurfaceSize::new(0, 4)));
    }

    #[test]
    fn frame_paths_are_zero_padded() {
        assert_eq!(
            frame_path(Path::new("out"), 7),
            Path::new("out").join("frame-00007.png")
        );
    }
}
