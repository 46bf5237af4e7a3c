//! Intrinsics table export.

use std::path::PathBuf;

use depthcast_core::{DepthError, IntrinsicsTable};

/// Write `table` to `path` as `x\ty` lines on a blocking worker.
///
/// Returns the path written. Both an I/O failure and a failed worker
/// come back as errors; callers log them and keep running.
pub async fn write_intrinsics(
    table: IntrinsicsTable,
    path: PathBuf,
) -> Result<PathBuf, DepthError> {
    tokio::task::spawn_blocking(move || -> Result<PathBuf, DepthError> {
        table.write_tsv(&path)?;
        Ok(path)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use depthcast_core::{FrameSize, UnitPlanePoint};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("depthcast-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn writes_one_line_per_pixel() {
        let size = FrameSize::new(3, 2);
        let mapper = |x: f32, y: f32| Some(UnitPlanePoint::new(x, y));
        let table = IntrinsicsTable::build(&mapper, size);
        let path = scratch("table.tsv");

        let written = write_intrinsics(table, path.clone()).await.unwrap();
        assert_eq!(written, path);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), size.pixel_count());
        assert_eq!(lines[4], "1\t1");
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn unwritable_path_is_an_error() {
        let table = IntrinsicsTable::empty(FrameSize::new(2, 2));
        let path = scratch("missing-dir").join("table.tsv");
        let result = write_intrinsics(table, path).await;
        assert!(matches!(result, Err(DepthError::Io(_))));
    }
}
