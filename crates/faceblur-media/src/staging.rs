//! Scoped temporary files for one transcode.
//!
//! A [`StagingSession`] owns a temporary input path, a temporary output
//! path and a filter script path for the engine. All of them are created
//! with random names inside the work directory and are removed when the
//! session is dropped, which covers every early return and a cancelled
//! future alike. [`StagingSession::publish`] removes the input and the
//! script and hands the output over as a [`StagedOutput`].

use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use faceblur_models::FrameDimensions;

use crate::error::{MediaError, MediaResult};

const INPUT_PREFIX: &str = "faceblur-in-";
const OUTPUT_PREFIX: &str = "faceblur-out-";
const SCRIPT_PREFIX: &str = "faceblur-filter-";

/// Temporary files for one pipeline run.
#[derive(Debug)]
pub struct StagingSession {
    input: TempPath,
    output: TempPath,
    script: TempPath,
}

impl StagingSession {
    /// Create both temporaries in `work_dir`.
    ///
    /// `extension` (with or without the leading dot) is kept on both files so
    /// the engine can pick a matching container for the output.
    pub async fn acquire(work_dir: &Path, extension: Option<&str>) -> MediaResult<Self> {
        fs::create_dir_all(work_dir).await.map_err(|e| {
            MediaError::staging(format!(
                "Cannot create work directory {}: {}",
                work_dir.display(),
                e
            ))
        })?;

        let suffix = extension
            .map(|ext| format!(".{}", ext.trim_start_matches('.')))
            .unwrap_or_default();

        let input = temp_path(work_dir, INPUT_PREFIX, &suffix)?;
        let output = temp_path(work_dir, OUTPUT_PREFIX, &suffix)?;
        let script = temp_path(work_dir, SCRIPT_PREFIX, ".txt")?;

        debug!(
            input = %input.display(),
            output = %output.display(),
            "Acquired staging files"
        );

        Ok(Self {
            input,
            output,
            script,
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// File the engine writes its filter graph to.
    pub fn script_path(&self) -> &Path {
        &self.script
    }

    /// Drain `reader` into the temporary input file.
    pub async fn stage<R>(&self, reader: &mut R) -> MediaResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.input_path())
            .await
            .map_err(|e| MediaError::staging(format!("Cannot open staging file: {}", e)))?;

        let mut writer = BufWriter::new(file);
        let bytes = tokio::io::copy(reader, &mut writer)
            .await
            .map_err(|e| MediaError::staging(format!("Input stream failed: {}", e)))?;

        writer
            .flush()
            .await
            .map_err(|e| MediaError::staging(format!("Cannot flush staging file: {}", e)))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| MediaError::staging(format!("Cannot sync staging file: {}", e)))?;

        Ok(bytes)
    }

    /// Delete the input and script and transfer ownership of the output to
    /// the caller.
    pub fn publish(self, frame: FrameDimensions, regions: usize) -> StagedOutput {
        let Self {
            input,
            output,
            script,
        } = self;

        for temp in [input, script] {
            let path = temp.to_path_buf();
            if let Err(e) = temp.close() {
                warn!(path = %path.display(), "Failed to remove staging file: {}", e);
            }
        }

        StagedOutput {
            path: output,
            frame,
            regions,
        }
    }
}

fn temp_path(dir: &Path, prefix: &str, suffix: &str) -> MediaResult<TempPath> {
    Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map(|file| file.into_temp_path())
        .map_err(|e| MediaError::staging(format!("Cannot create temporary file: {}", e)))
}

/// Pipeline result: a temporary output file owned by the caller.
///
/// The file is deleted when this value is dropped unless it is persisted
/// first.
#[derive(Debug)]
pub struct StagedOutput {
    path: TempPath,
    /// Frame size the regions were mapped against
    pub frame: FrameDimensions,
    /// Number of blurred regions
    pub regions: usize,
}

impl StagedOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the output to `dest`.
    pub fn persist(self, dest: impl AsRef<Path>) -> MediaResult<PathBuf> {
        let dest = dest.as_ref();
        self.path
            .persist(dest)
            .map_err(|e| MediaError::Io(e.error))?;
        Ok(dest.to_path_buf())
    }

    /// Delete the output now, reporting failures.
    pub fn close(self) -> MediaResult<()> {
        self.path.close()?;
        Ok(())
    }
}
