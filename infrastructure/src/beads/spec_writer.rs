use std::path::{Path, PathBuf};
use thinktank_domain::{BeadTask, render_spec_files};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SpecWriteError {
    #[error("Could not create spec directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write spec file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write one Markdown spec per task into `dir`, creating it if needed.
///
/// Existing files with the same names are overwritten. Returns the written
/// paths in task order.
pub fn write_spec_files(dir: &Path, tasks: &[BeadTask]) -> Result<Vec<PathBuf>, SpecWriteError> {
    std::fs::create_dir_all(dir).map_err(|source| SpecWriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(tasks.len());
    for spec in render_spec_files(tasks) {
        let path = dir.join(&spec.filename);
        std::fs::write(&path, spec.content).map_err(|source| SpecWriteError::WriteFile {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    info!("Wrote {} spec files to {}", written.len(), dir.display());
    Ok(written)
}
