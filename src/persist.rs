//! Reading and writing history files.
//!
//! Choosing paths, confirming overwrites and reporting outcomes to the
//! user belong to the host UI. This module only performs the I/O, and
//! reports an existing target as [`HistoryError::AlreadyExists`] so the
//! host can ask and retry with [`SaveMode::Overwrite`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::buffer::StyledBuffer;
use crate::decode::{decode_with_limits, DecodeLimits};
use crate::encode::encode;
use crate::error::HistoryError;
use crate::style::{StyleConfig, TagTable};

/// File name suggested when nothing has been saved yet.
pub const DEFAULT_FILE_NAME: &str = "dreampie-history.html";

/// What to do when the target file already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveMode {
    /// Fail with [`HistoryError::AlreadyExists`].
    #[default]
    CreateNew,
    /// Replace the existing file.
    Overwrite,
}

/// Encode `document` and write it to `path`.
pub fn save_history(
    path: &Path,
    document: &StyledBuffer,
    config: &StyleConfig,
    mode: SaveMode,
) -> Result<(), HistoryError> {
    let bytes = encode(document, config);
    match mode {
        SaveMode::Overwrite => fs::write(path, &bytes).map_err(|e| HistoryError::io("writing", path, e))?,
        SaveMode::CreateNew => {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|e| create_error(path, e))?;
            file.write_all(&bytes)
                .map_err(|e| HistoryError::io("writing", path, e))?;
        }
    }
    log::info!("History saved. [path={}]", path.display());
    Ok(())
}

/// Read and decode the history file at `path`.
pub fn load_history(
    path: &Path,
    table: &TagTable,
    limits: DecodeLimits,
) -> Result<StyledBuffer, HistoryError> {
    let bytes = fs::read(path).map_err(|e| HistoryError::io("reading", path, e))?;
    let buffer = decode_with_limits(&bytes, table, limits)?;
    log::info!("History loaded. [path={}]", path.display());
    Ok(buffer)
}

fn create_error(path: &Path, err: std::io::Error) -> HistoryError {
    if err.kind() == ErrorKind::AlreadyExists {
        HistoryError::AlreadyExists(path.to_path_buf())
    } else {
        HistoryError::io("creating", path, err)
    }
}

/// Remembers where the history was last saved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryFile {
    path: Option<PathBuf>,
}

impl HistoryFile {
    /// No remembered path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute path of the last successful save.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Name to prefill in a save dialog.
    pub fn suggested_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_FILE_NAME)
    }

    /// Save to the remembered path, replacing it.
    ///
    /// Fails with [`HistoryError::NoPath`] until [`Self::save_as`] succeeds once.
    pub fn save(&mut self, document: &StyledBuffer, config: &StyleConfig) -> Result<(), HistoryError> {
        let path = self.path.clone().ok_or(HistoryError::NoPath)?;
        save_history(&path, document, config, SaveMode::Overwrite)
    }

    /// Save to `path` and remember it on success.
    pub fn save_as(
        &mut self,
        path: impl AsRef<Path>,
        document: &StyledBuffer,
        config: &StyleConfig,
        mode: SaveMode,
    ) -> Result<(), HistoryError> {
        let path = path.as_ref();
        let path = std::path::absolute(path).map_err(|e| HistoryError::io("resolving", path, e))?;
        save_history(&path, document, config, mode)?;
        self.path = Some(path);
        Ok(())
    }
}

/// Async variant of [`save_history`].
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn save_history_async(
    path: &Path,
    document: &StyledBuffer,
    config: &StyleConfig,
    mode: SaveMode,
) -> Result<(), HistoryError> {
    use tokio::io::AsyncWriteExt;

    let bytes = encode(document, config);
    match mode {
        SaveMode::Overwrite => tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| HistoryError::io("writing", path, e))?,
        SaveMode::CreateNew => {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await
                .map_err(|e| create_error(path, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| HistoryError::io("writing", path, e))?;
            file.flush()
                .await
                .map_err(|e| HistoryError::io("writing", path, e))?;
        }
    }
    log::info!("History saved. [path={}]", path.display());
    Ok(())
}

/// Async variant of [`load_history`].
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn load_history_async(
    path: &Path,
    table: &TagTable,
    limits: DecodeLimits,
) -> Result<StyledBuffer, HistoryError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| HistoryError::io("reading", path, e))?;
    let buffer = decode_with_limits(&bytes, table, limits)?;
    log::info!("History loaded. [path={}]", path.display());
    Ok(buffer)
}
