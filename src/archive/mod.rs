pub mod fs_utils;
pub mod sevenzip;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use crate::archive::fs_utils::force_remove_tree;
use crate::archive::sevenzip::{Archiver, ArchiverError};
use crate::version::{FilenameCodec, VersionedFilename};

/// Suffix of the staged-old directory kept around during a restore.
pub const BACKUP_SUFFIX: &str = "_old";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("no directory '{0}' to pack")]
    NoSourceDirectory(String),

    #[error("unable to create archive")]
    PackFailed(#[source] ArchiverError),

    #[error("unable to clear previous backup '{backup}'")]
    CannotClearBackup {
        backup: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to stage old directory '{target}'")]
    CannotStageOld {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to extract archive")]
    ExtractFailed(#[source] ArchiverError),
}

/// Produces new archives from the tracked directory and restores the tracked
/// directory from downloaded archives with crash-safe replacement semantics.
pub struct ArchiveManager<'a> {
    archiver: &'a dyn Archiver,
    codec: &'a FilenameCodec,
    workdir: PathBuf,
    platform_tag: String,
    password: String,
}

impl<'a> ArchiveManager<'a> {
    pub fn new(
        archiver: &'a dyn Archiver,
        codec: &'a FilenameCodec,
        workdir: impl Into<PathBuf>,
        platform_tag: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            archiver,
            codec,
            workdir: workdir.into(),
            platform_tag: platform_tag.into(),
            password: password.into(),
        }
    }

    /// Packs the tracked directory into a fresh archive stamped with the
    /// current local time and returns the new version.
    pub fn pack(&self) -> Result<VersionedFilename, ArchiveError> {
        let source = self.workdir.join(self.codec.prefix());
        if !source.is_dir() {
            return Err(ArchiveError::NoSourceDirectory(
                self.codec.prefix().to_string(),
            ));
        }

        let version = self
            .codec
            .stamp(Local::now().naive_local(), &self.platform_tag);
        let output = self.workdir.join(version.name());
        self.archiver
            .create(&output, &source, &self.password)
            .map_err(ArchiveError::PackFailed)?;
        Ok(version)
    }

    /// Replaces the tracked directory with the contents of `archive_name`.
    ///
    /// The previous directory is renamed to its backup name before extraction
    /// so that a failed extraction never destroys it; the caller can recover
    /// by renaming the backup back. On any failure the downloaded archive is
    /// deleted so an unverified download cannot be mistaken for a valid local
    /// version on the next run.
    pub fn restore(&self, archive_name: &str) -> Result<(), ArchiveError> {
        let archive = self.workdir.join(archive_name);
        let target = self.workdir.join(self.codec.prefix());
        let backup_name = format!("{}{BACKUP_SUFFIX}", self.codec.prefix());
        let backup = self.workdir.join(&backup_name);

        if target.exists() {
            if let Err(source) = force_remove_tree(&backup) {
                self.discard_download(&archive);
                return Err(ArchiveError::CannotClearBackup {
                    backup: backup_name,
                    source,
                });
            }
            if let Err(source) = fs::rename(&target, &backup) {
                self.discard_download(&archive);
                return Err(ArchiveError::CannotStageOld {
                    target: self.codec.prefix().to_string(),
                    source,
                });
            }
        }

        if let Err(err) = self.archiver.extract(&archive, &self.workdir, &self.password) {
            // The staged-old directory stays under its backup name; only the
            // unverified download is dropped.
            self.discard_download(&archive);
            return Err(ArchiveError::ExtractFailed(err));
        }
        Ok(())
    }

    fn discard_download(&self, archive: &Path) {
        let _ = fs::remove_file(archive);
    }
}
