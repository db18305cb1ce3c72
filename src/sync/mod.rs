pub mod decision;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::archive::ArchiveManager;
use crate::remote::RemoteStore;
use crate::sync::decision::{Decision, decide};
use crate::version::{FilenameCodec, select_newest};

/// Terminal outcome of a successful run, carried back to main for the final
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent(String),
    Downloaded(String),
    UpToDate,
}

/// Drives one reconciliation attempt: resolve the newest candidate on each
/// side, apply the decision table, and execute the chosen transfer through
/// the collaborators. Single-threaded and all-or-nothing; any collaborator
/// failure aborts the run.
pub struct SyncEngine<'a> {
    remote: &'a dyn RemoteStore,
    archive: &'a ArchiveManager<'a>,
    codec: &'a FilenameCodec,
    container: String,
    workdir: PathBuf,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        remote: &'a dyn RemoteStore,
        archive: &'a ArchiveManager<'a>,
        codec: &'a FilenameCodec,
        container: impl Into<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote,
            archive,
            codec,
            container: container.into(),
            workdir: workdir.into(),
        }
    }

    /// Runs one reconciliation. With `commit` set, the tracked directory is
    /// packed and pushed unconditionally and the decision table is skipped.
    pub fn run(&self, commit: bool) -> Result<Outcome> {
        self.remote
            .ensure_container(&self.container)
            .context("preparing remote directory")?;

        let remote_listing = self
            .remote
            .list(&self.container)
            .context("listing remote files")?;
        let remote_candidate = select_newest(remote_listing, self.codec);

        let local_listing = self.local_listing().context("listing working directory")?;
        let local_candidate = select_newest(local_listing, self.codec);

        if commit {
            return self.pack_and_push().map(Outcome::Sent);
        }

        let raw_dir_present = self.workdir.join(self.codec.prefix()).is_dir();
        match decide(remote_candidate, local_candidate, raw_dir_present) {
            Decision::Bootstrap => self.pack_and_push().map(Outcome::Sent),
            Decision::PushLocal(local) => {
                let name = local.name();
                self.remote
                    .upload(&self.workdir.join(&name), &self.container)
                    .context("uploading file")?;
                Ok(Outcome::Sent(name))
            }
            Decision::PullRemote(remote) => {
                let name = remote.name();
                let remote_path = format!("{}/{}", self.container, name);
                self.remote
                    .download(&remote_path, &self.workdir)
                    .context("downloading file")?;
                self.archive
                    .restore(&name)
                    .context("replacing local directory")?;
                Ok(Outcome::Downloaded(name))
            }
            Decision::NoOp => Ok(Outcome::UpToDate),
            Decision::NothingToDo => bail!("no files to work with"),
        }
    }

    fn pack_and_push(&self) -> Result<String> {
        let version = self.archive.pack().context("creating archive")?;
        let name = version.name();
        self.remote
            .upload(&self.workdir.join(&name), &self.container)
            .context("uploading file")?;
        Ok(name)
    }

    fn local_listing(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.workdir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::Path;
    use tempfile::TempDir;

    use crate::archive::sevenzip::{Archiver, ArchiverError};
    use crate::remote::RemoteError;

    const CONTAINER: &str = "/Root/app";

    /// In-memory remote: a list of names, uploads append to it, downloads
    /// materialize a marker file.
    #[derive(Default)]
    struct FakeRemote {
        names: RefCell<Vec<String>>,
        fail_list: Cell<bool>,
    }

    impl FakeRemote {
        fn with_names(names: &[&str]) -> Self {
            Self {
                names: RefCell::new(names.iter().map(|s| s.to_string()).collect()),
                fail_list: Cell::new(false),
            }
        }
    }

    impl RemoteStore for FakeRemote {
        fn ensure_container(&self, _container: &str) -> Result<(), RemoteError> {
            Ok(())
        }

        fn list(&self, _container: &str) -> Result<Vec<String>, RemoteError> {
            if self.fail_list.get() {
                return Err(RemoteError::NonZero {
                    tool: "megals",
                    code: 1,
                    stderr: "simulated listing failure".to_string(),
                });
            }
            Ok(self.names.borrow().clone())
        }

        fn download(&self, remote_path: &str, into: &Path) -> Result<(), RemoteError> {
            let name = remote_path.rsplit('/').next().unwrap();
            assert!(self.names.borrow().iter().any(|n| n == name));
            fs::write(into.join(name), b"archive").unwrap();
            Ok(())
        }

        fn upload(&self, local_file: &Path, _container: &str) -> Result<(), RemoteError> {
            assert!(local_file.exists(), "upload of a file that is not there");
            let name = local_file.file_name().unwrap().to_string_lossy().into_owned();
            self.names.borrow_mut().push(name);
            Ok(())
        }
    }

    /// Archiver double: archives are marker files, extraction recreates the
    /// tracked directory.
    #[derive(Default)]
    struct FakeArchiver {
        creates: Cell<u32>,
    }

    impl Archiver for FakeArchiver {
        fn create(
            &self,
            output: &Path,
            source_dir: &Path,
            _password: &str,
        ) -> Result<(), ArchiverError> {
            assert!(source_dir.is_dir());
            self.creates.set(self.creates.get() + 1);
            fs::write(output, b"archive").unwrap();
            Ok(())
        }

        fn extract(
            &self,
            archive: &Path,
            target_parent: &Path,
            _password: &str,
        ) -> Result<(), ArchiverError> {
            assert!(archive.exists());
            let target = target_parent.join("app");
            fs::create_dir_all(&target).unwrap();
            fs::write(target.join("restored.txt"), b"fresh").unwrap();
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        codec: FilenameCodec,
        remote: FakeRemote,
        archiver: FakeArchiver,
    }

    impl Fixture {
        fn new(remote_names: &[&str]) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                codec: FilenameCodec::new("app"),
                remote: FakeRemote::with_names(remote_names),
                archiver: FakeArchiver::default(),
            }
        }

        fn run(&self, commit: bool) -> Result<Outcome> {
            let manager =
                ArchiveManager::new(&self.archiver, &self.codec, self.dir.path(), "linux", "pw");
            let engine = SyncEngine::new(
                &self.remote,
                &manager,
                &self.codec,
                CONTAINER,
                self.dir.path(),
            );
            engine.run(commit)
        }

        fn add_raw_dir(&self) {
            fs::create_dir(self.dir.path().join("app")).unwrap();
            fs::write(self.dir.path().join("app/data.txt"), b"payload").unwrap();
        }

        fn add_local_archive(&self, name: &str) {
            fs::write(self.dir.path().join(name), b"archive").unwrap();
        }
    }

    #[test]
    fn test_bootstrap_packs_and_pushes() {
        let fixture = Fixture::new(&[]);
        fixture.add_raw_dir();

        let outcome = fixture.run(false).unwrap();
        let Outcome::Sent(name) = outcome else {
            panic!("expected Sent, got {outcome:?}");
        };
        assert!(fixture.codec.matches(&name));
        assert_eq!(fixture.archiver.creates.get(), 1);
        assert!(fixture.remote.names.borrow().contains(&name));

        // With no external change the next run finds the same version on
        // both sides.
        assert_eq!(fixture.run(false).unwrap(), Outcome::UpToDate);
    }

    #[test]
    fn test_nothing_anywhere_fails() {
        let fixture = Fixture::new(&[]);
        let err = fixture.run(false).unwrap_err();
        assert!(err.to_string().contains("no files to work with"));
    }

    #[test]
    fn test_local_only_pushes_without_repacking() {
        let fixture = Fixture::new(&[]);
        fixture.add_local_archive("app_01_01_24_10_00_00_linux.7z");

        let outcome = fixture.run(false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Sent("app_01_01_24_10_00_00_linux.7z".to_string())
        );
        assert_eq!(fixture.archiver.creates.get(), 0);

        assert_eq!(fixture.run(false).unwrap(), Outcome::UpToDate);
    }

    #[test]
    fn test_newer_remote_is_pulled_and_restored() {
        let fixture = Fixture::new(&["app_02_01_24_09_00_00_linux.7z"]);
        fixture.add_raw_dir();
        fixture.add_local_archive("app_01_01_24_09_00_00_linux.7z");

        let outcome = fixture.run(false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Downloaded("app_02_01_24_09_00_00_linux.7z".to_string())
        );
        assert!(fixture.dir.path().join("app/restored.txt").exists());
        assert!(fixture.dir.path().join("app_old/data.txt").exists());

        assert_eq!(fixture.run(false).unwrap(), Outcome::UpToDate);
    }

    #[test]
    fn test_newer_local_is_pushed() {
        let fixture = Fixture::new(&["app_01_01_24_09_00_00_win.7z"]);
        fixture.add_local_archive("app_02_01_24_09_00_00_linux.7z");

        let outcome = fixture.run(false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Sent("app_02_01_24_09_00_00_linux.7z".to_string())
        );
        assert_eq!(fixture.archiver.creates.get(), 0);
    }

    #[test]
    fn test_same_version_everywhere_is_up_to_date() {
        let fixture = Fixture::new(&["app_03_01_24_12_00_00_win.7z"]);
        fixture.add_local_archive("app_03_01_24_12_00_00_win.7z");

        assert_eq!(fixture.run(false).unwrap(), Outcome::UpToDate);
    }

    #[test]
    fn test_commit_pushes_even_when_up_to_date() {
        let fixture = Fixture::new(&["app_03_01_24_12_00_00_win.7z"]);
        fixture.add_raw_dir();
        fixture.add_local_archive("app_03_01_24_12_00_00_win.7z");

        let outcome = fixture.run(true).unwrap();
        let Outcome::Sent(name) = outcome else {
            panic!("expected Sent, got {outcome:?}");
        };
        assert!(fixture.codec.matches(&name));
        assert_eq!(fixture.archiver.creates.get(), 1);
    }

    #[test]
    fn test_remote_listing_failure_aborts() {
        let fixture = Fixture::new(&[]);
        fixture.add_raw_dir();
        fixture.remote.fail_list.set(true);

        let err = fixture.run(false).unwrap_err();
        assert!(err.to_string().contains("listing remote files"));
        assert_eq!(fixture.archiver.creates.get(), 0);
    }

    #[test]
    fn test_remote_noise_is_ignored() {
        let fixture = Fixture::new(&["notes.txt", "app_backup", "app_01_01_24_10_00_00_mac.7z"]);

        let outcome = fixture.run(false).unwrap();
        assert_eq!(
            outcome,
            Outcome::Downloaded("app_01_01_24_10_00_00_mac.7z".to_string())
        );
    }
}
