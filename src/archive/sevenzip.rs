use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiverError {
    #[error("failed to run 7z: {0}")]
    Launch(#[from] std::io::Error),

    #[error("7z exited with code {code}: {stderr}")]
    NonZero { code: i32, stderr: String },

    #[error("7z terminated by signal")]
    Killed,
}

/// External archiver collaborator. Implementations produce and expand
/// password-protected archives; the reconciliation core only sees these two
/// operations.
pub trait Archiver {
    /// Create a header-encrypted archive at `output` from `source_dir`.
    fn create(&self, output: &Path, source_dir: &Path, password: &str)
    -> Result<(), ArchiverError>;

    /// Expand `archive` into `target_parent`, recreating the archived
    /// directory under it.
    fn extract(&self, archive: &Path, target_parent: &Path, password: &str)
    -> Result<(), ArchiverError>;
}

/// 7-Zip command line wrapper.
#[derive(Debug, Clone, Default)]
pub struct SevenZip {
    debug: bool,
}

impl SevenZip {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn run(&self, mut cmd: Command) -> Result<(), ArchiverError> {
        if self.debug {
            let shown: Vec<String> = cmd
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned())
                .map(|arg| {
                    if arg.starts_with("-p") {
                        "-p<password>".to_string()
                    } else {
                        arg
                    }
                })
                .collect();
            eprintln!("+ 7z {}", shown.join(" "));
        }
        let output = cmd.output()?;
        match output.status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ArchiverError::NonZero {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            None => Err(ArchiverError::Killed),
        }
    }
}

impl Archiver for SevenZip {
    fn create(
        &self,
        output: &Path,
        source_dir: &Path,
        password: &str,
    ) -> Result<(), ArchiverError> {
        let mut cmd = Command::new("7z");
        cmd.arg("a")
            .arg("-mhe=on")
            .arg(format!("-p{password}"))
            .arg("--")
            .arg(output)
            .arg(source_dir);
        self.run(cmd)
    }

    fn extract(
        &self,
        archive: &Path,
        target_parent: &Path,
        password: &str,
    ) -> Result<(), ArchiverError> {
        let mut target_flag = OsString::from("-o");
        target_flag.push(target_parent);

        let mut cmd = Command::new("7z");
        cmd.arg("x")
            .arg("-y")
            .arg(format!("-p{password}"))
            .arg(target_flag)
            .arg("--")
            .arg(archive);
        self.run(cmd)
    }
}
