use std::path::Path;
use std::process::{Command, Output};

use crate::remote::{RemoteError, RemoteStore};

/// MEGA remote storage driven through the megatools command line suite
/// (`megals`, `megamkdir`, `megaget`, `megaput`).
///
/// Credentials are passed as discrete argv entries, never interpolated into a
/// shell string.
#[derive(Debug, Clone)]
pub struct MegaRemote {
    username: String,
    password: String,
    debug: bool,
}

impl MegaRemote {
    pub fn new(username: impl Into<String>, password: impl Into<String>, debug: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            debug,
        }
    }

    fn base_command(&self, tool: &'static str) -> Command {
        let mut cmd = Command::new(tool);
        cmd.arg("-u")
            .arg(&self.username)
            .arg("-p")
            .arg(&self.password)
            .arg("--reload");
        cmd
    }

    fn run(&self, tool: &'static str, mut cmd: Command) -> Result<Output, RemoteError> {
        if self.debug {
            let shown: Vec<String> = cmd
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned())
                .map(|arg| {
                    if arg == self.password {
                        "<password>".to_string()
                    } else {
                        arg
                    }
                })
                .collect();
            eprintln!("+ {tool} {}", shown.join(" "));
        }
        let output = cmd
            .output()
            .map_err(|source| RemoteError::Launch { tool, source })?;
        match output.status.code() {
            Some(0) => Ok(output),
            Some(code) => Err(RemoteError::NonZero {
                tool,
                code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            None => Err(RemoteError::Killed { tool }),
        }
    }
}

/// megamkdir reports an existing directory as an error; that outcome is fine
/// for an idempotent ensure.
fn is_already_exists(stderr: &str) -> bool {
    stderr.to_lowercase().contains("already exists")
}

impl RemoteStore for MegaRemote {
    fn ensure_container(&self, container: &str) -> Result<(), RemoteError> {
        let mut cmd = self.base_command("megamkdir");
        cmd.arg(container);
        match self.run("megamkdir", cmd) {
            Ok(_) => Ok(()),
            Err(RemoteError::NonZero { ref stderr, .. }) if is_already_exists(stderr) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn list(&self, container: &str) -> Result<Vec<String>, RemoteError> {
        let mut cmd = self.base_command("megals");
        cmd.arg("--names").arg(container);
        let output = self.run("megals", cmd)?;

        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    fn download(&self, remote_path: &str, into: &Path) -> Result<(), RemoteError> {
        let mut cmd = self.base_command("megaget");
        cmd.arg("--path").arg(into).arg(remote_path);
        self.run("megaget", cmd)?;
        Ok(())
    }

    fn upload(&self, local_file: &Path, container: &str) -> Result<(), RemoteError> {
        let mut cmd = self.base_command("megaput");
        cmd.arg("--path").arg(container).arg(local_file);
        self.run("megaput", cmd)?;
        Ok(())
    }
}
