pub mod mega;

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("failed to run {tool}: {source}")]
    Launch {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code}: {stderr}")]
    NonZero {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("{tool} terminated by signal")]
    Killed { tool: &'static str },
}

/// Remote object store collaborator. One container holds the archive family
/// for the tracked prefix; the reconciliation core only ever lists it,
/// creates it, and moves single files in and out of it.
pub trait RemoteStore {
    /// Create `container` if it does not exist yet. Idempotent.
    fn ensure_container(&self, container: &str) -> Result<(), RemoteError>;

    /// Names of the entries currently inside `container`.
    fn list(&self, container: &str) -> Result<Vec<String>, RemoteError>;

    /// Fetch `remote_path` into the directory `into`, keeping its name.
    fn download(&self, remote_path: &str, into: &Path) -> Result<(), RemoteError>;

    /// Send `local_file` into `container` under its own name.
    fn upload(&self, local_file: &Path, container: &str) -> Result<(), RemoteError>;
}
