use crate::version::VersionedFilename;

/// Outcome of comparing the newest remote and newest local candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No versioned archive exists anywhere but the raw tracked directory
    /// does: pack it and push the first version.
    Bootstrap,
    /// The local archive is the newer one: upload it as-is.
    PushLocal(VersionedFilename),
    /// The remote archive is the newer one: download and restore it.
    PullRemote(VersionedFilename),
    /// Both sides already hold the same version.
    NoOp,
    /// Nothing exists on either side and there is no directory to pack.
    NothingToDo,
}

/// Pure decision table over the two candidates and the presence of the raw
/// tracked directory. No I/O happens here.
///
/// When timestamps tie but the names differ (distinct platform tags), the
/// remote side wins and is pulled.
pub fn decide(
    remote: Option<VersionedFilename>,
    local: Option<VersionedFilename>,
    raw_dir_present: bool,
) -> Decision {
    match (remote, local) {
        (None, None) if raw_dir_present => Decision::Bootstrap,
        (None, None) => Decision::NothingToDo,
        (None, Some(local)) => Decision::PushLocal(local),
        (Some(remote), None) => Decision::PullRemote(remote),
        (Some(remote), Some(local)) => {
            if remote.name() == local.name() {
                Decision::NoOp
            } else if remote.timestamp >= local.timestamp {
                Decision::PullRemote(remote)
            } else {
                Decision::PushLocal(local)
            }
        }
    }
}
