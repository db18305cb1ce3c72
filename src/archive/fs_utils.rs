use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

/// Removes a directory tree, clearing read-only attributes first.
///
/// Archived trees can come back with read-only files on them, which a plain
/// recursive delete refuses to touch on some platforms. This walks the tree
/// and restores write permission on every entry before deleting, with one
/// retry if the delete still fails. An already absent path counts as success.
pub fn force_remove_tree(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if !metadata.is_dir() {
        make_deletable(path, &metadata);
        return fs::remove_file(path);
    }

    clear_readonly(path);
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => {
            clear_readonly(path);
            match fs::remove_dir_all(path) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        }
    }
}

fn clear_readonly(path: &Path) {
    // Directories are fixed up as they are yielded, before their contents are
    // enumerated, so an unreadable directory becomes traversable in the same
    // pass. Failures here surface later through remove_dir_all.
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if let Ok(metadata) = entry.metadata() {
            make_deletable(entry.path(), &metadata);
        }
    }
}

#[cfg(unix)]
fn make_deletable(path: &Path, metadata: &fs::Metadata) {
    use std::os::unix::fs::PermissionsExt;

    // Owner needs write on files and write+exec on directories to delete
    // their contents.
    let wanted = if metadata.is_dir() { 0o700 } else { 0o600 };
    let mode = metadata.permissions().mode();
    if mode & wanted != wanted {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode | wanted));
    }
}

#[cfg(not(unix))]
fn make_deletable(path: &Path, metadata: &fs::Metadata) {
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        let _ = fs::set_permissions(path, permissions);
    }
}
