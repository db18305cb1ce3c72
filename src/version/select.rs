use crate::version::filename::{FilenameCodec, VersionedFilename};

/// Picks the newest valid versioned filename out of a listing.
///
/// Entries that do not match the grammar or fail to parse are dropped
/// silently; a directory is expected to contain unrelated files. Returns
/// `None` when nothing in the listing parses. The result depends only on the
/// set of valid entries, not on listing order.
pub fn select_newest<I, S>(entries: I, codec: &FilenameCodec) -> Option<VersionedFilename>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter(|name| codec.matches(name.as_ref()))
        .filter_map(|name| codec.parse(name.as_ref()).ok())
        .max_by_key(|version| version.timestamp)
}
