pub mod filename;
pub mod select;

pub use filename::{FilenameCodec, ParseError, VersionedFilename};
pub use select::select_newest;
