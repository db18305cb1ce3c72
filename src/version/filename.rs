use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

/// Fixed archive format marker carried by every versioned filename.
pub const ARCHIVE_EXTENSION: &str = "7z";

/// Timestamp layout embedded in the filename: day_month_year_hour_minute_second,
/// two-digit year, no timezone.
pub const TIMESTAMP_FORMAT: &str = "%d_%m_%y_%H_%M_%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("name does not start with prefix '{0}'")]
    PrefixMismatch(String),

    #[error("no platform suffix found in '{0}'")]
    MissingSuffix(String),

    #[error("malformed timestamp field '{0}'")]
    BadTimestamp(String),
}

/// A parsed archive filename of the form `prefix_DD_MM_YY_HH_MM_SS_platformTag.7z`.
///
/// The filename string itself is the only persisted form of a version; this
/// struct is immutable once constructed, either by parsing a listing entry or
/// by stamping a fresh timestamp at pack time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedFilename {
    pub prefix: String,
    pub timestamp: NaiveDateTime,
    pub platform_tag: String,
}

impl VersionedFilename {
    /// Canonical string form of this version.
    pub fn name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.prefix,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.platform_tag,
            ARCHIVE_EXTENSION
        )
    }
}

impl fmt::Display for VersionedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trailing `_{letters}.7z` pattern, anchored at the end of the name.
fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"_[A-Za-z]+\.{ARCHIVE_EXTENSION}$")).unwrap())
}

/// Parses and formats versioned archive filenames for one fixed prefix.
///
/// The platform suffix has variable length, so parsing locates it by pattern
/// match from the end of the name before slicing the timestamp field out of
/// the middle; suffix detection must happen first.
#[derive(Debug, Clone)]
pub struct FilenameCodec {
    prefix: String,
    grammar: Regex,
}

impl FilenameCodec {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let grammar = Regex::new(&format!(
            r"^{}_\d{{1,2}}_\d{{1,2}}_\d{{1,2}}_\d{{1,2}}_\d{{1,2}}_\d{{1,2}}_[A-Za-z]+\.{}$",
            regex::escape(&prefix),
            ARCHIVE_EXTENSION
        ))
        .expect("filename grammar regex is valid for any escaped prefix");
        Self { prefix, grammar }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True iff `name` matches the full filename grammar for this prefix,
    /// from the start of the string through the archive extension.
    pub fn matches(&self, name: &str) -> bool {
        self.grammar.is_match(name)
    }

    /// The trailing `_{platformTag}.7z` substring of `name`, or the empty
    /// string when no such suffix exists.
    pub fn extract_suffix(name: &str) -> &str {
        suffix_regex()
            .find(name)
            .map(|m| m.as_str())
            .unwrap_or_default()
    }

    /// Parses the timestamp field out of `name`. The prefix is stripped from
    /// the front and the detected suffix from the back; the remainder must
    /// match [`TIMESTAMP_FORMAT`] exactly.
    pub fn parse_timestamp(&self, name: &str) -> Result<NaiveDateTime, ParseError> {
        let rest = name
            .strip_prefix(&self.prefix)
            .and_then(|r| r.strip_prefix('_'))
            .ok_or_else(|| ParseError::PrefixMismatch(self.prefix.clone()))?;

        let suffix = Self::extract_suffix(name);
        if suffix.is_empty() {
            return Err(ParseError::MissingSuffix(name.to_string()));
        }
        // The suffix may overlap what was stripped from the front when the
        // name is too short to hold a timestamp at all.
        let field = rest
            .len()
            .checked_sub(suffix.len())
            .map(|end| &rest[..end])
            .ok_or_else(|| ParseError::BadTimestamp(rest.to_string()))?;

        NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT)
            .map_err(|_| ParseError::BadTimestamp(field.to_string()))
    }

    /// Parses a full listing entry into a [`VersionedFilename`].
    pub fn parse(&self, name: &str) -> Result<VersionedFilename, ParseError> {
        let timestamp = self.parse_timestamp(name)?;
        let suffix = Self::extract_suffix(name);
        let platform_tag = suffix
            .trim_start_matches('_')
            .trim_end_matches(&format!(".{ARCHIVE_EXTENSION}"))
            .to_string();
        Ok(VersionedFilename {
            prefix: self.prefix.clone(),
            timestamp,
            platform_tag,
        })
    }

    /// Builds the canonical version for `timestamp` and `platform_tag`.
    pub fn stamp(&self, timestamp: NaiveDateTime, platform_tag: &str) -> VersionedFilename {
        VersionedFilename {
            prefix: self.prefix.clone(),
            timestamp,
            platform_tag: platform_tag.to_string(),
        }
    }
}
