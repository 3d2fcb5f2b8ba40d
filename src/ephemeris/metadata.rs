use crate::time_point::TimePoint;

/// Descriptive metadata of an XEPH file.
///
/// Empty strings mean "not set". When serializing, an unset
/// `creation_time`, `creator_os` or `creator_application` is filled in
/// automatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EphemerisMetadata {
    /// The date this file was created.
    pub creation_time: Option<TimePoint>,
    /// The operating system on which this file was created.
    pub creator_os: String,
    /// The software application or program that created this file.
    pub creator_application: String,
    pub title: String,
    /// A brief (single-line) description.
    pub brief_description: String,
    pub description: String,
    /// The organization responsible for this file.
    pub organization_name: String,
    pub authors: String,
    pub copyright: String,
}
