//! Module version values.
//!
//! A version is either a structured `major.minor[.build[.revision]]` tuple,
//! which has a total order, or an opaque string that could not be parsed and
//! only supports case-insensitive equality.

use std::cmp::Ordering;
use std::fmt;

/// A numeric `major.minor[.build[.revision]]` version.
///
/// An undefined trailing component orders below zero, so `1.2 < 1.2.0`.
/// Field order matters: the derived `Ord` compares fields top to bottom and
/// `None < Some(_)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructuredVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Build component, if present.
    pub build: Option<u32>,
    /// Revision component, if present. Only set when `build` is set.
    pub revision: Option<u32>,
}

impl StructuredVersion {
    /// Builds a full four-part version.
    #[must_use]
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self { major, minor, build: Some(build), revision: Some(revision) }
    }

    /// Parses `major.minor[.build[.revision]]`.
    ///
    /// Each component must be a non-negative decimal that fits in an `i32`.
    /// Surrounding whitespace is ignored; anything else (suffixes, commas,
    /// more than four parts) is rejected.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let parts = text
            .trim()
            .split('.')
            .map(parse_component)
            .collect::<Option<Vec<u32>>>()?;
        match parts.as_slice() {
            [major, minor] => {
                Some(Self { major: *major, minor: *minor, build: None, revision: None })
            }
            [major, minor, build] => {
                Some(Self { major: *major, minor: *minor, build: Some(*build), revision: None })
            }
            [major, minor, build, revision] => Some(Self::new(*major, *minor, *build, *revision)),
            _ => None,
        }
    }
}

fn parse_component(part: &str) -> Option<u32> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<u32>().ok().filter(|n| i32::try_from(*n).is_ok())
}

impl fmt::Display for StructuredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

/// A version read from a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// Parsed numeric version; totally ordered.
    Structured(StructuredVersion),
    /// Raw version string that did not parse; equality only.
    Opaque(String),
}

impl Version {
    /// Parses `text` as a structured version, falling back to an opaque
    /// value holding the trimmed text. Returns `None` for blank input.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match StructuredVersion::parse(trimmed) {
            Some(v) => Self::Structured(v),
            None => Self::Opaque(trimmed.to_string()),
        })
    }

    /// Numeric ordering when both sides are structured, `None` otherwise.
    #[must_use]
    pub fn ordering(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Structured(a), Self::Structured(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Case-insensitive comparison of the string forms.
    #[must_use]
    pub fn text_eq(&self, other: &Self) -> bool {
        self.to_string().to_lowercase() == other.to_string().to_lowercase()
    }
}

impl From<StructuredVersion> for Version {
    fn from(v: StructuredVersion) -> Self {
        Self::Structured(v)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(v) => fmt::Display::fmt(v, f),
            Self::Opaque(s) => f.write_str(s),
        }
    }
}
