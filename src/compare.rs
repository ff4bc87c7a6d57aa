//! Classification of a deploy/rollback version pair.

use std::cmp::Ordering;
use std::fmt;

use crate::version::Version;

/// Outcome of comparing the deploy-side version against the rollback side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Neither side has a version.
    Missing,
    /// Only the deploy side has a version.
    MissingInRollback,
    /// Only the rollback side has a version.
    MissingInDeploy,
    /// Deploy is numerically greater.
    NewerInDeploy,
    /// Deploy is numerically lower.
    OlderInDeploy,
    /// Versions are equal.
    Same,
    /// Versions differ but cannot be ordered.
    Different,
}

impl Status {
    /// Every status, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Missing,
        Self::MissingInRollback,
        Self::MissingInDeploy,
        Self::NewerInDeploy,
        Self::OlderInDeploy,
        Self::Same,
        Self::Different,
    ];

    /// Name used on the console and in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "Missing",
            Self::MissingInRollback => "MissingInRollback",
            Self::MissingInDeploy => "MissingInDeploy",
            Self::NewerInDeploy => "NewerInDeploy",
            Self::OlderInDeploy => "OlderInDeploy",
            Self::Same => "Same",
            Self::Different => "Different",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a pair of optional versions. First matching rule wins.
#[must_use]
pub fn compare_versions(deploy: Option<&Version>, rollback: Option<&Version>) -> Status {
    match (deploy, rollback) {
        (None, None) => Status::Missing,
        (Some(_), None) => Status::MissingInRollback,
        (None, Some(_)) => Status::MissingInDeploy,
        (Some(d), Some(r)) => match d.ordering(r) {
            Some(Ordering::Greater) => Status::NewerInDeploy,
            Some(Ordering::Less) => Status::OlderInDeploy,
            Some(Ordering::Equal) => Status::Same,
            None if d.text_eq(r) => Status::Same,
            None => Status::Different,
        },
    }
}
