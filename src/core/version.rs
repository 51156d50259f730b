//! Release version validation

use crate::core::error::ReleaseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Major and minor components every release must carry
///
/// Only the patch component moves between releases; the pattern a version
/// must match is `<major>.<minor>.<patch>` with the first two pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    pub major: u64,
    pub minor: u64,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self { major: 4, minor: 0 }
    }
}

impl VersionPolicy {
    /// Regex a release version must match; the patch is captured
    pub fn pattern(&self) -> String {
        format!(r"^{}\.{}\.(0|[1-9][0-9]*)$", self.major, self.minor)
    }

    /// Human-readable form of the expected pattern
    pub fn describe(&self) -> String {
        format!("{}.{}.<patch>", self.major, self.minor)
    }
}

/// A version accepted for release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl ReleaseVersion {
    /// Validate `input` against the policy
    pub fn parse(input: &str, policy: &VersionPolicy) -> Result<Self, ReleaseError> {
        let invalid = || ReleaseError::InvalidVersion {
            input: input.to_string(),
            expected: policy.describe(),
        };

        let regex = Regex::new(&policy.pattern()).map_err(|_| invalid())?;
        let captures = regex.captures(input).ok_or_else(invalid)?;
        let patch = captures[1].parse::<u64>().map_err(|_| invalid())?;

        Ok(Self {
            major: policy.major,
            minor: policy.minor,
            patch,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
