//! Three-component compatibility versions (`major.minor.micro`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compatibility version requested by an adapter caller.
///
/// Ordering is lexicographic over `(major, minor, micro)`, which matches the
/// ordering of [`CompatibilityVersion::int_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompatibilityVersion {
    major: u16,
    minor: u16,
    micro: u16,
}

impl CompatibilityVersion {
    pub const fn new(major: u16, minor: u16, micro: u16) -> Self {
        Self { major, minor, micro }
    }

    pub const fn major(&self) -> u16 {
        self.major
    }

    pub const fn minor(&self) -> u16 {
        self.minor
    }

    pub const fn micro(&self) -> u16 {
        self.micro
    }

    /// Packed integer form, e.g. `2.3.21` becomes `2_003_021`.
    pub const fn int_value(&self) -> u32 {
        self.major as u32 * 1_000_000 + self.minor as u32 * 1_000 + self.micro as u32
    }
}

impl fmt::Display for CompatibilityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

/// Error returned when a version string is not `major.minor[.micro]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid compatibility version '{input}': {reason}")]
pub struct ParseVersionError {
    pub input: String,
    pub reason: String,
}

impl FromStr for CompatibilityVersion {
    type Err = ParseVersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ParseVersionError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut components = [0u16; 3];
        let mut count = 0;
        for part in trimmed.split('.') {
            if count == components.len() {
                return Err(invalid("expected at most three components"));
            }
            components[count] = part
                .parse::<u16>()
                .map_err(|error| invalid(&format!("component '{part}' is not a number ({error})")))?;
            count += 1;
        }
        if count < 2 {
            return Err(invalid("expected at least major and minor components"));
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }
}

impl TryFrom<String> for CompatibilityVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompatibilityVersion> for String {
    fn from(version: CompatibilityVersion) -> Self {
        version.to_string()
    }
}
