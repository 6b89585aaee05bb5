use std::{cmp::Ordering, fmt::Display, str::FromStr};

use thiserror::Error;

pub type VersionResult<T> = std::result::Result<T, VersionError>;

#[derive(Error, Debug, PartialEq)]
pub enum VersionError {
    #[error("invalid version {0:?}, expected format like '1.31.0'")]
    Invalid(String),

    #[error("unsupported version operator {0:?}")]
    Operator(String),
}

/// A `major.minor.patch` version. Missing components count as zero, a leading
/// `v` as well as pre-release and build suffixes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::Invalid(s.to_string());

        let trimmed = s.trim();
        let clean = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let clean = clean.split(['-', '+']).next().unwrap_or_default();
        if clean.is_empty() {
            return Err(invalid());
        }

        let parts = clean
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<VersionResult<Vec<_>>>()?;

        match parts[..] {
            [major] => Ok(Self {
                major,
                minor: 0,
                patch: 0,
            }),
            [major, minor] => Ok(Self {
                major,
                minor,
                patch: 0,
            }),
            [major, minor, patch] => Ok(Self {
                major,
                minor,
                patch,
            }),
            _ => Err(invalid()),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compares `version` against `constraint` with the given operator, e.g.
/// `compare_versions("1.16.4", "<", "1.17")`.
pub fn compare_versions(version: &str, operator: &str, constraint: &str) -> VersionResult<bool> {
    let ordering = version
        .parse::<Version>()?
        .cmp(&constraint.parse::<Version>()?);

    Ok(match operator {
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        "=" | "==" => ordering == Ordering::Equal,
        "!=" => ordering != Ordering::Equal,
        op => return Err(VersionError::Operator(op.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!(
            Version {
                major: 1,
                minor: 31,
                patch: 0
            },
            "1.31".parse().unwrap()
        );
        assert_eq!(
            Version {
                major: 1,
                minor: 18,
                patch: 3
            },
            "v1.18.3".parse().unwrap()
        );
        assert_eq!(
            Version {
                major: 1,
                minor: 20,
                patch: 1
            },
            "1.20.1-rc.0+build".parse().unwrap()
        );
        assert_eq!("1.2.3", "1.2.3".parse::<Version>().unwrap().to_string());
    }

    #[test]
    fn rejects_invalid_versions() {
        for version in ["", "v", "1.x", "1.2.3.4", "latest", "1..2"] {
            assert_eq!(
                Err(VersionError::Invalid(version.to_string())),
                version.parse::<Version>(),
                "{version}"
            );
        }
    }

    #[test]
    fn compares_against_constraints() {
        assert!(compare_versions("1.16", "<", "1.17").unwrap());
        assert!(compare_versions("1.16.15", "<", "1.17").unwrap());
        assert!(!compare_versions("1.17.0", "<", "1.17").unwrap());
        assert!(!compare_versions("1.18", "<", "1.17").unwrap());
        assert!(compare_versions("1.11.2", "<", "1.12").unwrap());
        assert!(compare_versions("1.19.0", ">=", "1.19").unwrap());
        assert!(compare_versions("1.19", "=", "1.19.0").unwrap());
        assert!(compare_versions("1.19", "!=", "1.20").unwrap());
        assert!(compare_versions("1.19", "<=", "1.19").unwrap());
        assert!(compare_versions("1.20", ">", "1.19.9").unwrap());
    }

    #[test]
    fn compare_propagates_errors() {
        assert_eq!(
            Err(VersionError::Operator("~".into())),
            compare_versions("1.19", "~", "1.19")
        );
        assert_eq!(
            Err(VersionError::Invalid("one".into())),
            compare_versions("one", "<", "1.19")
        );
    }
}
