use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// An error parsing a game version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionError(String);

impl std::error::Error for VersionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid game version: {}", self.0)
    }
}

/// A dotted game version of up to four numeric parts (`2.0.4`).
///
/// Versions remember how many parts were written so that a bound like `2.0`
/// can cover every `2.0.x` release. Missing parts compare as zero, so `2.0`
/// and `2.0.0` are equal.
///
/// ```
/// use rome_loader::GameVersion;
/// let max = GameVersion::parse("2.0").unwrap();
/// assert!(max.is_largerish_than(&GameVersion::parse("2.0.4").unwrap()));
/// assert!(!max.is_largerish_than(&GameVersion::parse("2.1").unwrap()));
/// ```
#[derive(Clone, Copy)]
pub struct GameVersion {
    parts: [u32; 4],
    precision: usize,
}

impl GameVersion {
    /// Create a version from its major, minor, and patch parts
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        GameVersion {
            parts: [major, minor, patch, 0],
            precision: 3,
        }
    }

    /// Parse a dotted version. A leading `v` is accepted.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionError(s.to_string()));
        }

        let mut parts = [0u32; 4];
        let mut precision = 0;
        for part in trimmed.split('.') {
            let slot = parts
                .get_mut(precision)
                .ok_or_else(|| VersionError(s.to_string()))?;
            *slot = part.parse().map_err(|_| VersionError(s.to_string()))?;
            precision += 1;
        }

        Ok(GameVersion { parts, precision })
    }

    /// The written parts of the version
    pub fn parts(&self) -> &[u32] {
        &self.parts[..self.precision]
    }

    /// Returns true if this version is at least `other` when compared only
    /// at this version's own precision. Used for maximum bounds.
    pub fn is_largerish_than(&self, other: &GameVersion) -> bool {
        for (ours, theirs) in self.parts().iter().zip(other.parts.iter()) {
            match ours.cmp(theirs) {
                Ordering::Greater => return true,
                Ordering::Less => return false,
                Ordering::Equal => {}
            }
        }
        true
    }
}

impl PartialEq for GameVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for GameVersion {}

impl Hash for GameVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl PartialOrd for GameVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl FromStr for GameVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameVersion::parse(s)
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts().iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl fmt::Debug for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameVersion {}", self)
    }
}

#[cfg(feature = "derive")]
impl<'de> serde::Deserialize<'de> for GameVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        GameVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("2.0.4", &[2, 0, 4])]
    #[case("1.5", &[1, 5])]
    #[case("v2.0.3.1", &[2, 0, 3, 1])]
    #[case(" 7 ", &[7])]
    fn test_version_parse(#[case] input: &str, #[case] parts: &[u32]) {
        assert_eq!(GameVersion::parse(input).unwrap().parts(), parts);
    }

    #[rstest]
    #[case("")]
    #[case("2..1")]
    #[case("1.2.3.4.5")]
    #[case("2.x")]
    fn test_version_parse_invalid(#[case] input: &str) {
        assert!(GameVersion::parse(input).is_err());
    }

    #[rstest]
    #[case("2.0", "2.0.4", true)]
    #[case("2.0", "2.0", true)]
    #[case("2.0", "2.1.0", false)]
    #[case("2.0.4", "2.0.3", true)]
    #[case("2.0.4", "2.0.5", false)]
    #[case("3", "2.9.9", true)]
    fn test_largerish(#[case] max: &str, #[case] found: &str, #[case] expected: bool) {
        let max = GameVersion::parse(max).unwrap();
        let found = GameVersion::parse(found).unwrap();
        assert_eq!(max.is_largerish_than(&found), expected);
    }

    #[test]
    fn test_version_order() {
        let min = GameVersion::parse("1.5").unwrap();
        assert!(GameVersion::parse("1.4.9").unwrap() < min);
        assert!(GameVersion::parse("1.5.0").unwrap() >= min);
        assert_eq!(min.to_string(), "1.5");
    }

    #[rstest]
    #[case("2.0", "2.0.0")]
    #[case("2", "2.0.0.0")]
    #[case("v1.5", "1.5.0")]
    fn test_missing_parts_are_zero(#[case] short: &str, #[case] long: &str) {
        let short = GameVersion::parse(short).unwrap();
        let long = GameVersion::parse(long).unwrap();
        assert_eq!(short, long);
        assert_eq!(short.cmp(&long), Ordering::Equal);
        assert!(short >= long && long >= short);
        assert_ne!(short.to_string(), long.to_string());
    }
}
