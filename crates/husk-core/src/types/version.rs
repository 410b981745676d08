//! Version and range types used by the resolver.
//!
//! Versions compare purely on their numeric `major.minor.patch` core. Parsing is
//! lenient: a component that is not a number parses as 0, so every string yields
//! a `Version` and ordering stays deterministic. Prerelease tags are kept only to
//! break ties (a release sorts above a prerelease with the same core).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement: alternatives separated by `||`, each a set of
/// comparators that must all match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub alternatives: Vec<Vec<Comparator>>,
    raw: String,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Tilde,     // ~1.0.0
    Caret,     // ^1.0.0
    Wildcard,  // *, latest
}

/// Partial version for comparisons (`1.x` leaves minor and patch open)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Unsupported version range: {input}")]
    Unsupported { input: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse leniently; non-numeric or missing components become 0
    pub fn parse_lenient(input: &str) -> Self {
        let input = input.trim();
        let input = input.strip_prefix('=').unwrap_or(input).trim_start();
        let input = input
            .strip_prefix('v')
            .or_else(|| input.strip_prefix('V'))
            .unwrap_or(input);

        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (input, None),
        };
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        let mut numbers = core_part.split('.').map(|part| part.trim().parse::<u64>().unwrap_or(0));

        Version {
            major: numbers.next().unwrap_or(0),
            minor: numbers.next().unwrap_or(0),
            patch: numbers.next().unwrap_or(0),
            prerelease,
            build,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(VersionError::InvalidFormat {
                input: s.to_string(),
            });
        }
        Ok(Version::parse_lenient(s))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core()
            .cmp(&other.core())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl VersionReq {
    /// Requirement that every version satisfies
    pub fn any() -> Self {
        VersionReq {
            alternatives: vec![vec![Comparator::wildcard()]],
            raw: "*".to_string(),
        }
    }

    /// Parse a version requirement string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();

        if is_protocol_spec(raw) {
            return Err(VersionError::Unsupported {
                input: raw.to_string(),
            });
        }

        let mut alternatives = Vec::new();
        for alternative in raw.split("||") {
            alternatives.push(parse_comparator_set(alternative.trim(), raw)?);
        }

        Ok(VersionReq {
            alternatives,
            raw: raw.to_string(),
        })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|set| set.iter().all(|comp| comp.matches(version)))
    }

    /// Original text of the requirement
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_protocol_spec(raw: &str) -> bool {
    raw.contains(':') || raw.contains('/')
}

fn parse_comparator_set(set: &str, raw: &str) -> Result<Vec<Comparator>, VersionError> {
    if set.is_empty() || set == "*" || set.eq_ignore_ascii_case("latest") || is_wildcard_part(set) {
        return Ok(vec![Comparator::wildcard()]);
    }

    // Hyphen range: 1.2.3 - 2.3.4
    if let Some((low, high)) = set.split_once(" - ") {
        let mut comparators = vec![Comparator::new(Op::GreaterEq, parse_partial(low.trim(), raw)?)];
        let high = high.trim();
        if !is_wildcard_part(high) {
            comparators.push(hyphen_upper_bound(parse_partial(high, raw)?));
        }
        return Ok(comparators);
    }

    // Re-attach operators separated from their version by whitespace (">= 1.2.0")
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;
    for token in set.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_op = Some(token.to_string());
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{}{}", op, token)),
            None => tokens.push(token.to_string()),
        }
    }

    tokens
        .iter()
        .map(|token| parse_comparator(token, raw))
        .collect()
}

fn parse_comparator(token: &str, raw: &str) -> Result<Comparator, VersionError> {
    let (op, version_str) = if let Some(stripped) = token.strip_prefix('^') {
        (Op::Caret, stripped)
    } else if let Some(stripped) = token.strip_prefix("~>") {
        (Op::Tilde, stripped)
    } else if let Some(stripped) = token.strip_prefix('~') {
        (Op::Tilde, stripped)
    } else if let Some(stripped) = token.strip_prefix(">=") {
        (Op::GreaterEq, stripped)
    } else if let Some(stripped) = token.strip_prefix("<=") {
        (Op::LessEq, stripped)
    } else if let Some(stripped) = token.strip_prefix('>') {
        (Op::Greater, stripped)
    } else if let Some(stripped) = token.strip_prefix('<') {
        (Op::Less, stripped)
    } else if let Some(stripped) = token.strip_prefix('=') {
        (Op::Exact, stripped)
    } else {
        (Op::Exact, token)
    };

    if op == Op::Exact && is_wildcard_part(version_str) {
        return Ok(Comparator::wildcard());
    }

    Ok(Comparator::new(op, parse_partial(version_str, raw)?))
}

/// `- 1.4.2` includes 1.4.2; a partial `- 1.4` covers all of 1.4.x, i.e. `<1.5.0`
fn hyphen_upper_bound(high: PartialVersion) -> Comparator {
    let bumped = |major: u64, minor: Option<u64>| PartialVersion {
        major,
        minor,
        patch: Some(0),
        prerelease: None,
    };
    match (high.minor, high.patch) {
        (None, _) => Comparator::new(Op::Less, bumped(high.major + 1, Some(0))),
        (Some(minor), None) => Comparator::new(Op::Less, bumped(high.major, Some(minor + 1))),
        (Some(_), Some(_)) => Comparator::new(Op::LessEq, high),
    }
}

fn is_wildcard_part(part: &str) -> bool {
    matches!(part, "*" | "x" | "X")
}

fn parse_partial(input: &str, raw: &str) -> Result<PartialVersion, VersionError> {
    let input = input.trim();
    let input = input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input);

    // Dist-tags other than `latest` and free text are not ranges
    if !input.starts_with(|c: char| c.is_ascii_digit() || is_wildcard_part(&c.to_string())) {
        return Err(VersionError::Unsupported {
            input: raw.to_string(),
        });
    }

    let without_build = input.split_once('+').map_or(input, |(v, _)| v);
    let (core_part, prerelease) = match without_build.split_once('-') {
        Some((c, p)) => (c, Some(p.to_string())),
        None => (without_build, None),
    };

    let mut parts = core_part.split('.');
    let mut component = || -> Option<u64> {
        match parts.next() {
            None => None,
            Some(part) if is_wildcard_part(part) => None,
            Some(part) => Some(part.parse().unwrap_or(0)),
        }
    };

    let major = component().unwrap_or(0);
    let minor = component();
    let patch = if minor.is_some() { component() } else { None };

    Ok(PartialVersion {
        major,
        minor,
        patch,
        prerelease,
    })
}

impl Comparator {
    fn new(op: Op, version: PartialVersion) -> Self {
        Self { op, version }
    }

    fn wildcard() -> Self {
        Self {
            op: Op::Wildcard,
            version: PartialVersion {
                major: 0,
                minor: None,
                patch: None,
                prerelease: None,
            },
        }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact => self.version.matches_exact(version),
            Op::Wildcard => true,
            Op::Greater => version.core() > self.version.core(),
            Op::GreaterEq => version.core() >= self.version.core(),
            Op::Less => version.core() < self.version.core(),
            Op::LessEq => version.core() <= self.version.core(),
            Op::Tilde => self.version.matches_tilde(version),
            Op::Caret => self.version.matches_caret(version),
        }
    }
}

impl PartialVersion {
    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }

    fn matches_exact(&self, version: &Version) -> bool {
        version.major == self.major
            && self.minor.map_or(true, |m| version.minor == m)
            && self.patch.map_or(true, |p| version.patch == p)
            && (self.prerelease.is_none() || version.prerelease == self.prerelease)
    }

    /// ~1.2.3 allows >=1.2.3 <1.3.0
    fn matches_tilde(&self, version: &Version) -> bool {
        if version.major != self.major {
            return false;
        }

        match self.minor {
            Some(minor) => version.minor == minor && version.patch >= self.patch.unwrap_or(0),
            None => true,
        }
    }

    /// ^1.2.3 allows >=1.2.3 <2.0.0
    fn matches_caret(&self, version: &Version) -> bool {
        version.major == self.major && version.core() >= self.core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse_lenient(s)
    }

    fn req(s: &str) -> VersionReq {
        VersionReq::parse(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let version = v("1.2.3");
        assert_eq!(version, Version::new(1, 2, 3));

        let prefixed = v("v4.17.21");
        assert_eq!(prefixed, Version::new(4, 17, 21));
    }

    #[test]
    fn test_non_numeric_components_parse_as_zero() {
        assert_eq!(v("1.x.3").minor, 0);
        assert_eq!(v("banana"), Version::new(0, 0, 0));
        assert_eq!(v("2"), Version::new(2, 0, 0));
    }

    #[test]
    fn test_version_with_prerelease_and_build() {
        let version = v("1.2.3-alpha.1+build.5");
        assert_eq!(version.prerelease, Some("alpha.1".to_string()));
        assert_eq!(version.build, Some("build.5".to_string()));
        assert_eq!(version.to_string(), "1.2.3-alpha.1+build.5");
    }

    #[test]
    fn test_version_comparison() {
        assert!(v("1.0.0") < v("2.0.0"));
        assert!(v("1.0.0") < v("1.1.0"));
        assert!(v("1.1.0") < v("2.0.0"));
        assert!(v("1.10.0") > v("1.9.9"));
        // A release outranks a prerelease with the same core
        assert!(v("2.0.0-rc.1") < v("2.0.0"));
    }

    #[test]
    fn test_version_serde_as_string() {
        let json = serde_json::to_string(&v("1.2.3")).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3"));
    }

    #[test]
    fn test_version_req_exact() {
        let r = req("1.2.3");
        assert!(r.matches(&v("1.2.3")));
        assert!(!r.matches(&v("1.2.4")));
    }

    #[test]
    fn test_version_req_wildcard() {
        for input in ["*", "latest", "", "x"] {
            let r = req(input);
            assert!(r.matches(&v("1.2.3")));
            assert!(r.matches(&v("999.999.999")));
        }
    }

    #[test]
    fn test_version_req_caret() {
        let r = req("^4.17.0");
        assert!(r.matches(&v("4.17.21")));
        assert!(r.matches(&v("4.18.0")));
        assert!(!r.matches(&v("5.0.0")));
        assert!(!r.matches(&v("4.16.9")));
    }

    #[test]
    fn test_version_req_tilde() {
        let r = req("~1.2.3");
        assert!(r.matches(&v("1.2.3")));
        assert!(r.matches(&v("1.2.9")));
        assert!(!r.matches(&v("1.3.0")));
        assert!(!r.matches(&v("1.2.2")));
    }

    #[test]
    fn test_version_req_operators() {
        assert!(!req(">1.2.3").matches(&v("1.2.3")));
        assert!(req(">1.2.3").matches(&v("1.2.4")));
        assert!(req(">=1.2.3").matches(&v("1.2.3")));
        assert!(req("<1.2.4").matches(&v("1.2.3")));
        assert!(!req("<1.2.4").matches(&v("1.3.0")));
        assert!(req("<=1.2.4").matches(&v("1.2.4")));
    }

    #[test]
    fn test_version_req_sets_and_alternatives() {
        let r = req(">=1.2.0 <2.0.0");
        assert!(r.matches(&v("1.5.0")));
        assert!(!r.matches(&v("2.0.0")));

        let spaced = req(">= 1.2.0 < 2.0.0");
        assert!(spaced.matches(&v("1.2.0")));

        let r = req("^1.0.0 || ^3.0.0");
        assert!(r.matches(&v("1.4.0")));
        assert!(!r.matches(&v("2.0.0")));
        assert!(r.matches(&v("3.1.0")));

        let hyphen = req("1.2.0 - 1.4.0");
        assert!(hyphen.matches(&v("1.4.0")));
        assert!(!hyphen.matches(&v("1.4.1")));
    }

    #[test]
    fn test_hyphen_range_partial_upper_bound() {
        let minor = req("1.2.0 - 1.4");
        assert!(minor.matches(&v("1.4.5")));
        assert!(!minor.matches(&v("1.5.0")));
        assert!(!minor.matches(&v("1.1.9")));

        let major = req("1.2.0 - 2");
        assert!(major.matches(&v("2.9.9")));
        assert!(!major.matches(&v("3.0.0")));

        let open = req("1.2.0 - *");
        assert!(open.matches(&v("9.0.0")));
        assert!(!open.matches(&v("1.1.0")));
    }

    #[test]
    fn test_version_req_x_ranges() {
        let r = req("1.x");
        assert!(r.matches(&v("1.0.0")));
        assert!(r.matches(&v("1.9.3")));
        assert!(!r.matches(&v("2.0.0")));

        let r = req("1.2.x");
        assert!(r.matches(&v("1.2.7")));
        assert!(!r.matches(&v("1.3.0")));
    }

    #[test]
    fn test_unsupported_ranges() {
        assert!(VersionReq::parse("github:user/repo").is_err());
        assert!(VersionReq::parse("file:../local").is_err());
        assert!(VersionReq::parse("next").is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_display_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
        ) {
            let original = Version::new(major, minor, patch);
            let parsed = Version::parse_lenient(&original.to_string());
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn version_comparison_transitivity(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
            c in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let a = Version::new(a.0, a.1, a.2);
            let b = Version::new(b.0, b.1, b.2);
            let c = Version::new(c.0, c.1, c.2);

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {}", a, b, c);
            }
        }

        #[test]
        fn caret_agrees_with_numeric_ordering(
            base in (0u64..20, 0u64..20, 0u64..20),
            candidate in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let base_version = Version::new(base.0, base.1, base.2);
            let candidate_version = Version::new(candidate.0, candidate.1, candidate.2);
            let r = VersionReq::parse(&format!("^{}", base_version)).unwrap();

            let expected = candidate.0 == base.0 && candidate_version >= base_version;
            prop_assert_eq!(r.matches(&candidate_version), expected);
            // Same inputs, same answer
            prop_assert_eq!(r.matches(&candidate_version), candidate_version.satisfies(&r));
        }
    }
}
