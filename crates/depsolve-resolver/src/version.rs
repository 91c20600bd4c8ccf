//! Version model: pinned versions, version specifiers, search ordering,
//! satisfaction and intersection.
//!
//! Numeric specifiers follow semantic-version rules:
//! - `== v` admits exactly `v`
//! - `>= v` admits everything at or above `v`
//! - `~> v` admits everything at or above `v` on the same major line
//!   (or the same minor line while the major version is 0)
//! - pre-releases only satisfy `>=` and `~>` when they share
//!   major.minor.patch with the requirement
//!
//! A version that does not parse as a semantic version (a commit hash, a
//! branch head) satisfies no numeric specifier, only a git reference.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::SpecifierParseError;

/// An exact, already-selected version: a tag such as `1.4.2` or `v2.0`, or
/// an opaque revision such as a commit hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedVersion(String);

impl PinnedVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The semantic version this token spells, if any.
    pub fn semantic(&self) -> Option<Version> {
        parse_semantic(&self.0)
    }
}

impl fmt::Display for PinnedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PinnedVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PinnedVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lenient semantic-version parsing.
///
/// Accepts a leading `v`/`V` and pads a missing minor or patch component,
/// so `v2` and `1.4` parse as `2.0.0` and `1.4.0`.
pub fn parse_semantic(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let s = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    let split = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 2
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).ok()
}

/// A [`PinnedVersion`] together with its parsed semantic version, which
/// determines the order candidates are tried in.
///
/// Equality (and hashing) only looks at the pinned version.
#[derive(Debug, Clone)]
pub struct ConcreteVersion {
    pinned: PinnedVersion,
    semantic: Option<Version>,
}

impl ConcreteVersion {
    pub fn new(pinned: PinnedVersion) -> Self {
        let semantic = pinned.semantic();
        Self { pinned, semantic }
    }

    pub fn pinned(&self) -> &PinnedVersion {
        &self.pinned
    }

    pub fn semantic(&self) -> Option<&Version> {
        self.semantic.as_ref()
    }
}

impl PartialEq for ConcreteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.pinned == other.pinned
    }
}

impl Eq for ConcreteVersion {}

impl std::hash::Hash for ConcreteVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.pinned.hash(state);
    }
}

impl fmt::Display for ConcreteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pinned.fmt(f)
    }
}

impl From<PinnedVersion> for ConcreteVersion {
    fn from(pinned: PinnedVersion) -> Self {
        Self::new(pinned)
    }
}

/// Search order between two candidates: `Less` means `a` is tried first.
///
/// Semantic versions come newest-first; versions without a semantic reading
/// come after all of them and compare `Equal` among themselves, so a stable
/// insert keeps them in discovery order.
pub fn compare(a: &ConcreteVersion, b: &ConcreteVersion) -> Ordering {
    match (&a.semantic, &b.semantic) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A constraint on the versions of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionSpecifier {
    Any,
    AtLeast(Version),
    CompatibleWith(Version),
    Exactly(Version),
    /// A branch, tag or commit, resolved by the provider.
    GitReference(String),
}

impl VersionSpecifier {
    /// Whether `version` is acceptable under this specifier.
    pub fn is_satisfied_by(&self, version: &PinnedVersion) -> bool {
        self.is_satisfied_by_concrete(&ConcreteVersion::new(version.clone()))
    }

    /// Same as [`is_satisfied_by`](Self::is_satisfied_by) without re-parsing.
    ///
    /// A reference accepts the identical token or a commit (any version
    /// without a semantic reading). Numeric specifiers only accept semantic
    /// versions.
    pub fn is_satisfied_by_concrete(&self, version: &ConcreteVersion) -> bool {
        match (self, version.semantic()) {
            (Self::Any, _) => true,
            (Self::GitReference(reference), semantic) => {
                semantic.is_none() || version.pinned().as_str() == reference
            }
            (_, None) => false,
            (_, Some(semantic)) => self.admits(semantic),
        }
    }

    /// Numeric admission check for a parsed version.
    fn admits(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::GitReference(_) => false,
            Self::Exactly(req) => version == req,
            Self::AtLeast(req) => version >= req && prerelease_allowed(version, req),
            Self::CompatibleWith(req) => {
                version >= req
                    && prerelease_allowed(version, req)
                    && caret_line(version) == caret_line(req)
            }
        }
    }
}

fn prerelease_allowed(version: &Version, req: &Version) -> bool {
    version.pre.is_empty()
        || (version.major, version.minor, version.patch) == (req.major, req.minor, req.patch)
}

/// The range a caret requirement stays within: the major version, or the
/// minor version while major is 0.
fn caret_line(v: &Version) -> (u64, u64) {
    if v.major == 0 {
        (0, v.minor)
    } else {
        (v.major, 0)
    }
}

/// The specifier admitting exactly what both `lhs` and `rhs` admit, or
/// `None` when nothing can satisfy both.
///
/// A git reference only overlaps with the identical reference (or `Any`).
pub fn intersection(lhs: &VersionSpecifier, rhs: &VersionSpecifier) -> Option<VersionSpecifier> {
    use VersionSpecifier::*;

    match (lhs, rhs) {
        (Any, other) | (other, Any) => Some(other.clone()),
        (GitReference(a), GitReference(b)) => (a == b).then(|| lhs.clone()),
        (GitReference(_), _) | (_, GitReference(_)) => None,
        (AtLeast(a), AtLeast(b)) => Some(AtLeast(a.max(b).clone())),
        (AtLeast(a), CompatibleWith(b)) | (CompatibleWith(b), AtLeast(a)) => {
            match caret_line(a).cmp(&caret_line(b)) {
                Ordering::Less => Some(CompatibleWith(b.clone())),
                Ordering::Equal => Some(CompatibleWith(a.max(b).clone())),
                Ordering::Greater => None,
            }
        }
        (CompatibleWith(a), CompatibleWith(b)) => {
            (caret_line(a) == caret_line(b)).then(|| CompatibleWith(a.max(b).clone()))
        }
        (AtLeast(_), Exactly(v)) | (Exactly(v), AtLeast(_)) => {
            let bound = if matches!(lhs, AtLeast(_)) { lhs } else { rhs };
            bound.admits(v).then(|| Exactly(v.clone()))
        }
        (CompatibleWith(_), Exactly(v)) | (Exactly(v), CompatibleWith(_)) => {
            let bound = if matches!(lhs, CompatibleWith(_)) { lhs } else { rhs };
            bound.admits(v).then(|| Exactly(v.clone()))
        }
        (Exactly(a), Exactly(b)) => (a == b).then(|| lhs.clone()),
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::AtLeast(v) => write!(f, ">= {v}"),
            Self::CompatibleWith(v) => write!(f, "~> {v}"),
            Self::Exactly(v) => write!(f, "== {v}"),
            Self::GitReference(r) => write!(f, "\"{r}\""),
        }
    }
}

impl FromStr for VersionSpecifier {
    type Err = SpecifierParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::Any);
        }

        let invalid = |reason: &str| SpecifierParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some(rest) = s.strip_prefix('"') {
            let reference = rest
                .strip_suffix('"')
                .ok_or_else(|| invalid("unterminated git reference"))?;
            if reference.is_empty() {
                return Err(invalid("empty git reference"));
            }
            return Ok(Self::GitReference(reference.to_string()));
        }

        let (make, rest): (fn(Version) -> Self, &str) = if let Some(rest) = s.strip_prefix("==") {
            (Self::Exactly, rest)
        } else if let Some(rest) = s.strip_prefix(">=") {
            (Self::AtLeast, rest)
        } else if let Some(rest) = s.strip_prefix("~>") {
            (Self::CompatibleWith, rest)
        } else {
            return Err(invalid("expected one of `==`, `>=`, `~>`, `*` or a quoted reference"));
        };

        let version =
            parse_semantic(rest).ok_or_else(|| invalid("operand is not a semantic version"))?;
        Ok(make(version))
    }
}

impl TryFrom<String> for VersionSpecifier {
    type Error = SpecifierParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VersionSpecifier> for String {
    fn from(spec: VersionSpecifier) -> Self {
        spec.to_string()
    }
}
