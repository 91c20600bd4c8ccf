use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a dependency's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencySource {
    /// A GitHub repository given as `owner/name`.
    GitHub { repository: String },
    /// Any Git remote.
    Git { url: String },
    /// A binary-only distribution described by a JSON specification.
    Binary { url: String },
}

impl DependencySource {
    /// The location string (repository path or URL).
    pub fn location(&self) -> &str {
        match self {
            Self::GitHub { repository } => repository,
            Self::Git { url } | Self::Binary { url } => url,
        }
    }
}

impl fmt::Display for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub { repository } => write!(f, "github \"{repository}\""),
            Self::Git { url } => write!(f, "git \"{url}\""),
            Self::Binary { url } => write!(f, "binary \"{url}\""),
        }
    }
}

/// Identity of a dependency: a name plus the location it is fetched from.
///
/// Two dependencies are the same only if both name and source match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub source: DependencySource,
}

impl Dependency {
    /// A dependency named after the last component of its source location.
    pub fn new(source: DependencySource) -> Self {
        Self {
            name: name_from_location(source.location()),
            source,
        }
    }

    /// Shorthand for a GitHub `owner/name` repository.
    pub fn github(repository: impl Into<String>) -> Self {
        Self::new(DependencySource::GitHub {
            repository: repository.into(),
        })
    }

    /// Shorthand for a plain Git remote.
    pub fn git(url: impl Into<String>) -> Self {
        Self::new(DependencySource::Git { url: url.into() })
    }

    /// Shorthand for a binary-only dependency.
    pub fn binary(url: impl Into<String>) -> Self {
        Self::new(DependencySource::Binary { url: url.into() })
    }

    /// Override the derived name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Last path component of a location, without a `.git` or `.json` suffix.
fn name_from_location(location: &str) -> String {
    let trimmed = location.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git")
        .or_else(|| last.strip_suffix(".json"))
        .unwrap_or(last)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_strips_suffixes() {
        assert_eq!(name_from_location("https://example.com/Alamofire.git"), "Alamofire");
        assert_eq!(name_from_location("https://example.com/Sparkle.json"), "Sparkle");
        assert_eq!(name_from_location("git@github.com:owner/Repo.git"), "Repo");
        assert_eq!(name_from_location("owner/Repo/"), "Repo");
    }

    #[test]
    fn name_without_separators() {
        assert_eq!(name_from_location("Local"), "Local");
    }
}
