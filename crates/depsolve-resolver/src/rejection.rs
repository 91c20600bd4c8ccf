//! Record of the branches the search gave up on.

use std::fmt;

use crate::error::ResolveError;

/// Every branch rejected during one resolve call, in rejection order.
#[derive(Debug, Default, Clone)]
pub struct RejectionReport {
    pub rejections: Vec<RejectedBranch>,
}

/// A single abandoned branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedBranch {
    /// Names still unresolved when the branch was abandoned.
    pub unresolved: Vec<String>,
    /// `None` when the branch simply ran out of candidates.
    pub reason: Option<ResolveError>,
}

impl RejectionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rejection: RejectedBranch) {
        self.rejections.push(rejection);
    }

    pub fn is_empty(&self) -> bool {
        self.rejections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rejections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RejectedBranch> {
        self.rejections.iter()
    }
}

impl fmt::Display for RejectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rejections.is_empty() {
            return write!(f, "No rejected branches.");
        }
        writeln!(f, "Rejected branches ({}):", self.rejections.len())?;
        for r in &self.rejections {
            writeln!(f, "  {r}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RejectedBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unresolved = if self.unresolved.is_empty() {
            "nothing".to_string()
        } else {
            self.unresolved.join(", ")
        };
        match &self.reason {
            Some(reason) => write!(f, "unresolved {unresolved}: {reason}"),
            None => write!(f, "unresolved {unresolved}: no candidates left"),
        }
    }
}
