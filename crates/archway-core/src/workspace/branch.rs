//! Workspace branches.

use crate::error::{ArchwayError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of the primary line of a workspace.
pub const MAIN_BRANCH: &str = "main";

const MAX_BRANCH_NAME_LENGTH: usize = 100;

static BRANCH_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("branch name pattern is a valid regex")
});

/// A named, independently versioned line of a workspace.
///
/// The primary line is never represented as a `WorkspaceBranch`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceBranch {
    pub name: String,
}

impl WorkspaceBranch {
    /// Creates a branch after validating its name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_branch_name(&name)?;
        if is_main_branch(&name) {
            return Err(ArchwayError::validation(
                "The main branch cannot be used as a branch name",
            ));
        }

        Ok(Self { name })
    }
}

/// Returns true for the primary-branch sentinel (`""` or `"main"`, any case).
pub fn is_main_branch(branch: &str) -> bool {
    branch.is_empty() || branch.eq_ignore_ascii_case(MAIN_BRANCH)
}

/// Returns true when `name` matches the branch allow-list pattern.
pub fn is_valid_branch_name(name: &str) -> bool {
    name.len() <= MAX_BRANCH_NAME_LENGTH && BRANCH_NAME_PATTERN.is_match(name)
}

/// Validates a branch argument as accepted by read/write operations.
///
/// The primary-branch sentinel is always accepted.
pub fn validate_branch_name(branch: &str) -> Result<()> {
    if is_main_branch(branch) || is_valid_branch_name(branch) {
        Ok(())
    } else {
        Err(ArchwayError::validation(format!(
            "The branch name \"{}\" is invalid",
            branch
        )))
    }
}
