//! Version-control anchoring of signature artifacts.
//!
//! After a signature artifact is written it is committed, and the resulting
//! commit identifier becomes an immutable provenance pointer for the
//! signature. Signing and verification never depend on how the commit is
//! made; they see only the [`ProvenanceAnchor`] trait.

mod git;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use git::GitCliAnchor;

/// Length of a SHA-1 commit identifier in hex.
pub const COMMIT_HASH_LEN: usize = 40;

/// Errors from the version-control layer.
///
/// Every variant produced by a failed git invocation carries the tool's own
/// stderr.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvenanceError {
    /// The git executable could not be found.
    #[error("git executable not found on PATH")]
    GitUnavailable,

    /// The target directory is not inside a git working tree.
    #[error("{path} is not inside a git working tree: {stderr}")]
    NotARepository {
        /// Directory that was checked.
        path: PathBuf,
        /// Output of git.
        stderr: String,
    },

    /// The given files have no staged changes.
    #[error("nothing to commit: the signature artifacts are unchanged")]
    NothingToCommit,

    /// A git command exited unsuccessfully.
    #[error("`git {command}` failed with {status}: {stderr}")]
    CommandFailed {
        /// Subcommand and arguments.
        command: String,
        /// Exit status description.
        status: String,
        /// Output of git.
        stderr: String,
    },

    /// Git reported something that is not a 40-character hex commit id.
    #[error("invalid commit hash {0:?}")]
    InvalidCommitHash(String),

    /// HEAD did not match the commit just created.
    #[error("commit {committed} was not confirmed, HEAD is {head}")]
    CommitNotConfirmed {
        /// Identifier returned by the commit.
        committed: CommitHash,
        /// Identifier of HEAD afterwards.
        head: CommitHash,
    },

    /// Spawning git failed for a reason other than a missing binary.
    #[error("failed to run git: {0}")]
    Io(#[source] std::io::Error),
}

/// A full, lowercase, 40-character hex commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Validates and wraps a commit identifier. Surrounding whitespace is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError::InvalidCommitHash`] unless the value is
    /// exactly 40 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self, ProvenanceError> {
        let value = value.trim();
        let valid = value.len() == COMMIT_HASH_LEN
            && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(ProvenanceError::InvalidCommitHash(value.to_string()))
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = ProvenanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

/// Commits files to a working tree and reports its head commit.
///
/// Implementations are bound to one working tree at construction.
/// Callers that sign concurrently against the same tree must serialize
/// calls themselves.
pub trait ProvenanceAnchor {
    /// Checks that the anchor can accept a commit, before any artifact is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError`] if the tree cannot be committed to, for
    /// example [`ProvenanceError::NotARepository`].
    fn ensure_ready(&self) -> Result<(), ProvenanceError> {
        Ok(())
    }

    /// Stages and commits exactly `files` with `message`, returning the new
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError`] if the tree is not a repository, the files
    /// have no changes, or the tool fails. A commit hash is never returned
    /// empty.
    fn commit(&self, files: &[PathBuf], message: &str) -> Result<CommitHash, ProvenanceError>;

    /// Returns the current head commit.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError`] if the head cannot be resolved.
    fn current_commit_hash(&self) -> Result<CommitHash, ProvenanceError>;
}
