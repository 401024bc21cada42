//! On-disk layout of signature artifacts.
//!
//! ```text
//! docs/specs/auth.md  ->  docs/specs/.oracle/signatures/auth.yaml.sig
//! README.md           ->  .oracle/signatures/README.yaml.sig
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::path::{normalize_path, resolve_claim_path};
use super::{SignatureFormat, SigningError};

/// Directory, relative to a document's parent, that holds its signature.
pub const SIGNATURE_DIR: &str = ".oracle/signatures";

/// Extension of every signature artifact, whatever the document's own.
pub const SIGNATURE_EXTENSION: &str = "yaml.sig";

/// Returns the conventional signature path for `document`.
///
/// The original extension is replaced by `.yaml.sig`; intermediate
/// directories are preserved.
#[must_use]
pub fn signature_file_path(document: impl AsRef<Path>) -> PathBuf {
    let document = document.as_ref();
    let stem = document
        .file_stem()
        .map_or_else(|| document.as_os_str().to_os_string(), ToOwned::to_owned);
    let mut file_name = stem;
    file_name.push(".");
    file_name.push(SIGNATURE_EXTENSION);

    let dir = match document.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(SIGNATURE_DIR),
        _ => PathBuf::from(SIGNATURE_DIR),
    };
    dir.join(file_name)
}

/// Reads and writes signature artifacts under one project root.
#[derive(Debug, Clone)]
pub struct SignatureStore {
    project_root: PathBuf,
}

impl SignatureStore {
    /// Creates a store rooted at `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Returns the absolute artifact path for `document`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::PathOutsideProject`] if the document is not
    /// under the project root.
    pub fn path_for(&self, document: &Path) -> Result<PathBuf, SigningError> {
        let relative = normalize_path(document, &self.project_root)?;
        Ok(self
            .project_root
            .join(signature_file_path(resolve_claim_path(Path::new(""), &relative))))
    }

    /// Returns the artifact path of every document `signature` covers.
    #[must_use]
    pub fn artifact_paths(&self, signature: &SignatureFormat) -> Vec<PathBuf> {
        signature
            .document_paths()
            .into_iter()
            .map(|document| {
                self.project_root
                    .join(signature_file_path(resolve_claim_path(Path::new(""), document)))
            })
            .collect()
    }

    /// Records what currently sits at every artifact path of `signature`,
    /// so a failed anchoring can put it back.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Io`] if an existing artifact cannot be read.
    pub fn snapshot(&self, signature: &SignatureFormat) -> Result<ArtifactSnapshot, SigningError> {
        let entries = self
            .artifact_paths(signature)
            .into_iter()
            .map(|path| match fs::read(&path) {
                Ok(bytes) => Ok((path, Some(bytes))),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok((path, None)),
                Err(err) => Err(SigningError::io(&path, err)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArtifactSnapshot { entries })
    }

    /// Writes `signature` at the conventional path of every document it
    /// covers and returns the written paths.
    ///
    /// Each file is written to a temporary sibling and renamed into place,
    /// so a reader never observes a partial artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Io`] if a directory or file cannot be written.
    #[instrument(skip_all, fields(signature_id = %signature.signature_id()))]
    pub fn save(&self, signature: &SignatureFormat) -> Result<Vec<PathBuf>, SigningError> {
        let yaml = signature.to_yaml()?;
        let targets = self.artifact_paths(signature);

        for target in &targets {
            write_atomic(target, yaml.as_bytes()).map_err(|err| SigningError::io(target, err))?;
            debug!(path = %target.display(), "wrote signature artifact");
        }
        Ok(targets)
    }

    /// Loads the signature stored for `document`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::SignatureNotFound`] if no artifact exists,
    /// [`SigningError::MalformedSignature`] if it cannot be parsed, or
    /// [`SigningError::Io`] on other read failures.
    pub fn load(&self, document: &Path) -> Result<SignatureFormat, SigningError> {
        let path = self.path_for(document)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SigningError::SignatureNotFound { path });
            },
            Err(err) => return Err(SigningError::io(&path, err)),
        };
        SignatureFormat::from_yaml(&text)
    }
}

/// Artifact contents captured by [`SignatureStore::snapshot`].
#[derive(Debug)]
pub struct ArtifactSnapshot {
    entries: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl ArtifactSnapshot {
    /// Puts every captured artifact back: previous contents are rewritten
    /// and artifacts that did not exist are removed.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Io`] on the first file that cannot be
    /// restored.
    pub fn restore(&self) -> Result<(), SigningError> {
        for (path, previous) in &self.entries {
            match previous {
                Some(bytes) => {
                    write_atomic(path, bytes).map_err(|err| SigningError::io(path, err))?;
                },
                None => {
                    match fs::remove_file(path) {
                        Ok(()) => {},
                        Err(err) if err.kind() == io::ErrorKind::NotFound => {},
                        Err(err) => return Err(SigningError::io(path, err)),
                    }
                    remove_empty_signature_dirs(path);
                },
            }
            debug!(path = %path.display(), "restored signature artifact");
        }
        Ok(())
    }
}

/// Removes the `.oracle/signatures` directories above `artifact` if they
/// are now empty.
fn remove_empty_signature_dirs(artifact: &Path) {
    let signatures = artifact.parent();
    let oracle = signatures.and_then(Path::parent);
    for dir in [signatures, oracle].into_iter().flatten() {
        if fs::remove_dir(dir).is_err() {
            break;
        }
    }
}

fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no parent"))?;
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|err| err.error)?;
    Ok(())
}
