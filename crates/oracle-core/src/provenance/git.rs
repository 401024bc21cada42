//! Git anchoring through the `git` command-line tool.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info, instrument, warn};

use super::{CommitHash, ProvenanceAnchor, ProvenanceError};

/// Anchors signature artifacts by committing them with the `git` CLI.
///
/// Every invocation runs as `git -C <repo_root>` with terminal prompts and
/// the system-level config disabled, so a missing credential or an
/// unexpected system hook cannot block or alter the commit.
#[derive(Debug, Clone)]
pub struct GitCliAnchor {
    repo_root: PathBuf,
}

impl GitCliAnchor {
    /// Creates an anchor for the working tree at `repo_root`.
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    /// Returns the working tree root.
    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Reads a git config value as seen from this working tree.
    ///
    /// Returns `Ok(None)` when the key is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceError`] if git cannot be run or fails for a
    /// reason other than an unset key.
    pub fn config_value(&self, key: &str) -> Result<Option<String>, ProvenanceError> {
        let output = self.run(["config", "--get", key])?;
        match output.status.code() {
            Some(0) => {
                let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok((!value.is_empty()).then_some(value))
            },
            Some(1) => Ok(None),
            _ => Err(command_failed(&format!("config --get {key}"), &output)),
        }
    }

    /// Fails with [`ProvenanceError::NotARepository`] unless the root is
    /// inside a working tree.
    fn ensure_repository(&self) -> Result<(), ProvenanceError> {
        let output = self.run(["rev-parse", "--is-inside-work-tree"])?;
        let inside =
            output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true";
        if inside {
            Ok(())
        } else {
            Err(ProvenanceError::NotARepository {
                path: self.repo_root.clone(),
                stderr: stderr_of(&output),
            })
        }
    }

    /// Commits the already staged `pathspecs`.
    fn commit_staged(&self, pathspecs: &[&Path], message: &str) -> Result<(), ProvenanceError> {
        let mut diff = vec![
            OsStr::new("diff"),
            OsStr::new("--cached"),
            OsStr::new("--quiet"),
            OsStr::new("--"),
        ];
        diff.extend(pathspecs.iter().map(|p| p.as_os_str()));
        let staged = self.run(diff)?;
        match staged.status.code() {
            Some(0) => return Err(ProvenanceError::NothingToCommit),
            Some(1) => {},
            _ => return Err(command_failed("diff --cached --quiet", &staged)),
        }

        let mut commit = vec![
            OsStr::new("commit"),
            OsStr::new("--quiet"),
            OsStr::new("-m"),
            OsStr::new(message),
            OsStr::new("--"),
        ];
        commit.extend(pathspecs.iter().map(|p| p.as_os_str()));
        self.run_checked("commit", commit)?;
        Ok(())
    }

    /// Expresses `file` relative to the working tree when possible.
    fn pathspec<'a>(&self, file: &'a Path) -> &'a Path {
        file.strip_prefix(&self.repo_root).unwrap_or(file)
    }

    fn run<I, S>(&self, args: I) -> Result<Output, ProvenanceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ProvenanceError::GitUnavailable,
                _ => ProvenanceError::Io(err),
            })
    }

    fn run_checked<I, S>(&self, command: &str, args: I) -> Result<Output, ProvenanceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(command_failed(command, &output))
        }
    }
}

impl ProvenanceAnchor for GitCliAnchor {
    fn ensure_ready(&self) -> Result<(), ProvenanceError> {
        self.ensure_repository()
    }

    #[instrument(skip(self, message), fields(repo = %self.repo_root.display()))]
    fn commit(&self, files: &[PathBuf], message: &str) -> Result<CommitHash, ProvenanceError> {
        if files.is_empty() {
            return Err(ProvenanceError::NothingToCommit);
        }
        self.ensure_repository()?;
        let pathspecs: Vec<&Path> = files.iter().map(|file| self.pathspec(file)).collect();

        let mut add = vec![OsStr::new("add"), OsStr::new("--")];
        add.extend(pathspecs.iter().map(|p| p.as_os_str()));
        self.run_checked("add", add)?;

        if let Err(err) = self.commit_staged(&pathspecs, message) {
            // Leave the index as it was before `add`.
            let mut reset = vec![OsStr::new("reset"), OsStr::new("--quiet"), OsStr::new("--")];
            reset.extend(pathspecs.iter().map(|p| p.as_os_str()));
            if let Err(reset_err) = self.run_checked("reset", reset) {
                warn!(error = %reset_err, "failed to unstage signature artifacts");
            }
            return Err(err);
        }

        let hash = self.current_commit_hash()?;
        info!(commit = %hash, files = files.len(), "anchored signature artifacts");
        Ok(hash)
    }

    fn current_commit_hash(&self) -> Result<CommitHash, ProvenanceError> {
        let output = self.run_checked("rev-parse HEAD", ["rev-parse", "HEAD"])?;
        let hash = CommitHash::parse(&String::from_utf8_lossy(&output.stdout))?;
        debug!(commit = %hash, "resolved HEAD");
        Ok(hash)
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn command_failed(command: &str, output: &Output) -> ProvenanceError {
    ProvenanceError::CommandFailed {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: stderr_of(output),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn git(dir: &Path, args: &[&str]) -> Output {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .expect("run git");
        assert!(output.status.success(), "git {args:?} failed: {output:?}");
        output
    }

    /// Initializes a repository with one commit and a repo-local identity.
    fn create_test_repo(path: &Path) {
        git(path, &["init", "--quiet"]);
        git(path, &["config", "user.name", "Test"]);
        git(path, &["config", "user.email", "test@test.com"]);
        git(path, &["config", "commit.gpgsign", "false"]);
        fs::write(path.join("README.md"), b"hello").expect("write file");
        git(path, &["add", "README.md"]);
        git(path, &["commit", "--quiet", "-m", "initial"]);
    }

    #[test]
    fn test_commit_returns_head() {
        let dir = tempfile::tempdir().unwrap();
        create_test_repo(dir.path());
        let artifact = dir.path().join(".oracle/signatures/spec.yaml.sig");
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, "format: claim-bundle\n").unwrap();

        let anchor = GitCliAnchor::new(dir.path());
        let before = anchor.current_commit_hash().unwrap();
        let hash = anchor.commit(&[artifact], "docs: digitally sign spec.md").unwrap();

        assert_ne!(hash, before);
        assert_eq!(hash, anchor.current_commit_hash().unwrap());
        assert_eq!(hash.as_str().len(), 40);

        let subject = git(dir.path(), &["log", "-1", "--format=%s"]);
        assert_eq!(String::from_utf8_lossy(&subject.stdout).trim(), "docs: digitally sign spec.md");
    }

    #[test]
    fn test_commit_only_includes_given_files() {
        let dir = tempfile::tempdir().unwrap();
        create_test_repo(dir.path());
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();
        git(dir.path(), &["add", "unrelated.txt"]);
        let artifact = dir.path().join("sig.yaml.sig");
        fs::write(&artifact, "a").unwrap();

        GitCliAnchor::new(dir.path()).commit(&[artifact], "sign").unwrap();

        let files = git(dir.path(), &["show", "--name-only", "--format=", "HEAD"]);
        assert_eq!(String::from_utf8_lossy(&files.stdout).trim(), "sig.yaml.sig");
    }

    #[test]
    fn test_unchanged_files_are_nothing_to_commit() {
        let dir = tempfile::tempdir().unwrap();
        create_test_repo(dir.path());

        let result = GitCliAnchor::new(dir.path()).commit(&[dir.path().join("README.md")], "again");
        assert!(matches!(result, Err(ProvenanceError::NothingToCommit)));
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let result = GitCliAnchor::new(dir.path()).commit(&[dir.path().join("a.txt")], "msg");
        assert!(matches!(result, Err(ProvenanceError::NotARepository { .. })));
    }

    #[test]
    fn test_ensure_ready() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitCliAnchor::new(dir.path()).ensure_ready();
        assert!(matches!(result, Err(ProvenanceError::NotARepository { .. })));

        create_test_repo(dir.path());
        GitCliAnchor::new(dir.path()).ensure_ready().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_commit_unstages_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        create_test_repo(dir.path());
        // A rejecting hook makes `git commit` fail after the files are staged.
        let hook = dir.path().join(".git/hooks/pre-commit");
        fs::create_dir_all(hook.parent().unwrap()).unwrap();
        fs::write(&hook, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
        let artifact = dir.path().join("sig.yaml.sig");
        fs::write(&artifact, "a").unwrap();

        let result = GitCliAnchor::new(dir.path()).commit(&[artifact], "sign");
        assert!(matches!(result, Err(ProvenanceError::CommandFailed { .. })));

        let staged = git(dir.path(), &["diff", "--cached", "--name-only"]);
        assert_eq!(String::from_utf8_lossy(&staged.stdout).trim(), "");
    }

    #[test]
    fn test_config_value() {
        let dir = tempfile::tempdir().unwrap();
        create_test_repo(dir.path());
        let anchor = GitCliAnchor::new(dir.path());

        assert_eq!(anchor.config_value("user.email").unwrap().as_deref(), Some("test@test.com"));
        assert_eq!(anchor.config_value("oracle.unset-key").unwrap(), None);
    }
}
