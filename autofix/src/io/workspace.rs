//! Per-run workspace creation and teardown.
//!
//! Each run gets its own directory `<base>/<repo-name>-<epoch-millis>`, with
//! the repository materialized at `<base>/<repo-name>-<epoch-millis>/<repo-name>`.
//! The directory survives every outcome except `success` so failures can be
//! inspected afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::WorkspaceError;
use crate::io::git::Git;

/// An isolated, exclusively owned directory for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Per-run directory.
    pub root_dir: PathBuf,
    /// Materialized repository inside `root_dir`.
    pub repo_dir: PathBuf,
}

/// Creates workspaces under a base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Clone (URL) or copy (local path) `repo_location` into a fresh workspace.
    #[instrument(skip_all, fields(repo_location))]
    pub fn materialize(&self, repo_location: &str) -> Result<Workspace, WorkspaceError> {
        let remote = is_remote_url(repo_location);
        let source = PathBuf::from(repo_location);
        if !remote && !source.is_dir() {
            return Err(WorkspaceError::SourceMissing(source));
        }

        let repo_name = repo_base_name(repo_location);
        let name = build_workspace_name(&repo_name, Utc::now().timestamp_millis());
        let root_dir = self.base_dir.join(&name);
        fs::create_dir_all(&root_dir).map_err(|source| WorkspaceError::CreateDir {
            path: root_dir.clone(),
            source,
        })?;
        let repo_dir = root_dir.join(&repo_name);

        if remote {
            info!(url = repo_location, dest = %repo_dir.display(), "cloning repository");
            Git::clone_into(repo_location, &repo_dir)?;
        } else {
            info!(source = %source.display(), dest = %repo_dir.display(), "copying repository");
            let source = canonical(&source);
            let excluded = nested_workspace_dir(&source, &canonical(&self.base_dir), &root_dir);
            copy_tree(&source, &repo_dir, &excluded)?;
        }

        debug!(root = %root_dir.display(), "workspace ready");
        Ok(Workspace { root_dir, repo_dir })
    }

    /// Best-effort recursive delete. Failures are logged, never returned.
    pub fn teardown(&self, workspace: &Workspace) {
        match fs::remove_dir_all(&workspace.root_dir) {
            Ok(()) => debug!(root = %workspace.root_dir.display(), "workspace removed"),
            Err(err) => warn!(
                root = %workspace.root_dir.display(),
                err = %err,
                "failed to remove workspace"
            ),
        }
    }
}

/// True for clonable locations: `scheme://...` or SSH-style `user@host:path`.
pub fn is_remote_url(location: &str) -> bool {
    let location = location.trim();
    if let Some((scheme, _)) = location.split_once("://") {
        return matches!(scheme, "http" | "https" | "ssh" | "git" | "file");
    }
    match location.split_once('@') {
        Some((user, rest)) => {
            !user.is_empty()
                && !user.contains('/')
                && rest.split_once(':').is_some_and(|(host, path)| {
                    !host.is_empty() && !host.contains('/') && !path.is_empty()
                })
        }
        None => false,
    }
}

/// Last path segment of a location, without a trailing `.git`.
pub fn repo_base_name(location: &str) -> String {
    let trimmed = location.trim().trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

pub fn build_workspace_name(repo_name: &str, millis: i64) -> String {
    format!("{repo_name}-{millis}")
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Directory the copy must not descend into: the workspace base when it lives
/// inside the source tree, otherwise this run's own directory.
fn nested_workspace_dir(source: &Path, base_dir: &Path, root_dir: &Path) -> PathBuf {
    if base_dir != source && base_dir.starts_with(source) {
        base_dir.to_path_buf()
    } else {
        canonical(root_dir)
    }
}

fn copy_tree(source: &Path, dest: &Path, excluded: &Path) -> Result<(), WorkspaceError> {
    let walker = WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(excluded));
    for entry in walker {
        let entry = entry.map_err(|err| WorkspaceError::Walk {
            root: source.to_path_buf(),
            source: err,
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .unwrap_or_else(|_| entry.path());
        let target = dest.join(relative);
        let file_type = entry.file_type();
        let result = if file_type.is_dir() {
            fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        result.map_err(|source| WorkspaceError::Copy {
            from: entry.path().to_path_buf(),
            to: target.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    if link.is_dir() {
        fs::create_dir_all(target)
    } else {
        fs::copy(link, target).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recognizes_remote_locations() {
        assert!(is_remote_url("https://github.com/acme/calc.git"));
        assert!(is_remote_url("http://example.com/acme/calc"));
        assert!(is_remote_url("ssh://git@github.com/acme/calc.git"));
        assert!(is_remote_url("git@github.com:acme/calc.git"));
        assert!(is_remote_url("file:///srv/git/calc.git"));
    }

    #[test]
    fn treats_paths_as_local() {
        assert!(!is_remote_url("/home/me/calc"));
        assert!(!is_remote_url("./calc"));
        assert!(!is_remote_url("C:\\work\\calc"));
        assert!(!is_remote_url("/tmp/me@host:dir"));
    }

    #[test]
    fn base_name_strips_git_suffix_and_separators() {
        assert_eq!(repo_base_name("https://github.com/acme/calc.git"), "calc");
        assert_eq!(repo_base_name("git@github.com:acme/calc.git"), "calc");
        assert_eq!(repo_base_name("/home/me/calc/"), "calc");
        assert_eq!(repo_base_name("."), "repo");
    }

    #[test]
    fn workspace_name_uses_expected_format() {
        assert_eq!(build_workspace_name("calc", 1_700_000_000_123), "calc-1700000000123");
    }

    #[test]
    fn workspace_base_inside_source_is_not_copied() {
        let source = tempdir().expect("source");
        fs::create_dir_all(source.path().join("src")).expect("mkdir");
        fs::write(source.path().join("src/a.js"), "a").expect("write");
        let base = source.path().join(".autofix-workspaces");
        fs::create_dir_all(base.join("calc-1")).expect("earlier run");
        fs::write(base.join("calc-1/stale.txt"), "old").expect("write");

        let manager = WorkspaceManager::new(&base);
        let ws = manager
            .materialize(&source.path().display().to_string())
            .expect("materialize");

        assert_eq!(fs::read_to_string(ws.repo_dir.join("src/a.js")).expect("read"), "a");
        assert!(!ws.repo_dir.join(".autofix-workspaces").exists());
    }

    #[test]
    fn source_inside_workspace_base_is_copied() {
        let base = tempdir().expect("base");
        let source = base.path().join("calc");
        fs::create_dir_all(&source).expect("mkdir");
        fs::write(source.join("index.js"), "x").expect("write");

        let manager = WorkspaceManager::new(base.path());
        let ws = manager
            .materialize(&source.display().to_string())
            .expect("materialize");

        assert_eq!(fs::read_to_string(ws.repo_dir.join("index.js")).expect("read"), "x");
    }

    #[test]
    fn copies_local_repository_including_hidden_entries() {
        let source = tempdir().expect("source");
        fs::create_dir_all(source.path().join("src")).expect("mkdir");
        fs::create_dir_all(source.path().join(".git")).expect("mkdir git");
        fs::write(source.path().join("src/a.js"), "a").expect("write");
        fs::write(source.path().join(".git/HEAD"), "ref").expect("write head");

        let base = tempdir().expect("base");
        let manager = WorkspaceManager::new(base.path());
        let ws = manager
            .materialize(&source.path().display().to_string())
            .expect("materialize");

        assert!(ws.root_dir.starts_with(base.path()));
        assert!(ws.repo_dir.starts_with(&ws.root_dir));
        assert_eq!(fs::read_to_string(ws.repo_dir.join("src/a.js")).expect("read"), "a");
        assert!(ws.repo_dir.join(".git/HEAD").exists());
    }

    #[test]
    fn missing_local_path_is_a_workspace_error() {
        let base = tempdir().expect("base");
        let manager = WorkspaceManager::new(base.path());
        let missing = base.path().join("nope");
        let err = manager
            .materialize(&missing.display().to_string())
            .expect_err("should fail");
        assert!(matches!(err, WorkspaceError::SourceMissing(_)));
    }

    #[test]
    fn failed_clone_carries_diagnostic() {
        let base = tempdir().expect("base");
        let manager = WorkspaceManager::new(base.path());
        let url = format!("file://{}/missing.git", base.path().display());
        let err = manager.materialize(&url).expect_err("should fail");
        match err {
            WorkspaceError::Clone { diagnostic, .. } => assert!(!diagnostic.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn teardown_removes_directory_and_tolerates_missing() {
        let base = tempdir().expect("base");
        let source = tempdir().expect("source");
        fs::write(source.path().join("f"), "x").expect("write");
        let manager = WorkspaceManager::new(base.path());
        let ws = manager
            .materialize(&source.path().display().to_string())
            .expect("materialize");
        manager.teardown(&ws);
        assert!(!ws.root_dir.exists());
        manager.teardown(&ws);
    }
}
