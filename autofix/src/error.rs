//! Typed errors for component boundaries.
//!
//! Orchestration code wraps these in `anyhow::Error` with context; the typed
//! variants exist so callers and tests can tell the failure modes apart.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to materialize a repository into a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("create workspace directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("repository path {} does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("walk {}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("copy {} -> {}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("spawn git clone {url}")]
    CloneSpawn {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("git clone {url} failed: {diagnostic}")]
    Clone { url: String, diagnostic: String },
}

/// Failure to apply a patch to its target file.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The old fragment is not a substring of the file's current content.
    #[error("old fragment not found in {}", .path.display())]
    FragmentNotFound { path: PathBuf },
    #[error("{action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The configured remote URL matches no known hosting shape.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized remote url '{0}' (expected https://host/owner/name or host:owner/name)")]
pub struct RemoteUrlError(pub String);
