//! Candidate source files for analysis and fallback plans.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::{DirEntry, WalkDir};

pub const MAX_CANDIDATES: usize = 5;

const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "coverage",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "py", "rb", "go", "rs", "java", "kt", "c", "h", "cc",
    "cpp", "hpp", "cs", "php", "swift",
];

static GOAL_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[\w.-]+/)+[\w.-]+\.[A-Za-z0-9]+").expect("goal path regex should compile")
});

/// Up to [`MAX_CANDIDATES`] repository-relative paths, most relevant first.
///
/// A path named in the goal that exists under `repo_dir` comes first; the rest
/// are source files in sorted order.
pub fn find_candidates(repo_dir: &Path, goal: &str) -> Vec<String> {
    let mut files = Vec::new();
    if let Some(named) = path_from_goal(repo_dir, goal) {
        files.push(named);
    }
    for path in scan_source_files(repo_dir) {
        if files.len() >= MAX_CANDIDATES {
            break;
        }
        if !files.contains(&path) {
            files.push(path);
        }
    }
    files
}

/// First path-shaped token in `goal` naming a file inside `repo_dir`.
pub fn path_from_goal(repo_dir: &Path, goal: &str) -> Option<String> {
    GOAL_PATH_RE
        .find_iter(goal)
        .map(|m| m.as_str().trim_start_matches("./"))
        .filter(|rel| is_plain_relative(Path::new(rel)))
        .find(|rel| repo_dir.join(rel).is_file())
        .map(str::to_string)
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn scan_source_files(repo_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(repo_dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_source_extension(e.path()))
        .filter_map(|e| relative_label(repo_dir, e.path()))
        .collect();
    files.sort();
    files
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// `path` relative to `root`, with `/` separators.
pub fn relative_label(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
