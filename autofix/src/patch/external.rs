//! Prompting for and validating externally generated patches.
//!
//! The reasoning service's reply is untrusted. [`validate_reply`] turns it into
//! a [`Patch`] only when every check passes; each failed check is a distinct
//! [`Rejection`] so the caller can log why a reply was discarded.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use minijinja::{Environment, context};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::types::Patch;

const EXTERNAL_PATCH_TEMPLATE: &str = include_str!("../templates/external_patch.md");

/// Why a reply was not accepted as a patch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("reply is not JSON")]
    NotJson,
    #[error("reply is not a JSON object")]
    NotObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` is not a string")]
    NonStringField(&'static str),
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),
    #[error("file `{0}` is absolute")]
    AbsolutePath(String),
    #[error("file `{0}` resolves outside the repository")]
    OutsideRepo(String),
    #[error("file `{0}` does not exist")]
    FileMissing(String),
    #[error("file `{0}` could not be read")]
    Unreadable(String),
    #[error("oldCode not found verbatim in `{0}`")]
    FragmentMissing(String),
}

/// The four string fields of a well-formed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub summary: String,
    pub file: String,
    pub old_code: String,
    pub new_code: String,
}

/// Render the analysis prompt for one target file.
pub fn render_prompt(goal: &str, file: &str, content: &str, test_output: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("external_patch.md", EXTERNAL_PATCH_TEMPLATE)?;
    let rendered = env.get_template("external_patch.md")?.render(context! {
        goal => goal.trim(),
        file => file,
        content => content.trim_end(),
        test_output => test_output.trim_end(),
    })?;
    Ok(rendered)
}

/// Parse and check a reply against the repository in `repo_dir`.
pub fn validate_reply(repo_dir: &Path, reply: &str) -> Result<Patch, Rejection> {
    let proposal = parse_reply(reply)?;
    resolve_proposal(repo_dir, proposal)
}

/// Structural checks: JSON object with four non-empty string fields.
///
/// Code fences and prose around the outermost `{...}` are tolerated. Extra
/// fields are ignored.
pub fn parse_reply(reply: &str) -> Result<Proposal, Rejection> {
    let value = parse_json_leniently(reply).ok_or(Rejection::NotJson)?;
    let Value::Object(map) = value else {
        return Err(Rejection::NotObject);
    };
    Ok(Proposal {
        summary: string_field(&map, "summary")?,
        file: string_field(&map, "file")?,
        old_code: string_field(&map, "oldCode")?,
        new_code: string_field(&map, "newCode")?,
    })
}

/// Filesystem checks: the file is relative, inside `repo_dir`, exists, and
/// contains `old_code`.
pub fn resolve_proposal(repo_dir: &Path, proposal: Proposal) -> Result<Patch, Rejection> {
    let file = proposal.file.trim().to_string();
    let rel = Path::new(&file);
    if rel.is_absolute() || rel.has_root() {
        return Err(Rejection::AbsolutePath(file));
    }
    let Some(normalized) = normalize_relative(rel) else {
        return Err(Rejection::OutsideRepo(file));
    };
    let target = repo_dir.join(&normalized);

    let canonical = target
        .canonicalize()
        .map_err(|_| Rejection::FileMissing(file.clone()))?;
    if !canonical.is_file() {
        return Err(Rejection::FileMissing(file));
    }
    let repo_root = repo_dir
        .canonicalize()
        .map_err(|_| Rejection::FileMissing(file.clone()))?;
    if !canonical.starts_with(&repo_root) {
        return Err(Rejection::OutsideRepo(file));
    }

    let content = fs::read_to_string(&canonical).map_err(|_| Rejection::Unreadable(file.clone()))?;
    if !content.contains(&proposal.old_code) {
        return Err(Rejection::FragmentMissing(file));
    }

    Ok(Patch {
        target_file: target,
        old_fragment: proposal.old_code,
        new_fragment: proposal.new_code,
        summary: proposal.summary.trim().to_string(),
    })
}

fn parse_json_leniently(reply: &str) -> Option<Value> {
    let body = strip_code_fence(reply.trim());
    if let Ok(value) = serde_json::from_str(body) {
        return Some(value);
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) along with the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn string_field(map: &Map<String, Value>, name: &'static str) -> Result<String, Rejection> {
    match map.get(name) {
        None => Err(Rejection::MissingField(name)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(Rejection::EmptyField(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Rejection::NonStringField(name)),
    }
}

/// Lexically resolve `.` and `..`; `None` if the path climbs above its root.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
