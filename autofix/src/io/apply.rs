//! Apply a [`Patch`] to disk.

use std::fs;

use tracing::{debug, instrument};

use crate::core::apply::replace_first;
use crate::core::types::Patch;
use crate::error::ApplyError;

/// Replace the first occurrence of `patch.old_fragment` in `patch.target_file`.
///
/// Fails with [`ApplyError::FragmentNotFound`] (file untouched) when the
/// fragment is not in the file's current content.
#[instrument(skip_all, fields(file = %patch.target_file.display()))]
pub fn apply_patch(patch: &Patch) -> Result<(), ApplyError> {
    let path = &patch.target_file;
    let content = fs::read_to_string(path).map_err(|source| ApplyError::Io {
        action: "read",
        path: path.clone(),
        source,
    })?;
    let updated = replace_first(&content, &patch.old_fragment, &patch.new_fragment)
        .ok_or_else(|| ApplyError::FragmentNotFound { path: path.clone() })?;
    fs::write(path, updated).map_err(|source| ApplyError::Io {
        action: "write",
        path: path.clone(),
        source,
    })?;
    debug!("patch applied");
    Ok(())
}
