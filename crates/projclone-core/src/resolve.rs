use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::plan::ReplacementPlan;

/// Where the cloned project's top directory ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub path: PathBuf,
    /// The source folder name was changed by the plan.
    pub renamed: bool,
}

impl ResolvedRoot {
    pub fn renamed_count(&self) -> usize {
        usize::from(self.renamed)
    }
}

/// Computes the destination root of a clone from path strings alone.
///
/// The source folder's name is run through the plan. When `dest_dir` is
/// already named after the result it is used as-is, otherwise the renamed
/// folder is appended beneath it.
pub fn resolve_destination_root(
    source_dir: &Path,
    dest_dir: &Path,
    plan: &ReplacementPlan,
) -> ResolvedRoot {
    let original = source_dir
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    let project_name: OsString = plan.apply_os(&original);

    let path = if project_name.is_empty() || dest_dir.file_name() == Some(project_name.as_os_str()) {
        dest_dir.to_path_buf()
    } else {
        dest_dir.join(&project_name)
    };

    ResolvedRoot {
        path,
        renamed: project_name != original,
    }
}
