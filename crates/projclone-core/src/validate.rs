use std::path::{Path, PathBuf};

use crate::log::{LogLevel, LogSink};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required and must contain at least one name.")]
    MissingField,
    #[error("Source directory '{}' not found.", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("Number of source names ({sources}) must match number of destination names ({destinations}).")]
    NameCountMismatch { sources: usize, destinations: usize },
    #[error("Source name #{index} cannot be empty.")]
    EmptySourceName { index: usize },
    #[error("Destination name #{index} cannot be empty.")]
    EmptyDestName { index: usize },
    #[error("Source and destination directories cannot be the same.")]
    SameDirectory,
}

/// Checks the inputs of a clone before anything on disk is touched.
///
/// Checks run in a fixed order and stop at the first failure. A pair whose
/// source equals its destination is legal and only produces a warning.
pub fn validate_inputs<S: LogSink + ?Sized>(
    source_dir: &Path,
    dest_dir: &Path,
    source_names: &[String],
    dest_names: &[String],
    log: &S,
) -> Result<(), ValidationError> {
    if source_dir.as_os_str().is_empty()
        || dest_dir.as_os_str().is_empty()
        || source_names.is_empty()
        || dest_names.is_empty()
    {
        return Err(ValidationError::MissingField);
    }

    if !source_dir.is_dir() {
        return Err(ValidationError::SourceNotFound {
            path: source_dir.to_path_buf(),
        });
    }

    if source_names.len() != dest_names.len() {
        return Err(ValidationError::NameCountMismatch {
            sources: source_names.len(),
            destinations: dest_names.len(),
        });
    }

    let same_dir = source_dir == dest_dir;
    for (i, (source, dest)) in source_names.iter().zip(dest_names).enumerate() {
        let index = i + 1;
        if source.is_empty() {
            return Err(ValidationError::EmptySourceName { index });
        }
        if dest.is_empty() {
            return Err(ValidationError::EmptyDestName { index });
        }
        if source == dest && !same_dir {
            log.emit(
                &format!(
                    "Warning: Replacement pair '{}' -> '{}' is identical. \
                     This will result in no change for this specific name.",
                    source, dest
                ),
                LogLevel::Warning,
            );
        }
    }

    if same_dir {
        return Err(ValidationError::SameDirectory);
    }

    Ok(())
}
